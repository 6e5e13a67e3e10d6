use crate::error::{FormatError, FormatResult};
use std::fs;
use std::path::Path;

/// One reference view and its source views ordered by matching score.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPair {
    pub ref_view: usize,
    pub src_views: Vec<usize>,
}

/// Parse a `pair.txt`: view count, then per view its index and `k (src score)*`.
pub fn read_pair_file(path: &Path) -> FormatResult<Vec<ViewPair>> {
    let raw = fs::read_to_string(path).map_err(|e| FormatError::io(path, e))?;
    parse_pairs(&raw).map_err(|(line, msg)| FormatError::Parse {
        path: path.to_path_buf(),
        line,
        msg,
    })
}

fn parse_pairs(raw: &str) -> Result<Vec<ViewPair>, (usize, String)> {
    let mut lines = raw
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (line_no, count_line) = lines.next().ok_or((1, "empty pair file".to_string()))?;
    let count: usize = count_line
        .parse()
        .map_err(|_| (line_no, format!("bad view count {count_line:?}")))?;

    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let (line_no, ref_line) = lines
            .next()
            .ok_or((line_no, "missing reference view line".to_string()))?;
        let ref_view: usize = ref_line
            .parse()
            .map_err(|_| (line_no, format!("bad reference view {ref_line:?}")))?;

        let (line_no, src_line) = lines
            .next()
            .ok_or((line_no, "missing source view line".to_string()))?;
        let mut tokens = src_line.split_whitespace();
        let num_src: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or((line_no, "missing source count".to_string()))?;
        let mut src_views = Vec::with_capacity(num_src);
        for _ in 0..num_src {
            let view = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or((line_no, "truncated source view list".to_string()))?;
            // Matching score is not used for ordering; the file is already sorted.
            tokens.next();
            src_views.push(view);
        }
        pairs.push(ViewPair {
            ref_view,
            src_views,
        });
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dtu_style_pairs() {
        let raw = "2\n0\n2 10 2346.04 1 2036.37\n1\n1 0 1200.5\n";
        let pairs = parse_pairs(raw).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].src_views, vec![10, 1]);
        assert_eq!(pairs[1].ref_view, 1);
    }

    #[test]
    fn truncated_list_is_an_error() {
        let raw = "1\n0\n3 1 0.5\n";
        let (line, _) = parse_pairs(raw).unwrap_err();
        assert_eq!(line, 3);
    }
}
