use crate::error::InferenceError;
use std::fmt;

/// Named replacement for the positional (scales, inter-scales, refine, eval) call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOptions {
    /// Image scales from coarsest to finest; the first drives the plane sweep.
    pub image_scales: Vec<f32>,
    /// Step multipliers applied between consecutive image scales.
    pub inter_scales: Vec<f32>,
    /// Run the iterative refinement stages after the coarse estimate.
    pub refine: bool,
    /// Evaluation (not training) mode. Estimators with mode-dependent layers must
    /// honour it; `DepthNet` has none.
    pub eval_mode: bool,
}

impl InferenceOptions {
    pub fn evaluation(image_scales: Vec<f32>, inter_scales: Vec<f32>) -> Self {
        Self {
            image_scales,
            inter_scales,
            refine: true,
            eval_mode: true,
        }
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.image_scales.is_empty() {
            return Err(InferenceError::InvalidOptions(
                "image_scales must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .image_scales
            .iter()
            .chain(&self.inter_scales)
            .find(|s| !s.is_finite() || **s <= 0.0)
        {
            return Err(InferenceError::InvalidOptions(format!(
                "scales must be finite and positive, got {bad}"
            )));
        }
        if self.refine && self.inter_scales.len() + 1 < self.image_scales.len() {
            return Err(InferenceError::InvalidOptions(format!(
                "{} image scales need at least {} inter scales, got {}",
                self.image_scales.len(),
                self.image_scales.len() - 1,
                self.inter_scales.len()
            )));
        }
        Ok(())
    }

    /// Number of refinement stages a forward pass produces.
    pub fn refine_stages(&self) -> usize {
        if self.refine {
            self.image_scales.len().saturating_sub(1)
        } else {
            0
        }
    }
}

impl fmt::Display for InferenceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "image_scales={:?} inter_scales={:?} refine={} eval_mode={}",
            self.image_scales, self.inter_scales, self.refine, self.eval_mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_preset_sets_both_flags() {
        let opts = InferenceOptions::evaluation(vec![0.125, 0.25], vec![0.75, 0.375]);
        assert!(opts.refine && opts.eval_mode);
        assert_eq!(opts.refine_stages(), 1);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn missing_inter_scales_rejected() {
        let opts = InferenceOptions::evaluation(vec![0.125, 0.25, 0.5], vec![0.75]);
        assert!(matches!(
            opts.validate(),
            Err(InferenceError::InvalidOptions(_))
        ));
    }

    #[test]
    fn no_refine_needs_no_inter_scales() {
        let opts = InferenceOptions {
            refine: false,
            ..InferenceOptions::evaluation(vec![0.25, 0.5], Vec::new())
        };
        assert!(opts.validate().is_ok());
        assert_eq!(opts.refine_stages(), 0);
    }
}
