use std::fmt::Display;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{Level, Span};
use tracing_subscriber::filter::{filter_fn, EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry};

/// Run-scoped logger handed to each component that reports progress.
///
/// Every line is emitted inside the run's span. A capturing context also keeps the
/// rendered lines in memory so harness tests can assert on them.
#[derive(Debug, Clone)]
pub struct LogContext {
    span: Span,
    capture: Option<Arc<Mutex<Vec<String>>>>,
}

impl LogContext {
    pub fn new(run: &str) -> Self {
        Self {
            span: tracing::info_span!("eval", run = %run),
            capture: None,
        }
    }

    pub fn capturing(run: &str) -> Self {
        Self {
            capture: Some(Arc::new(Mutex::new(Vec::new()))),
            ..Self::new(run)
        }
    }

    pub fn info(&self, msg: impl Display) {
        let line = msg.to_string();
        self.span.in_scope(|| tracing::info!("{line}"));
        self.keep(line);
    }

    pub fn error(&self, msg: impl Display) {
        let line = msg.to_string();
        self.span.in_scope(|| tracing::error!("{line}"));
        self.keep(line);
    }

    fn keep(&self, line: String) {
        if let Some(capture) = &self.capture {
            if let Ok(mut lines) = capture.lock() {
                lines.push(line);
            }
        }
    }

    /// Lines seen so far; empty unless built with [`LogContext::capturing`].
    pub fn captured(&self) -> Vec<String> {
        self.capture
            .as_ref()
            .and_then(|c| c.lock().ok().map(|lines| lines.clone()))
            .unwrap_or_default()
    }
}

/// Install console and `<output_dir>/<prefix>.log` sinks unless a global subscriber
/// already exists. Returns whether this call installed it.
pub fn install_loggers(output_dir: &Path, prefix: &str) -> bool {
    let writer = tracing_appender::rolling::never(output_dir, format!("{prefix}.log"));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(LevelFilter::INFO)
        .with_filter(filter_fn(|m| {
            // wgpu is chatty at info level.
            !(m.module_path().is_some_and(|p| p.starts_with("wgpu")) && *m.level() >= Level::INFO)
        }));
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_ok()
}
