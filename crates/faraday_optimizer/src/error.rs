use thiserror::Error;

/// Failures raised by a domain-input source (§6.2 collaborators).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot is for site {found}, requested site {requested}")]
    SiteMismatch { requested: i64, found: i64 },
}

/// Errors that surface from an optimization run.
///
/// Everything else (decode failures, dropped records, solver unavailability,
/// infeasibility) is folded into the result object with diagnostic tags.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("required parameter `{0}` is missing")]
    MissingParameter(String),

    #[error("planning window too short: {actual_hours:.1}h (minimum {minimum_hours:.1}h)")]
    WindowTooShort {
        actual_hours: f64,
        minimum_hours: f64,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("invariant violated: {0}")]
    Fatal(String),
}
