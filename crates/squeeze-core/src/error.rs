use thiserror::Error;

/// Fatal errors — all of these abort the process before the scheduler loop starts.
/// Per-ticker provider failures never produce one of these; they fold into `None`
/// plus a drop-reason string instead (see `AbsentReason`).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("strict mode: missing credential for provider '{0}'")]
    StrictModeMissingCredential(String),

    #[error("cache I/O error: {0}")]
    CacheError(String),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

/// Reason a provider call or record-level computation yielded no value. Carried as
/// metadata for logging/audit only — it never surfaces as a `Result::Err` from the
/// provider port; absence collapses to `Option::None` at that boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    Http(u16),
    Timeout,
    Parse,
    Cancelled,
    NotConfigured,
}

impl std::fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbsentReason::Http(code) => write!(f, "http_{code}"),
            AbsentReason::Timeout => write!(f, "timeout"),
            AbsentReason::Parse => write!(f, "parse_error"),
            AbsentReason::Cancelled => write!(f, "cancelled"),
            AbsentReason::NotConfigured => write!(f, "not_configured"),
        }
    }
}

#[cfg(test)]
/// Only ever asserted against in property tests; never constructed by production code.
#[derive(Error, Debug)]
#[error("determinism breach: {0}")]
pub struct DeterminismBreach(pub String);
