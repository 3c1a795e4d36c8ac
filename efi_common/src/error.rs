//! Shared error taxonomy.
//!
//! One variant per real-time subsystem boundary, mirroring the escalation
//! order the subsystems themselves apply: configuration failures are
//! rejected at startup, sync/scheduler/output failures are recoverable at
//! runtime, and safety failures trigger limp mode.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("crank sync error: {0}")]
    Sync(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("output stage error: {0}")]
    Output(String),

    #[error("safety escalation: {0}")]
    Safety(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_via_from() {
        let cfg_err = ConfigError::FileNotFound;
        let err: EngineError = cfg_err.into();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn display_messages_are_nonempty() {
        let variants = [
            EngineError::Sync("no gap detected".into()),
            EngineError::Scheduler("queue full".into()),
            EngineError::Output("compare write rejected".into()),
            EngineError::Safety("over-rev".into()),
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
