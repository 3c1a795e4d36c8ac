//! Absolute-compare timer capability trait and error types.
//!
//! The output stage (`efi_engine_core`) never talks to registers directly;
//! it drives channels through this trait so the exact same scheduling code
//! runs against a deterministic host-side simulation in tests and against
//! real MMIO on a `hw`-feature build.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HalError {
    #[error("initialization failed: {0}")]
    InitFailed(String),

    #[error("driver not found: {0}")]
    DriverNotFound(String),

    #[error("channel index out of range: {0}")]
    ChannelOutOfRange(usize),

    #[error("target time is in the past")]
    TargetInPast,
}

/// One free-running, absolute-compare capable output channel.
///
/// Implementations never stop the underlying timer; scheduling a pulse
/// means writing new compare values, never restarting anything.
pub trait OutputChannelDriver: Send {
    /// Current free-running counter value, in timer ticks.
    fn read_counter(&self) -> u32;

    /// Arm the channel: pin goes high at `rising`, low at `falling`
    /// (both absolute counter values). Returns an error without touching
    /// hardware if `rising` has already passed relative to the current
    /// counter.
    fn set_compare(&mut self, rising: u32, falling: u32) -> Result<(), HalError>;

    /// Immediately force the output pin low and disarm the channel.
    fn force_low(&mut self);

    /// `true` if the channel is currently between its rising and falling
    /// compare matches.
    fn is_active(&self) -> bool;
}

/// Factory function type for creating channel driver instances.
pub type ChannelDriverFactory = fn() -> Box<dyn OutputChannelDriver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hal_error_messages_contain_detail() {
        assert!(HalError::InitFailed("x".into()).to_string().contains('x'));
        assert!(HalError::DriverNotFound("sim".into())
            .to_string()
            .contains("sim"));
        assert!(matches!(
            HalError::ChannelOutOfRange(9).to_string().as_str(),
            s if s.contains('9')
        ));
    }
}
