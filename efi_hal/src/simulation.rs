//! Deterministic host-side simulation of an absolute-compare output channel.
//!
//! Used by `efi_engine_core`'s tests to verify scheduling and latency
//! compensation without any real timer hardware. The counter only moves
//! when [`SimulationChannel::advance`] is called explicitly, so tests get
//! full control over "time" passing.

use crate::driver::{HalError, OutputChannelDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Idle,
    Armed { rising: u32, falling: u32 },
    Firing { falling: u32 },
}

pub struct SimulationChannel {
    counter: u32,
    state: ChannelState,
    pin_high: bool,
    /// Total rising-edge events observed, for test assertions.
    pub fire_count: u64,
}

impl SimulationChannel {
    pub fn new() -> Self {
        Self {
            counter: 0,
            state: ChannelState::Idle,
            pin_high: false,
            fire_count: 0,
        }
    }

    /// Advance the free-running counter by `ticks`, processing any compare
    /// matches crossed along the way.
    pub fn advance(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.counter = self.counter.wrapping_add(1);
            match self.state {
                ChannelState::Armed { rising, falling } if self.counter == rising => {
                    self.pin_high = true;
                    self.fire_count += 1;
                    self.state = ChannelState::Firing { falling };
                }
                ChannelState::Firing { falling } if self.counter == falling => {
                    self.pin_high = false;
                    self.state = ChannelState::Idle;
                }
                _ => {}
            }
        }
    }

    pub fn pin_high(&self) -> bool {
        self.pin_high
    }
}

impl Default for SimulationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputChannelDriver for SimulationChannel {
    fn read_counter(&self) -> u32 {
        self.counter
    }

    fn set_compare(&mut self, rising: u32, falling: u32) -> Result<(), HalError> {
        if rising.wrapping_sub(self.counter) > u32::MAX / 2 {
            return Err(HalError::TargetInPast);
        }
        self.state = ChannelState::Armed { rising, falling };
        Ok(())
    }

    fn force_low(&mut self) {
        self.pin_high = false;
        self.state = ChannelState::Idle;
    }

    fn is_active(&self) -> bool {
        !matches!(self.state, ChannelState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_rising_then_falling_in_order() {
        let mut ch = SimulationChannel::new();
        ch.set_compare(10, 20).unwrap();
        ch.advance(9);
        assert!(!ch.pin_high());
        ch.advance(1);
        assert!(ch.pin_high());
        ch.advance(9);
        assert!(ch.pin_high());
        ch.advance(1);
        assert!(!ch.pin_high());
        assert_eq!(ch.fire_count, 1);
    }

    #[test]
    fn rejects_target_in_the_past() {
        let mut ch = SimulationChannel::new();
        ch.advance(100);
        assert!(ch.set_compare(5, 15).is_err());
    }

    #[test]
    fn force_low_disarms_immediately() {
        let mut ch = SimulationChannel::new();
        ch.set_compare(5, 15).unwrap();
        ch.advance(5);
        assert!(ch.pin_high());
        ch.force_low();
        assert!(!ch.pin_high());
        assert!(!ch.is_active());
    }

    #[test]
    fn is_active_tracks_armed_and_firing() {
        let mut ch = SimulationChannel::new();
        assert!(!ch.is_active());
        ch.set_compare(3, 6).unwrap();
        assert!(ch.is_active());
        ch.advance(6);
        assert!(!ch.is_active());
    }
}
