//! Angle-addressed event queue shared between the planner (Core 1 writer)
//! and the per-tooth scheduler scan (Core 0 reader/writer).
//!
//! Fixed capacity, no dynamic allocation: backed by a [`heapless::Vec`] so
//! the queue can never grow past `CAP` slots regardless of how fast the
//! planner arms events, guarded by a single [`parking_lot::Mutex`] standing
//! in for the MCU's ISR-safe critical section. Every hold is short (one
//! linear scan of the slot vec) and is never taken across a blocking call,
//! matching the discipline the wider workspace's P2P segments document for
//! their own short critical sections.

use efi_common::angle::Angle;
use efi_common::consts::EVENT_QUEUE_CAPACITY as CAP;
use heapless::Vec as HVec;
use parking_lot::Mutex;

/// Kind of angle-addressed engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    InjectorOpen = 0,
    InjectorClose = 1,
    IgnitionDwell = 2,
    IgnitionSpark = 3,
}

impl EventType {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::InjectorOpen),
            1 => Some(Self::InjectorClose),
            2 => Some(Self::IgnitionDwell),
            3 => Some(Self::IgnitionSpark),
            _ => None,
        }
    }
}

/// One angle-addressed engine event slot. Presence in the queue means
/// armed; there is no separate "armed" flag to keep in sync.
#[derive(Debug, Clone, Copy)]
pub struct EngineEvent {
    pub event_type: EventType,
    pub cylinder: u8,
    pub angle: Angle,
    /// Pulsewidth (injection) or unused (ignition — dwell is computed from
    /// `rpm_snapshot`/`vbat_snapshot` at fire time).
    pub param_us: u32,
    pub rpm_snapshot: u32,
    pub vbat_snapshot_mv: u32,
}

/// Fixed-capacity angle-addressed event queue.
pub struct EventQueue {
    slots: Mutex<HVec<EngineEvent, CAP>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HVec::new()),
        }
    }

    /// Arm a new slot. Returns `Err(())` if the queue is already at `CAP`.
    pub fn schedule(
        &self,
        event_type: EventType,
        cylinder: u8,
        angle: Angle,
        param_us: u32,
        rpm_snapshot: u32,
        vbat_snapshot_mv: u32,
    ) -> Result<(), ()> {
        let event = EngineEvent {
            event_type,
            cylinder,
            angle,
            param_us,
            rpm_snapshot,
            vbat_snapshot_mv,
        };
        self.slots.lock().push(event).map_err(|_| ())
    }

    pub fn cancel_all(&self) {
        self.slots.lock().clear();
    }

    pub fn cancel_cylinder(&self, cylinder: u8) {
        let mut slots = self.slots.lock();
        let mut i = 0;
        while i < slots.len() {
            if slots[i].cylinder == cylinder {
                slots.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    pub fn cancel_type(&self, event_type: EventType) {
        let mut slots = self.slots.lock();
        let mut i = 0;
        while i < slots.len() {
            if slots[i].event_type == event_type {
                slots.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Visit every armed slot, invoking `f(index, event)`. If `f` returns
    /// `true` the slot is removed (the event fired or was otherwise
    /// consumed). Runs under the single critical section for the whole
    /// scan, matching the per-tooth scheduler's scan-then-fire contract.
    pub fn scan_and_clear<F: FnMut(usize, &EngineEvent) -> bool>(&self, mut f: F) {
        let mut slots = self.slots.lock();
        let mut i = 0;
        while i < slots.len() {
            if f(i, &slots[i]) {
                slots.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
