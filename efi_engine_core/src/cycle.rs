//! Deterministic Core 0 cycle runner: RT setup, drift-free pacing, and
//! per-cycle timing statistics.
//!
//! On the real target, Core 0 never "wakes up" on a timer — tooth edges
//! arrive as interrupts and the decoder/scheduler run inline inside the
//! ISR. `CycleRunner` models the thread that *hosts* that interrupt
//! context: it performs the same RT setup sequence a bare-metal interrupt
//! handler's core would need (memory locking, CPU affinity, scheduling
//! policy) and, in the absence of real hardware interrupts, polls a
//! [`TickHandler`] at high frequency so the exact same decoder/scheduler
//! code runs deterministically on the host.
//!
//! ## RT Setup Sequence
//! 1. Pre-allocate all runtime state (zero heap in the loop).
//! 2. `mlockall(MCL_CURRENT | MCL_FUTURE)` — lock all pages.
//! 3. Prefault the stack.
//! 4. `sched_setaffinity` — pin to an isolated CPU core.
//! 5. `sched_setscheduler(SCHED_FIFO, priority)` — RT priority.
//!
//! ## Cycle Loop
//! Absolute-time sleep on `CLOCK_MONOTONIC` for drift-free pacing in the
//! `rt` build; `std::thread::sleep` pacing otherwise. A single overrun is
//! fatal in the `rt` build and merely counted in simulation.

use efi_common::consts::{CORE0_CPU_AFFINITY_DEFAULT, CORE0_RT_PRIORITY_DEFAULT};
use efi_common::timing::RunningStats;

/// Errors during RT setup or cycle execution.
#[derive(Debug)]
pub enum CycleError {
    RtSetup(String),
    CycleOverrun { actual_ns: i64, budget_ns: i64 },
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RtSetup(msg) => write!(f, "RT setup error: {msg}"),
            Self::CycleOverrun {
                actual_ns,
                budget_ns,
            } => write!(f, "cycle overrun: {actual_ns}ns > {budget_ns}ns budget"),
        }
    }
}

impl std::error::Error for CycleError {}

/// Something driven once per Core 0 poll (or, on real hardware, once per
/// tooth-edge interrupt).
pub trait TickHandler {
    /// Advance the handler by one tick at timestamp `now_us`.
    fn tick(&mut self, now_us: u64);
}

/// CPU pinning and scheduling policy for the Core-0 tooth-edge thread.
/// Unused in simulation builds (no `rt` feature) beyond the stack prefault,
/// which is cheap enough to always run so a cold page fault never lands
/// inside the first real tooth-edge callback.
#[derive(Debug, Clone, Copy)]
pub struct RtSetupConfig {
    pub cpu_core: usize,
    pub rt_priority: i32,
}

impl Default for RtSetupConfig {
    fn default() -> Self {
        Self {
            cpu_core: CORE0_CPU_AFFINITY_DEFAULT,
            rt_priority: CORE0_RT_PRIORITY_DEFAULT,
        }
    }
}

/// Lock every page this process currently has, and every page it maps in
/// the future, so the tooth-edge callback can never stall on a page fault.
#[cfg(feature = "rt")]
fn lock_pages() -> Result<(), CycleError> {
    use nix::sys::mman::{mlockall, MlockallFlags};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn lock_pages() -> Result<(), CycleError> {
    Ok(())
}

/// Touch a full megabyte of stack so the guard-page fault it would
/// otherwise trigger happens here, during setup, rather than mid-scan on
/// the first deeply recursive tooth-edge call.
fn prefault_stack() {
    let mut buf = [0u8; 1024 * 1024];
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the calling thread to `cfg.cpu_core` and raise it to `SCHED_FIFO` at
/// `cfg.rt_priority`, so the tooth-edge thread is never preempted by
/// anything below the kernel's own interrupt threads. The two calls are
/// done together: affinity without the priority bump (or vice versa) isn't
/// a state this crate ever wants to be left in on a setup failure.
#[cfg(feature = "rt")]
fn pin_and_prioritize(cfg: &RtSetupConfig) -> Result<(), CycleError> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cfg.cpu_core)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({}) failed: {e}", cfg.cpu_core)))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))?;

    let param = libc::sched_param {
        sched_priority: cfg.rt_priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {}) failed: {err}",
            cfg.rt_priority
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn pin_and_prioritize(_cfg: &RtSetupConfig) -> Result<(), CycleError> {
    Ok(())
}

/// Perform the full RT setup sequence for the calling thread. Must run
/// before that thread starts feeding tooth edges into
/// [`EngineCore::on_tooth_edge`](crate::EngineCore::on_tooth_edge). In
/// simulation builds (no `rt` feature) only the stack prefault runs.
pub fn rt_setup(cfg: &RtSetupConfig) -> Result<(), CycleError> {
    lock_pages()?;
    prefault_stack();
    pin_and_prioritize(cfg)?;
    Ok(())
}

/// Drives a [`TickHandler`] at a fixed poll period, tracking per-cycle
/// timing statistics.
pub struct CycleRunner<H: TickHandler> {
    handler: H,
    poll_period_ns: i64,
    pub stats: RunningStats,
    overruns: u64,
}

impl<H: TickHandler> CycleRunner<H> {
    pub fn new(handler: H, poll_period_us: u64) -> Self {
        Self {
            handler,
            poll_period_ns: poll_period_us as i64 * 1000,
            stats: RunningStats::new(),
            overruns: 0,
        }
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Run a bounded number of poll cycles (used by tests and by the
    /// simulation entry point); the real target's equivalent loop never
    /// returns.
    #[cfg(not(feature = "rt"))]
    pub fn run_sim_loop(&mut self, cycles: u64, now_us: impl Fn() -> u64) -> Result<(), CycleError> {
        let cycle_duration = std::time::Duration::from_nanos(self.poll_period_ns as u64);
        for _ in 0..cycles {
            let cycle_start = std::time::Instant::now();
            self.handler.tick(now_us());
            let elapsed = cycle_start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns.max(0) as u64);
            if duration_ns > self.poll_period_ns {
                self.overruns += 1;
            }
            if let Some(remaining) = cycle_duration.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler {
        ticks: u64,
    }

    impl TickHandler for CountingHandler {
        fn tick(&mut self, _now_us: u64) {
            self.ticks += 1;
        }
    }

    #[test]
    fn rt_setup_no_rt_feature_is_noop() {
        let result = rt_setup(&RtSetupConfig::default());
        assert!(result.is_ok());
    }

    #[test]
    fn rt_setup_config_defaults_match_core0_constants() {
        let cfg = RtSetupConfig::default();
        assert_eq!(cfg.cpu_core, CORE0_CPU_AFFINITY_DEFAULT);
        assert_eq!(cfg.rt_priority, CORE0_RT_PRIORITY_DEFAULT);
    }

    #[test]
    fn cycle_error_display() {
        let err = CycleError::CycleOverrun {
            actual_ns: 1_500_000,
            budget_ns: 1_000_000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("1500000"));
        assert!(msg.contains("1000000"));
    }

    #[test]
    fn run_sim_loop_drives_handler_once_per_cycle() {
        let handler = CountingHandler { ticks: 0 };
        let mut runner = CycleRunner::new(handler, 1);
        runner.run_sim_loop(5, || 0).unwrap();
        assert_eq!(runner.handler.ticks, 5);
        assert_eq!(runner.stats.count(), 5);
    }
}
