//! Per-tooth scan benchmark: the full cost of [`EngineCore::on_tooth_edge`]
//! in steady-state sync, one armed event per cylinder. This is the ISR-
//! context hot path and has to stay well under one tooth period (a few
//! hundred microseconds at cranking speed) on real hardware.

use criterion::{criterion_group, criterion_main, Criterion};
use efi_common::config::EngineConfig;
use efi_common::consts::CYLINDER_COUNT;
use efi_engine_core::output::OutputStage;
use efi_engine_core::{default_latency_model, EngineCore};
use efi_hal::{OutputChannelDriver, SimulationChannel};
use efi_shared_state::queue::EventType;
use std::hint::black_box;

fn engine_in_sync() -> (EngineCore, u64) {
    let injectors: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
        std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
    let ignition: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
        std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
    let output = OutputStage::new(
        injectors,
        ignition,
        default_latency_model(),
        EngineConfig::default().ignition,
        EngineConfig::default().injection,
    );
    let mut engine = EngineCore::new(EngineConfig::default(), output);

    let mut t = 0u64;
    engine.on_tooth_edge(t, 13_800, 80);
    for _ in 0..5 {
        t += 6000;
        engine.on_tooth_edge(t, 13_800, 80);
    }
    engine.on_cam_edge();
    t += 12_000;
    engine.on_tooth_edge(t, 13_800, 80);

    for cyl in 0..CYLINDER_COUNT as u8 {
        engine
            .schedule(EventType::InjectorOpen, cyl, (cyl as f64) * 90.0 + 3.0, 2000, engine.rpm(), 13_800)
            .unwrap();
    }
    (engine, t)
}

fn bench_on_tooth_edge_steady_state(c: &mut Criterion) {
    c.bench_function("on_tooth_edge_in_sync_4_armed", |b| {
        b.iter_batched(
            engine_in_sync,
            |(mut engine, mut t)| {
                t += 6000;
                black_box(engine.on_tooth_edge(black_box(t), 13_800, 80));
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_on_tooth_edge_steady_state);
criterion_main!(benches);
