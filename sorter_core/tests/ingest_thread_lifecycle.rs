//! Sensor ingest thread lifecycle: events reach the tracker in order, the
//! thread exits on drop, and stalls are measured against the injected clock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sorter_core::mocks::MemoryRingConfigStore;
use sorter_core::{
    CartRingEngine, ChutePassEvent, ChuteConfigTable, PassEvent, RingConfiguration, SensorEvent,
    TopologySnapshot,
};
use sorter_traits::clock::MonotonicClock;
use sorter_traits::clock::test_clock::TestClock;

fn engine(total: i32) -> CartRingEngine {
    let store = if total > 0 {
        MemoryRingConfigStore::with_config(RingConfiguration::new(total))
    } else {
        MemoryRingConfigStore::new()
    };
    CartRingEngine::builder()
        .with_store(store)
        .with_chute_source(ChuteConfigTable::default())
        .with_topology(TopologySnapshot {
            cart_count: 10,
            total_cart_count: 0,
            cart_spacing_mm: 500.0,
            ring_total_length_mm: 5_000.0,
            chute_count: 4,
            chute_width_mm: 1_000.0,
            cart_width_mm: 480.0,
            track_length_mm: 5_000.0,
        })
        .build()
        .expect("engine builds")
}

fn origin(cart: i32, ms: u64) -> SensorEvent {
    SensorEvent::OriginPass(PassEvent::new(Some(cart), Duration::from_millis(ms), 1_000.0))
}

#[test]
fn origin_passes_advance_the_tracker() {
    let engine = engine(10);
    let pump = engine.spawn_ingest(16, 64, MonotonicClock::new());
    for i in 0..13 {
        pump.send(origin(i % 10 + 1, u64::try_from(i).expect("small") * 500))
            .expect("thread alive");
    }
    assert!(pump.flush(Duration::from_secs(2)));
    assert_eq!(pump.processed(), 13);
    assert_eq!(engine.tracker().pass_count(), 13);
    assert_eq!(engine.get_current_head_cart_number(), Ok(3));
    assert_eq!(engine.tracker().last_pass_at(), Some(Duration::from_millis(6_000)));
}

#[test]
fn chute_passes_are_retained_without_moving_head() {
    let engine = engine(10);
    let pump = engine.spawn_ingest(16, 64, MonotonicClock::new());
    pump.send(SensorEvent::ChutePass(ChutePassEvent {
        chute_id: 2,
        pass: PassEvent::new(Some(2), Duration::ZERO, 1_000.0),
    }))
    .expect("thread alive");
    assert!(pump.flush(Duration::from_secs(2)));
    assert!(!engine.tracker().is_initialized());
    assert_eq!(pump.recent_chute_events().len(), 1);
    assert!(pump.recent_origin_events().is_empty());
}

#[test]
fn window_keeps_most_recent_events() {
    let engine = engine(10);
    let pump = engine.spawn_ingest(4, 5, MonotonicClock::new());
    for i in 0..12u64 {
        pump.send(origin(1, i)).expect("thread alive");
    }
    assert!(pump.flush(Duration::from_secs(2)));
    let kept = pump.recent_origin_events();
    assert_eq!(kept.len(), 5);
    assert_eq!(kept[0].timestamp, Duration::from_millis(7));
    assert_eq!(kept[4].timestamp, Duration::from_millis(11));
}

#[test]
fn calibrate_from_pump_locks_and_drains() {
    let engine = engine(0);
    let pump = engine.spawn_ingest(16, 64, MonotonicClock::new());
    for i in 0..20 {
        pump.send(origin(i % 10 + 1, u64::try_from(i).expect("small") * 500))
            .expect("thread alive");
    }
    assert!(pump.flush(Duration::from_secs(2)));
    let outcome = engine.calibrate_from_pump(&pump).expect("calibration");
    assert!(outcome.process.configuration_updated);
    assert_eq!(engine.ring_configuration(), RingConfiguration::new(10));
    assert!(pump.recent_origin_events().is_empty());
}

#[test]
fn drain_while_producer_runs_loses_nothing() {
    const SENT: i32 = 20_000;
    let engine = engine(10);
    // window large enough that nothing is evicted by capacity
    let pump = Arc::new(engine.spawn_ingest(64, 32_768, MonotonicClock::new()));

    let producer = {
        let pump = Arc::clone(&pump);
        std::thread::spawn(move || {
            for i in 0..SENT {
                pump.send(origin(i + 1, u64::try_from(i).expect("small")))
                    .expect("thread alive");
            }
        })
    };

    let mut seen = HashSet::new();
    while !producer.is_finished() {
        seen.extend(pump.drain_origin_events().into_iter().filter_map(|e| e.cart_id));
    }
    producer.join().expect("producer thread");
    assert!(pump.flush(Duration::from_secs(5)));
    seen.extend(pump.drain_origin_events().into_iter().filter_map(|e| e.cart_id));

    assert_eq!(seen.len(), usize::try_from(SENT).expect("small"));
    assert_eq!(pump.processed(), u64::try_from(SENT).expect("small"));
}

#[test]
fn calibration_cycles_during_ingest_see_every_origin_pass() {
    const SENT: i32 = 5_000;
    let engine = engine(0);
    let pump = Arc::new(engine.spawn_ingest(64, 8_192, MonotonicClock::new()));

    let producer = {
        let pump = Arc::clone(&pump);
        std::thread::spawn(move || {
            for i in 0..SENT {
                pump.send(origin(i + 1, u64::try_from(i).expect("small") * 500))
                    .expect("thread alive");
            }
        })
    };

    let mut analyzed = 0;
    while !producer.is_finished() {
        let outcome = engine.calibrate_from_pump(&pump).expect("calibration");
        analyzed += outcome.check.measured_cart_count;
    }
    producer.join().expect("producer thread");
    assert!(pump.flush(Duration::from_secs(5)));
    analyzed += engine
        .calibrate_from_pump(&pump)
        .expect("calibration")
        .check
        .measured_cart_count;

    // ids are unique, so each cycle's distinct count is its batch size
    assert_eq!(analyzed, SENT);
    assert!(pump.drain_chute_events().is_empty());
}

#[test]
fn pump_thread_exits_on_drop() {
    for _ in 0..10 {
        let engine = engine(10);
        let pump = engine.spawn_ingest(8, 8, MonotonicClock::new());
        pump.send(origin(1, 0)).expect("thread alive");
        drop(pump);
    }
    // passes if no drop hangs
}

#[test]
fn stall_is_measured_on_injected_clock() {
    let engine = engine(10);
    let clock = TestClock::new();
    let pump = engine.spawn_ingest(8, 8, clock.clone());
    pump.send(origin(1, 0)).expect("thread alive");
    assert!(pump.flush(Duration::from_secs(2)));
    assert_eq!(pump.stalled_for_now(), 0);

    clock.advance(Duration::from_millis(750));
    assert_eq!(pump.stalled_for_now(), 750);
}
