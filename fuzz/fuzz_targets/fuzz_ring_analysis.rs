#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use std::time::Duration;

use sorter_core::calculator::resolve;
use sorter_core::{PassEvent, RingSelfCheckService, TopologySnapshot};

#[derive(Debug, Arbitrary)]
struct Input {
    cart_count: i32,
    spacing_mm: f64,
    events: Vec<(Option<i32>, u32, f64)>,
    head: i32,
    base: i32,
}

fuzz_target!(|input: Input| {
    let topology = TopologySnapshot {
        cart_count: input.cart_count,
        total_cart_count: 0,
        cart_spacing_mm: input.spacing_mm,
        ring_total_length_mm: 0.0,
        chute_count: 1,
        chute_width_mm: 1.0,
        cart_width_mm: 1.0,
        track_length_mm: 0.0,
    };
    let events: Vec<PassEvent> = input
        .events
        .iter()
        .map(|(cart, ms, speed)| PassEvent::new(*cart, Duration::from_millis(u64::from(*ms)), *speed))
        .collect();
    let r = RingSelfCheckService::default().run_analysis(&events, &topology);
    assert!(r.measured_cart_count >= 0);

    if input.cart_count > 0 {
        let cart = resolve(input.cart_count, input.head, input.base);
        assert!((1..=input.cart_count).contains(&cart));
    }
});
