#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = toml::from_str::<sorter_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A validated config must always convert into core types.
            let _ = sorter_core::TopologySnapshot::from(&cfg.topology);
            for c in &cfg.chutes {
                let _ = sorter_core::ChuteConfig::from(c);
            }
        }
    }
});
