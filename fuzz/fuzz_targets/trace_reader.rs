#![no_main]

use hartrace::config::EngineConfig;
use hartrace::engine::Engine;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(engine) = Engine::new(EngineConfig::default()) else {
        return;
    };
    // Any byte string is a valid log: partial tails end the input
    let batch = engine.run(data).expect("reading from a slice cannot fail");
    let streamed = engine.run_streaming(data).expect("reading from a slice cannot fail");
    assert_eq!(batch, streamed);
});
