#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing must never panic; compilation may reject, never crash
    let node = trq::query::parse(data);
    let _ = trq::query::compile(&node, true);
});
