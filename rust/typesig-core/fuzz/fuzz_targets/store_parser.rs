#![no_main]
use libfuzzer_sys::fuzz_target;
use std::path::Path;
use typesig_core::store;

fuzz_target!(|data: &[u8]| {
    let _ = store::parse_samples(Path::new("fuzz.json"), data);
});
