#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Fuzz TOML parsing of Config: invalid documents must be rejected
    // gracefully, never by panicking.
    let _ = touchsense_config::Config::from_toml_str(data);
});
