#![no_main]
use libfuzzer_sys::fuzz_target;

use touchsense_core::channel::Channel;
use touchsense_core::mocks::MemoryStore;
use touchsense_core::settings::read_settings;

fuzz_target!(|data: &[u8]| {
    // An arbitrary store image must either parse as a valid record or be
    // rejected with a typed error; reads past the end, truncated records and
    // bit rot must never panic or apply partial threshold sets.
    let mut store = MemoryStore::new(data.len());
    store.data_mut().copy_from_slice(data);

    for n in [1usize, 2, 32] {
        let mut channels = vec![Channel::default(); n];
        let defaults: Vec<[f32; 4]> = channels.iter().map(|c| c.thresholds()).collect();
        if read_settings(&store, 0, &mut channels).is_err() {
            let after: Vec<[f32; 4]> = channels.iter().map(|c| c.thresholds()).collect();
            let unchanged = defaults
                .iter()
                .zip(&after)
                .all(|(a, b)| a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
            assert!(unchanged, "rejected read must not modify thresholds");
        }
    }
});
