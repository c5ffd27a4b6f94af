#![no_main]
use libfuzzer_sys::fuzz_target;
use murmur_provider_gemini::mapping::delta_text;
use murmur_provider_gemini::{ObjectExtractor, Utf8Decoder};

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size so splits land everywhere.
    let Some((&size, body)) = data.split_first() else {
        return;
    };
    let size = usize::from(size).max(1);

    let mut decoder = Utf8Decoder::new();
    let mut extractor = ObjectExtractor::new();
    let mut objects = Vec::new();
    for piece in body.chunks(size) {
        objects.extend(extractor.feed(&decoder.decode(piece)));
    }
    objects.extend(extractor.feed(&decoder.finish()));
    objects.extend(extractor.finish());

    for object in &objects {
        assert!(object.starts_with('{') && object.ends_with('}'));
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(object) {
            let _ = delta_text(&value);
        }
    }
});
