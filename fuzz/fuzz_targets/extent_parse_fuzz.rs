#![no_main]
use libfuzzer_sys::fuzz_target;
use oxipatch::extent::parse_extents;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(extents) = parse_extents(text) {
            // Anything accepted must be reparseable from its own rendering.
            let rendered: Vec<String> = extents
                .iter()
                .map(|ex| format!("{}:{}", ex.offset, ex.length))
                .collect();
            let reparsed = parse_extents(&rendered.join(",")).unwrap();
            assert_eq!(extents, reparsed);
        }
    }
});
