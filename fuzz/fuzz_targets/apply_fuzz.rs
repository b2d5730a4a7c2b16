#![no_main]
use libfuzzer_sys::fuzz_target;
use oxipatch::patch::Bspatch;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a patch. The applier must never panic — only
    // return errors.
    if let Ok(patcher) = Bspatch::new(data) {
        if patcher.hint_target_size() <= 1 << 20 {
            let mut out = Vec::new();
            let _ = patcher.apply(&mut Cursor::new(&b""[..]), 0, &mut out);
        }
    }

    // Also split the input into an old image and a patch.
    if data.len() >= 2 {
        let (old, patch) = data.split_at(data.len() / 2);
        if let Ok(patcher) = Bspatch::new(patch) {
            if patcher.hint_target_size() <= 1 << 20 {
                let mut out = Vec::new();
                let _ = patcher.apply(&mut Cursor::new(old), old.len() as u64, &mut out);
            }
        }
    }
});
