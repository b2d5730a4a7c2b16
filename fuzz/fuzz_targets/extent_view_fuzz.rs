#![no_main]
use libfuzzer_sys::fuzz_target;
use oxipatch::extent::view::ExtentView;
use oxipatch::extent::Extent;
use std::io::{Cursor, Read, Seek, SeekFrom};

// Interpret the input as a little extent layout plus a seek/read script;
// the view must never panic and reads must stay inside the logical span.
fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let (layout, script) = data.split_at(data.len() / 2);

    let mut extents = Vec::new();
    for chunk in layout.chunks(2).take(16) {
        let len = 1 + (chunk[0] as u64 % 64);
        if chunk.len() == 2 && chunk[1] & 1 == 1 {
            extents.push(Extent::sparse(len));
        } else {
            extents.push(Extent::new((chunk[0] as i64) % 256, len));
        }
    }
    if extents.is_empty() {
        return;
    }

    let backing = vec![0xA5u8; 512];
    let mut view = ExtentView::from_file(Cursor::new(backing), extents).unwrap();
    let total = view.logical_len();

    let mut buf = [0u8; 64];
    for op in script {
        if op & 1 == 0 {
            let target = (*op as u64 * 7) % (total + 1);
            let got = view.seek(SeekFrom::Start(target)).unwrap();
            assert_eq!(got, target);
        } else {
            let want = 1 + (*op as usize % buf.len());
            let n = view.read(&mut buf[..want]).unwrap();
            assert!(n <= want);
        }
    }
});
