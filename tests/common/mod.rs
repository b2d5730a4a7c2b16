// Shared helpers: authoring well-formed BSDIFF40 patches for the tests.
//
// Patch generation proper (suffix sorting) is outside the crate; these
// builders emit the container directly from explicit control triples, or
// derive a naive additive-head/extra-tail patch from two byte images.
//
// Not every test binary uses every helper.
#![allow(dead_code)]

use std::io::Write;

use bzip2::write::BzEncoder;
use bzip2::Compression;
use oxipatch::patch::header::PatchHeader;
use oxipatch::patch::offt;

pub fn bz(data: &[u8]) -> Vec<u8> {
    let mut enc = BzEncoder::new(Vec::new(), Compression::new(9));
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Assembles a patch from explicit control triples and raw diff/extra bytes.
pub fn build_patch(
    new_size: u64,
    triples: &[(i64, i64, i64)],
    diff: &[u8],
    extra: &[u8],
) -> Vec<u8> {
    let mut ctrl = Vec::with_capacity(triples.len() * 24);
    for &(add, copy, seek) in triples {
        let mut buf = [0u8; 24];
        offt::encode(add, &mut buf[0..8]);
        offt::encode(copy, &mut buf[8..16]);
        offt::encode(seek, &mut buf[16..24]);
        ctrl.extend_from_slice(&buf);
    }

    let (ctrl, diff, extra) = (bz(&ctrl), bz(diff), bz(extra));
    let mut patch = PatchHeader {
        ctrl_len: ctrl.len() as u64,
        diff_len: diff.len() as u64,
        new_size,
    }
    .encode()
    .to_vec();
    patch.extend_from_slice(&ctrl);
    patch.extend_from_slice(&diff);
    patch.extend_from_slice(&extra);
    patch
}

/// Derives a valid single-triple patch taking `old` to `new`: an additive
/// window over the common prefix followed by the remainder as extra bytes.
pub fn naive_patch(old: &[u8], new: &[u8]) -> Vec<u8> {
    let head = old.len().min(new.len());
    let diff: Vec<u8> = (0..head).map(|i| new[i].wrapping_sub(old[i])).collect();
    let extra = &new[head..];
    build_patch(
        new.len() as u64,
        &[(head as i64, extra.len() as i64, 0)],
        &diff,
        extra,
    )
}

/// Applies a patch blob against an in-memory old image.
pub fn apply(patch: &[u8], old: &[u8]) -> Result<Vec<u8>, oxipatch::patch::PatchError> {
    let patcher = oxipatch::patch::Bspatch::new(patch)?;
    let mut out = Vec::new();
    patcher.apply(&mut std::io::Cursor::new(old), old.len() as u64, &mut out)?;
    Ok(out)
}
