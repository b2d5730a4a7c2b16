// Reconstruction engine: drives the control/diff/extra loop that emits
// the new image.
//
// The engine materializes the whole new image in memory before flushing
// it to the target sink; the additive step reads back bytes written
// moments earlier in the same control window, so completed prefixes can
// only be retired once both the diff and extra segments feeding them are
// done.

use std::io::{Read, Seek, SeekFrom, Write};

use super::header::PatchHeader;
use super::offt;
use super::streams::{read_full, PatchStreams};
use super::Control;

/// Largest new-image size the engine will allocate a buffer for.
pub const MAX_NEW_SIZE: u64 = 1 << 30; // 1 GiB

/// Chunk size for streaming the old view during the additive step.
const COPY_BUF_SIZE: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PatchError {
    /// The patch violates the BSDIFF40 format or its own declared sizes.
    Corrupt(&'static str),
    /// The declared new-image size exceeds [`MAX_NEW_SIZE`].
    TooLarge(u64),
    /// Allocating the new-image buffer failed.
    OutOfMemory(usize),
    /// Reading the old view or writing the target failed.
    Io(std::io::Error),
}

impl PatchError {
    pub(crate) fn corrupt(what: &'static str) -> Self {
        PatchError::Corrupt(what)
    }
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt(what) => write!(f, "corrupt patch: {what}"),
            Self::TooLarge(n) => {
                write!(f, "declared new size {n} exceeds the {MAX_NEW_SIZE}-byte limit")
            }
            Self::OutOfMemory(n) => write!(f, "failed to allocate {n}-byte image buffer"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PatchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Patcher
// ---------------------------------------------------------------------------

/// BSDIFF40 patch applier.
///
/// Parses the patch header and the three sub-stream regions up front, then
/// reconstructs the new image from any seekable old view:
///
/// ```no_run
/// use std::io::Cursor;
/// use oxipatch::patch::Bspatch;
///
/// # fn demo(patch: &[u8], old: &[u8]) -> Result<(), oxipatch::patch::PatchError> {
/// let patcher = Bspatch::new(patch)?;
/// let mut new = Vec::with_capacity(patcher.hint_target_size() as usize);
/// patcher.apply(&mut Cursor::new(old), old.len() as u64, &mut new)?;
/// # Ok(())
/// # }
/// ```
pub struct Bspatch<'p> {
    header: PatchHeader,
    streams: PatchStreams<'p>,
}

impl<'p> Bspatch<'p> {
    /// Parses the patch blob and positions the three stream cursors.
    pub fn new(patch: &'p [u8]) -> Result<Self, PatchError> {
        let header = PatchHeader::decode(patch)?;
        let streams = PatchStreams::open(patch, &header)?;
        Ok(Bspatch { header, streams })
    }

    /// The new-image size declared in the patch header.
    pub fn hint_target_size(&self) -> u64 {
        self.header.new_size
    }

    /// Applies the patch, reading old bytes from `old` (a view of logical
    /// length `old_size`) and writing the finished image to `target`.
    ///
    /// Returns the number of bytes written, which on success is exactly the
    /// header-declared new size.
    pub fn apply<O, W>(mut self, old: &mut O, old_size: u64, mut target: W) -> Result<u64, PatchError>
    where
        O: Read + Seek,
        W: Write,
    {
        let new_size = self.header.new_size;
        if new_size > MAX_NEW_SIZE {
            return Err(PatchError::TooLarge(new_size));
        }

        // One extra byte keeps the allocation non-zero for an empty image.
        let mut new = Vec::new();
        new.try_reserve_exact(new_size as usize + 1)
            .map_err(|_| PatchError::OutOfMemory(new_size as usize + 1))?;
        new.resize(new_size as usize, 0u8);

        let mut old_pos: i64 = 0;
        let mut new_pos: u64 = 0;
        while new_pos < new_size {
            let ctrl = self.next_control()?;

            if new_pos + ctrl.add > new_size {
                return Err(PatchError::corrupt("diff window exceeds new size"));
            }
            let window = &mut new[new_pos as usize..(new_pos + ctrl.add) as usize];
            read_full(&mut self.streams.diff, window)?;
            add_old_bytes(old, old_size, old_pos, window)?;
            new_pos += ctrl.add;
            old_pos = old_pos.saturating_add(ctrl.add as i64);

            if new_pos + ctrl.copy > new_size {
                return Err(PatchError::corrupt("extra window exceeds new size"));
            }
            let window = &mut new[new_pos as usize..(new_pos + ctrl.copy) as usize];
            read_full(&mut self.streams.extra, window)?;
            new_pos += ctrl.copy;
            old_pos = old_pos.saturating_add(ctrl.seek);
        }

        target.write_all(&new)?;
        target.flush()?;
        Ok(new_size)
    }

    /// Reads and validates the next control triple.
    fn next_control(&mut self) -> Result<Control, PatchError> {
        let mut buf = [0u8; 3 * offt::WIDTH];
        read_full(&mut self.streams.ctrl, &mut buf)?;
        let add = offt::decode(&buf[0..8]);
        let copy = offt::decode(&buf[8..16]);
        let seek = offt::decode(&buf[16..24]);
        if add < 0 || copy < 0 {
            return Err(PatchError::corrupt("negative control length"));
        }
        Ok(Control {
            add: add as u64,
            copy: copy as u64,
            seek,
        })
    }
}

/// Adds old bytes into a freshly read diff window, modulo 256.
///
/// Only the intersection of `[old_pos, old_pos + window.len())` with
/// `[0, old_size)` contributes; bytes outside the old view are left as the
/// raw diff bytes. The old view is sought once and the run is streamed.
fn add_old_bytes<O: Read + Seek>(
    old: &mut O,
    old_size: u64,
    old_pos: i64,
    window: &mut [u8],
) -> Result<(), PatchError> {
    let end = old_pos.saturating_add(window.len() as i64);
    if window.is_empty() || end <= 0 || old_pos >= old_size as i64 {
        return Ok(());
    }

    let start = old_pos.max(0) as u64;
    let stop = (end as u64).min(old_size);
    let skip = (start as i64 - old_pos) as usize;
    let run = (stop - start) as usize;

    old.seek(SeekFrom::Start(start))?;

    let mut buf = [0u8; COPY_BUF_SIZE];
    let mut done = 0;
    while done < run {
        let want = (run - done).min(COPY_BUF_SIZE);
        old.read_exact(&mut buf[..want])?;
        for (dst, src) in window[skip + done..skip + done + want].iter_mut().zip(&buf[..want]) {
            *dst = dst.wrapping_add(*src);
        }
        done += want;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Cursor;

    fn bz(data: &[u8]) -> Vec<u8> {
        let mut enc = BzEncoder::new(Vec::new(), Compression::new(9));
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn build_patch(new_size: u64, triples: &[(i64, i64, i64)], diff: &[u8], extra: &[u8]) -> Vec<u8> {
        let mut ctrl = Vec::new();
        for &(add, copy, seek) in triples {
            let mut buf = [0u8; 24];
            offt::encode(add, &mut buf[0..8]);
            offt::encode(copy, &mut buf[8..16]);
            offt::encode(seek, &mut buf[16..24]);
            ctrl.extend_from_slice(&buf);
        }
        let (ctrl, diff, extra) = (bz(&ctrl), bz(diff), bz(extra));
        let header = PatchHeader {
            ctrl_len: ctrl.len() as u64,
            diff_len: diff.len() as u64,
            new_size,
        };
        let mut patch = header.encode().to_vec();
        patch.extend_from_slice(&ctrl);
        patch.extend_from_slice(&diff);
        patch.extend_from_slice(&extra);
        patch
    }

    fn apply(patch: &[u8], old: &[u8]) -> Result<Vec<u8>, PatchError> {
        let patcher = Bspatch::new(patch)?;
        let mut out = Vec::new();
        patcher.apply(&mut Cursor::new(old), old.len() as u64, &mut out)?;
        Ok(out)
    }

    #[test]
    fn additive_merge() {
        let patch = build_patch(3, &[(3, 0, 3)], &[0x01, 0x02, 0x03], b"");
        let out = apply(&patch, &[0x10, 0x20, 0x30]).unwrap();
        assert_eq!(out, [0x11, 0x22, 0x33]);
    }

    #[test]
    fn extra_only() {
        let patch = build_patch(4, &[(0, 4, 0)], b"", b"ABCD");
        let out = apply(&patch, b"whatever").unwrap();
        assert_eq!(out, b"ABCD");
    }

    #[test]
    fn old_bytes_out_of_range_contribute_zero() {
        let patch = build_patch(3, &[(3, 0, 0)], &[0x01, 0x02, 0x03], b"");
        let out = apply(&patch, &[0xAA]).unwrap();
        assert_eq!(out, [0xAB, 0x02, 0x03]);
    }

    #[test]
    fn negative_seek_rereads_old() {
        // "ABC" then back two and three more: "ABCBCD".
        let patch = build_patch(6, &[(3, 0, -2), (3, 0, 0)], &[0u8; 6], b"");
        let out = apply(&patch, b"ABCDEF").unwrap();
        assert_eq!(out, b"ABCBCD");
    }

    #[test]
    fn negative_old_cursor_skips_leading_bytes() {
        // Seek the old cursor to -2; only the tail of the window overlaps
        // the old view.
        let patch = build_patch(7, &[(0, 3, -2), (4, 0, 0)], &[0u8; 4], b"xyz");
        let out = apply(&patch, b"AB").unwrap();
        assert_eq!(out, b"xyz\0\0AB");
    }

    #[test]
    fn diff_window_bound_violation_is_corrupt() {
        let patch = build_patch(2, &[(3, 0, 0)], &[0u8; 3], b"");
        assert!(matches!(apply(&patch, b"abc"), Err(PatchError::Corrupt(_))));
    }

    #[test]
    fn negative_control_length_is_corrupt() {
        let patch = build_patch(4, &[(-1, 0, 0)], b"", b"");
        assert!(matches!(apply(&patch, b""), Err(PatchError::Corrupt(_))));
    }

    #[test]
    fn truncated_diff_stream_is_corrupt() {
        let patch = build_patch(4, &[(4, 0, 0)], &[0u8; 2], b"");
        assert!(matches!(apply(&patch, b"abcd"), Err(PatchError::Corrupt(_))));
    }

    #[test]
    fn oversized_declared_image_is_refused() {
        let patch = build_patch(MAX_NEW_SIZE + 1, &[], b"", b"");
        assert!(matches!(apply(&patch, b""), Err(PatchError::TooLarge(_))));
    }

    #[test]
    fn empty_new_image() {
        let patch = build_patch(0, &[], b"", b"");
        assert_eq!(apply(&patch, b"old").unwrap(), b"");
    }
}
