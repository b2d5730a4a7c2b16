// The three bzip2 sub-streams of a patch.
//
// A patch blob carries three independently compressed streams laid out
// back to back after the header: control at offset 32, diff at 32+X,
// extra at 32+X+Y. Each is consumed strictly sequentially by its own
// decompression cursor over a disjoint slice of the blob.

use std::io::{Cursor, ErrorKind, Read};

use bzip2::read::BzDecoder;

use super::apply::PatchError;
use super::header::{PatchHeader, HEADER_LEN};

/// The three decompression cursors of one patch blob.
pub struct PatchStreams<'a> {
    pub ctrl: BzDecoder<Cursor<&'a [u8]>>,
    pub diff: BzDecoder<Cursor<&'a [u8]>>,
    pub extra: BzDecoder<Cursor<&'a [u8]>>,
}

impl<'a> PatchStreams<'a> {
    /// Splits `patch` at the offsets the header declares and opens a
    /// decoder over each region.
    pub fn open(patch: &'a [u8], header: &PatchHeader) -> Result<Self, PatchError> {
        let declared = (HEADER_LEN as u64)
            .checked_add(header.ctrl_len)
            .and_then(|n| n.checked_add(header.diff_len))
            .ok_or_else(|| PatchError::corrupt("declared stream sizes overflow"))?;
        if declared > patch.len() as u64 {
            return Err(PatchError::corrupt("declared streams exceed patch size"));
        }

        let (_, rest) = patch.split_at(HEADER_LEN);
        let (ctrl, rest) = rest.split_at(header.ctrl_len as usize);
        let (diff, extra) = rest.split_at(header.diff_len as usize);

        Ok(PatchStreams {
            ctrl: BzDecoder::new(Cursor::new(ctrl)),
            diff: BzDecoder::new(Cursor::new(diff)),
            extra: BzDecoder::new(Cursor::new(extra)),
        })
    }
}

/// Fills `buf` completely from a sub-stream.
///
/// A short read (including end-of-stream) or any decoder failure before
/// the required count is produced means the patch is corrupt; reaching
/// end-of-stream exactly after the final required byte is fine.
pub fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), PatchError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => return Err(PatchError::corrupt("truncated sub-stream")),
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(_) => return Err(PatchError::corrupt("sub-stream decompression failed")),
        }
    }
    Ok(())
}
