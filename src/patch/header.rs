// The 32-byte BSDIFF40 patch header.
//
// Layout:
//   0   8  magic "BSDIFF40"
//   8   8  X = compressed size of the control stream (sign-magnitude LE)
//   16  8  Y = compressed size of the diff stream    (sign-magnitude LE)
//   24  8  N = uncompressed new-image size           (sign-magnitude LE)

use super::apply::PatchError;
use super::offt;

/// The eight magic bytes opening every patch.
pub const MAGIC: [u8; 8] = *b"BSDIFF40";

/// Total header size in bytes.
pub const HEADER_LEN: usize = 32;

/// Parsed BSDIFF40 patch header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchHeader {
    /// Compressed size of the control sub-stream.
    pub ctrl_len: u64,
    /// Compressed size of the diff sub-stream.
    pub diff_len: u64,
    /// Uncompressed size of the new image.
    pub new_size: u64,
}

impl PatchHeader {
    /// Parses the header from the start of a patch blob.
    ///
    /// Rejects short input, a bad magic, and negative declared lengths.
    pub fn decode(patch: &[u8]) -> Result<Self, PatchError> {
        if patch.len() < HEADER_LEN {
            return Err(PatchError::corrupt("patch shorter than header"));
        }
        if patch[..8] != MAGIC {
            return Err(PatchError::corrupt("bad magic"));
        }

        let ctrl_len = offt::decode(&patch[8..16]);
        let diff_len = offt::decode(&patch[16..24]);
        let new_size = offt::decode(&patch[24..32]);
        if ctrl_len < 0 || diff_len < 0 || new_size < 0 {
            return Err(PatchError::corrupt("negative length in header"));
        }

        Ok(PatchHeader {
            ctrl_len: ctrl_len as u64,
            diff_len: diff_len as u64,
            new_size: new_size as u64,
        })
    }

    /// Writes the 32-byte header for the given sizes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..8].copy_from_slice(&MAGIC);
        offt::encode(self.ctrl_len as i64, &mut out[8..16]);
        offt::encode(self.diff_len as i64, &mut out[16..24]);
        offt::encode(self.new_size as i64, &mut out[24..32]);
        out
    }
}
