// BSDIFF40 format core: header parsing, the three bzip2 sub-streams, and
// the reconstruction engine.

pub mod apply;
pub mod header;
pub mod offt;
pub mod streams;

pub use apply::{Bspatch, PatchError};
pub use header::PatchHeader;

// ---------------------------------------------------------------------------
// Control triple
// ---------------------------------------------------------------------------

/// Single bsdiff control instruction.
///
/// Directs `add` bytes of additive merge (old + diff), then `copy` bytes
/// taken verbatim from the extra stream, then a cursor delta `seek` on the
/// old side (may be negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub add: u64,
    pub copy: u64,
    pub seek: i64,
}
