// File-level glue for patch application.
//
// `apply_file()` wires plain files or extent-backed views to the
// reconstruction engine. Optionally computes a SHA-256 digest of the
// produced image (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use log::debug;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::extent::view::{ExtentView, Mode};
use crate::extent::{parse_extents, ExtentParseError};
use crate::patch::apply::{Bspatch, PatchError};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `apply_file()`.
#[derive(Debug, Clone)]
pub struct ApplyStats {
    /// Logical size of the old view in bytes.
    pub old_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Size of the produced new image in bytes.
    pub new_size: u64,
    /// SHA-256 of the new image (if the `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level patch application.
#[derive(Debug)]
pub enum ApplyError {
    /// Patch parsing or reconstruction failure.
    Patch(PatchError),
    /// An extent specification string did not parse.
    ExtentParse(ExtentParseError),
    /// The new image does not fit the logical span of the new view.
    ExtentBounds { span: u64, needed: u64 },
    /// I/O error (file open, read, write).
    Io(io::Error),
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patch(e) => write!(f, "patch error: {e}"),
            Self::ExtentParse(e) => write!(f, "extent parse error: {e}"),
            Self::ExtentBounds { span, needed } => {
                write!(f, "new image needs {needed} bytes but the extent span is {span}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Patch(e) => Some(e),
            Self::ExtentParse(e) => Some(e),
            Self::ExtentBounds { .. } => None,
            Self::Io(e) => Some(e),
        }
    }
}

impl From<PatchError> for ApplyError {
    fn from(e: PatchError) -> Self {
        Self::Patch(e)
    }
}

impl From<ExtentParseError> for ApplyError {
    fn from(e: ExtentParseError) -> Self {
        Self::ExtentParse(e)
    }
}

impl From<io::Error> for ApplyError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// apply_file
// ---------------------------------------------------------------------------

/// Applies a BSDIFF40 patch file, producing the new image at `new_path`.
///
/// When `old_extents`/`new_extents` are given, the corresponding image is
/// accessed through an extent view over its file rather than as a plain
/// contiguous file; see [`crate::extent::parse_extents`] for the string
/// format. An extent-backed new file is written in place, without
/// truncation, so bytes outside its extents are preserved.
///
/// The patch is read fully into memory; the three sub-streams decompress
/// from disjoint regions of that buffer. On failure the new output may be
/// left partially written; callers wanting atomicity stage to a temporary
/// path.
pub fn apply_file(
    old_path: &Path,
    new_path: &Path,
    patch_path: &Path,
    old_extents: Option<&str>,
    new_extents: Option<&str>,
) -> Result<ApplyStats, ApplyError> {
    let patch = std::fs::read(patch_path)?;
    let patcher = Bspatch::new(&patch)?;
    let patch_size = patch.len() as u64;
    debug!(
        "patch {}: {} bytes, declares a {}-byte new image",
        patch_path.display(),
        patch_size,
        patcher.hint_target_size()
    );

    // Parse both extent strings before touching any file.
    let old_seq = old_extents.map(parse_extents).transpose()?;
    let new_seq = new_extents.map(parse_extents).transpose()?;

    match old_seq {
        Some(extents) => {
            let mut old = ExtentView::open(old_path, Mode::Read, extents)?;
            let old_size = old.logical_len();
            debug!(
                "old view {}: {} extents spanning {} bytes",
                old_path.display(),
                old.extents().len(),
                old_size
            );
            let (new_size, new_sha256) = write_new(patcher, &mut old, old_size, new_path, new_seq)?;
            Ok(ApplyStats {
                old_size,
                patch_size,
                new_size,
                new_sha256,
            })
        }
        None => {
            let mut old = File::open(old_path)?;
            let old_size = old.metadata()?.len();
            let (new_size, new_sha256) = write_new(patcher, &mut old, old_size, new_path, new_seq)?;
            Ok(ApplyStats {
                old_size,
                patch_size,
                new_size,
                new_sha256,
            })
        }
    }
}

/// Opens the new view and runs the engine into it.
fn write_new<O: Read + Seek>(
    patcher: Bspatch<'_>,
    old: &mut O,
    old_size: u64,
    new_path: &Path,
    new_seq: Option<Vec<crate::extent::Extent>>,
) -> Result<(u64, Option<[u8; 32]>), ApplyError> {
    let needed = patcher.hint_target_size();
    match new_seq {
        Some(extents) => {
            let view = ExtentView::open(new_path, Mode::Write, extents)?;
            let span = view.logical_len();
            debug!(
                "new view {}: {} extents spanning {} bytes",
                new_path.display(),
                view.extents().len(),
                span
            );
            if span < needed {
                return Err(ApplyError::ExtentBounds { span, needed });
            }
            run(patcher, old, old_size, view)
        }
        None => run(patcher, old, old_size, File::create(new_path)?),
    }
}

fn run<O: Read + Seek, W: Write>(
    patcher: Bspatch<'_>,
    old: &mut O,
    old_size: u64,
    sink: W,
) -> Result<(u64, Option<[u8; 32]>), ApplyError> {
    #[cfg(feature = "file-io")]
    {
        let mut hasher = sha2::Sha256::new();
        let new_size = patcher.apply(
            old,
            old_size,
            HashingWriter {
                inner: sink,
                hasher: &mut hasher,
            },
        )?;
        Ok((new_size, Some(hasher.finalize().into())))
    }
    #[cfg(not(feature = "file-io"))]
    {
        let new_size = patcher.apply(old, old_size, sink)?;
        Ok((new_size, None))
    }
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
