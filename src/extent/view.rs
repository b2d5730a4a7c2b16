// Extent view: presents an ordered extent list over an underlying file as
// a single logical byte stream with read/write/seek.
//
// The logical position is represented by the current extent index and the
// position within that extent, alongside the absolute logical position.
// The index may range up to the extent count; exactly there, the intra
// position is zero and the view is at its logical end. An intra position
// equal to the current extent's length is equivalent to position zero on
// the next extent; the I/O walk normalizes this lazily.
//
// The underlying file position is tracked separately and updated lazily,
// right before actual I/O is about to be performed.
//
// Unlike an ordinary file, the size of the view is fixed: it is not
// truncated on open and writing past the extent span is refused.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::Extent;

// ---------------------------------------------------------------------------
// Open modes
// ---------------------------------------------------------------------------

/// How the underlying file of an extent view is opened.
///
/// Writing modes never create or truncate the file: the extents map into
/// existing data, and truncation would destroy the bytes around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
    ReadWrite,
}

impl Mode {
    fn open_options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        match self {
            Mode::Read => opts.read(true),
            Mode::Write => opts.write(true),
            Mode::ReadWrite => opts.read(true).write(true),
        };
        opts
    }
}

// ---------------------------------------------------------------------------
// Prefix lengths
// ---------------------------------------------------------------------------

/// Cumulative extent lengths, one entry per extent.
#[derive(Debug, Clone, Copy)]
struct PrefixLen {
    /// Total length of the preceding extents.
    prec: u64,
    /// Total length including the current extent.
    total: u64,
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// A read/write/seek handle over an ordered list of extents.
///
/// A single `read` or `write` call keeps walking extents until the request
/// is satisfied; it returns short only at end-of-view or after a partial
/// transfer from the underlying file (an error with prior progress returns
/// the partial count and invalidates the tracked file position).
pub struct ExtentView<F> {
    file: F,
    extents: Vec<Extent>,
    prefix: Vec<PrefixLen>,
    total_len: u64,

    /// Underlying file position, if known.
    physical_pos: Option<u64>,
    /// Current extent index; `extents.len()` means end-of-view.
    ex_idx: usize,
    /// Position within the current extent.
    ex_pos: u64,
    /// Absolute logical position, `prefix[ex_idx].prec + ex_pos`.
    logical_pos: u64,
    /// Cumulative prefix-table comparisons performed by seeks.
    probes: u64,
}

impl ExtentView<File> {
    /// Opens `path` in the given mode for use with `extents`.
    ///
    /// The file is never created; in the writing modes it is not truncated.
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode, extents: Vec<Extent>) -> io::Result<Self> {
        let file = mode.open_options().open(path)?;
        Self::from_file(file, extents)
    }
}

impl<F: Seek> ExtentView<F> {
    /// Wraps an already-open file. The view takes ownership of both the
    /// file and the extent list; both are released when it is dropped.
    pub fn from_file(mut file: F, extents: Vec<Extent>) -> io::Result<Self> {
        if extents.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "extent list is empty",
            ));
        }

        let mut prefix = Vec::with_capacity(extents.len());
        let mut acc = 0u64;
        for ex in &extents {
            let prec = acc;
            acc = acc.checked_add(ex.length).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "extent span overflows")
            })?;
            prefix.push(PrefixLen { prec, total: acc });
        }

        let physical_pos = file.stream_position().ok();
        Ok(ExtentView {
            file,
            extents,
            prefix,
            total_len: acc,
            physical_pos,
            ex_idx: 0,
            ex_pos: 0,
            logical_pos: 0,
            probes: 0,
        })
    }
}

impl<F> ExtentView<F> {
    /// Total logical length of the view.
    pub fn logical_len(&self) -> u64 {
        self.total_len
    }

    /// Current logical position.
    pub fn position(&self) -> u64 {
        self.logical_pos
    }

    /// Cumulative number of prefix-table comparisons performed by seeks.
    pub fn search_probes(&self) -> u64 {
        self.probes
    }

    /// Consumes the view, returning the underlying file.
    pub fn into_inner(self) -> F {
        self.file
    }

    /// Finds the extent containing logical position `pos` (`pos` must be
    /// strictly inside the view).
    ///
    /// Expands an interval outward from the current extent in exponentially
    /// increasing leaps until it bounds `pos`, then binary-searches within.
    /// O(log D) in the extent distance D from the current position, which
    /// favors sequential and locally random access alike.
    fn locate(&mut self, pos: u64) -> usize {
        debug_assert!(pos < self.total_len);
        let last = self.extents.len() - 1;

        let mut i = self.ex_idx.min(last);
        let mut j = i;
        let mut leap = 1usize;
        // Left and right (inclusive) boundaries, widened as needed.
        while i > 0 && pos < self.probe(i).prec {
            j = i - 1;
            i = i.saturating_sub(leap);
            leap <<= 1;
        }
        while j < last && pos >= self.probe(j).total {
            i = j + 1;
            j = (j + leap).min(last);
            leap <<= 1;
        }

        loop {
            let k = (i + j) / 2;
            let entry = self.probe(k);
            if pos < entry.prec {
                j = k - 1;
            } else if pos >= entry.total {
                i = k + 1;
            } else {
                return k;
            }
        }
    }

    fn probe(&mut self, k: usize) -> PrefixLen {
        self.probes += 1;
        self.prefix[k]
    }

    /// Skips past fully consumed extents; false at end-of-view.
    fn advance_extent(&mut self) -> bool {
        while self.ex_idx < self.extents.len() {
            if self.ex_pos < self.extents[self.ex_idx].length {
                return true;
            }
            self.ex_idx += 1;
            self.ex_pos = 0;
        }
        false
    }

    /// Accounts for `n` bytes transferred within the current extent.
    fn consumed(&mut self, n: u64, real: bool) {
        if real {
            if let Some(p) = self.physical_pos.as_mut() {
                *p += n;
            }
        }
        self.ex_pos += n;
        self.logical_pos += n;
    }
}

impl<F: Seek> ExtentView<F> {
    /// Repositions the underlying file for the current extent if the
    /// tracked position differs.
    fn position_physical(&mut self, extent_offset: u64) -> io::Result<()> {
        let want = extent_offset + self.ex_pos;
        if self.physical_pos != Some(want) {
            match self.file.seek(SeekFrom::Start(want)) {
                Ok(pos) => self.physical_pos = Some(pos),
                Err(e) => {
                    self.physical_pos = None;
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

impl<F: Read + Seek> Read for ExtentView<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            if !self.advance_extent() {
                break; // end-of-view
            }
            let ex = self.extents[self.ex_idx];
            let remaining = ex.length - self.ex_pos;
            let want = ((buf.len() - total) as u64).min(remaining) as usize;

            let n = if ex.is_sparse() {
                buf[total..total + want].fill(0);
                want
            } else {
                if let Err(e) = self.position_physical(ex.offset as u64) {
                    if total == 0 {
                        return Err(e);
                    }
                    break;
                }
                match self.file.read(&mut buf[total..total + want]) {
                    Ok(n) => n,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.physical_pos = None;
                        if total == 0 {
                            return Err(e);
                        }
                        break;
                    }
                }
            };

            self.consumed(n as u64, !ex.is_sparse());
            total += n;
            if n < want {
                break; // partial transfer; the caller continues
            }
        }
        Ok(total)
    }
}

impl<F: Write + Seek> Write for ExtentView<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            if !self.advance_extent() {
                break; // past the extent span; Ok(0) surfaces as WriteZero
            }
            let ex = self.extents[self.ex_idx];
            let remaining = ex.length - self.ex_pos;
            let want = ((buf.len() - total) as u64).min(remaining) as usize;

            let n = if ex.is_sparse() {
                want // discarded
            } else {
                if let Err(e) = self.position_physical(ex.offset as u64) {
                    if total == 0 {
                        return Err(e);
                    }
                    break;
                }
                match self.file.write(&buf[total..total + want]) {
                    Ok(n) => n,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.physical_pos = None;
                        if total == 0 {
                            return Err(e);
                        }
                        break;
                    }
                }
            };

            self.consumed(n as u64, !ex.is_sparse());
            total += n;
            if n < want {
                break;
            }
        }
        Ok(total)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<F> Seek for ExtentView<F> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::Current(d) => self.logical_pos as i128 + d as i128,
            SeekFrom::End(d) => self.total_len as i128 + d as i128,
        };
        // Repositioning right past the last extent is valid, in line with
        // normal seek behavior, though no I/O can be performed there.
        if target < 0 || target > self.total_len as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside the extent span",
            ));
        }
        let target = target as u64;

        if target != self.logical_pos {
            if target == self.total_len {
                self.ex_idx = self.extents.len();
                self.ex_pos = 0;
            } else if target == 0 {
                self.ex_idx = 0;
                self.ex_pos = 0;
            } else {
                let k = self.locate(target);
                self.ex_pos = target - self.prefix[k].prec;
                self.ex_idx = k;
            }
            self.logical_pos = target;
        }
        Ok(target)
    }
}

// Keep the module-level helper reachable from the view for callers that
// hold only a sequence.
impl<F> ExtentView<F> {
    /// The extent sequence backing this view.
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }
}
