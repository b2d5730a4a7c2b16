//! Oxipatch: BSDIFF40 binary patch application with extent-addressed views.
//!
//! The crate provides:
//! - The BSDIFF40 patch interpreter (`patch`)
//! - Extent-string parsing and extent-backed file views (`extent`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! The "old" and "new" images need not be contiguous files: each may be an
//! ordered sequence of byte ranges within an underlying file, including
//! sparse ranges that read as zeros and discard writes.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! // Reassemble a new rootfs image scattered across block ranges.
//! let stats = oxipatch::io::apply_file(
//!     Path::new("disk.img"),
//!     Path::new("disk.img"),
//!     Path::new("update.bsdiff"),
//!     Some("4096:1048576,-1:8192"),
//!     Some("2097152:1056768"),
//! )?;
//! assert_eq!(stats.new_size, 1056768);
//! # Ok::<(), oxipatch::io::ApplyError>(())
//! ```

pub mod extent;
pub mod io;
pub mod patch;

#[cfg(feature = "cli")]
pub mod cli;
