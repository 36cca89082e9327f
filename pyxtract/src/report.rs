//! Recoverable conditions met while extracting.
//!
//! Structural problems abort a run through [`Error`](crate::Error). Anything
//! confined to a single entry is raised as a [`Warning`] instead, logged, and
//! collected in the [`Report`] of the run.
use std::io;
use std::path::PathBuf;

use log::warn;

#[derive(Debug, thiserror::Error)]
pub enum Warning {
    #[error("Found an unnamed file in CArchive at {pos:#x}. Using random name {name}")]
    UnnamedEntry { pos: u64, name: String },

    #[error("Entry {name} at {pos:#x} ({size} bytes) lies outside the file")]
    EntryOutOfBounds { name: String, pos: u64, size: u32 },

    #[error("Failed to decompress {name} at {pos:#x}: {source}")]
    Decompress {
        name: String,
        pos: u64,
        source: io::Error,
    },

    #[error("Decompressed size of {name} at {pos:#x} is {actual} bytes, but {declared} were declared; the archive may have been tampered with")]
    PayloadIntegrityMismatch {
        name: String,
        pos: u64,
        declared: u32,
        actual: usize,
    },

    #[error("Path {} for entry {name} leaves the extraction directory, skipping", .path.display())]
    UnsafePath { name: String, path: PathBuf },

    #[error("Cannot rebuild pyc header for {name}: unsupported python version {version}")]
    UnsupportedRuntimeVersion { name: String, version: u32 },

    #[error("{name} is not a PYZ archive (magic {magic:02x?})")]
    NotNestedArchive { name: String, magic: Vec<u8> },

    #[error("Extracting {name} requires python magic {found:02x?}, but the archive targets {expected:02x?}")]
    NestedVersionMismatch {
        name: String,
        found: [u8; 4],
        expected: [u8; 4],
    },

    #[error("Unmarshalling FAILED. Cannot extract {name}. Extracting remaining files. {source}")]
    NestedTocCorrupt {
        name: String,
        source: pyxtract_core::Error,
    },

    #[error("Module {module} at {offset:#x} ({length} bytes) lies outside {name}")]
    NestedEntryOutOfBounds {
        name: String,
        module: String,
        offset: u64,
        length: u64,
    },

    #[error("Failed to decompress {}, probably encrypted. {source}", .path.display())]
    NestedPayloadUndecodable {
        module: String,
        path: PathBuf,
        source: io::Error,
    },
}

/// Outcome of an extraction run
#[derive(Debug, Default)]
pub struct Report {
    pub warnings: Vec<Warning>,
    /// Files written, nested modules included
    pub written: usize,
}

impl Report {
    pub fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
