//! The packed structs represent the on-disk format of CArchive TOC entries
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Display};
use core::mem;

use bytemuck::{Pod, Zeroable};
use log::debug;

use crate::Error;

/// Fixed part of a TOC entry, including the size prefix
pub const ENTRY_HEAD_SIZE: usize = mem::size_of::<EntryHead>();

/// Fixed part of a TOC entry. All integers are big endian; the NUL padded
/// name follows immediately and fills the rest of `entry_size`.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C, packed)]
pub struct EntryHead {
    /// Size of the whole record, including this field and the name
    pub entry_size: u32,
    /// Offset of the entry data, relative to the overlay start
    pub offset: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub compress_flag: u8,
    pub kind: u8,
}

impl EntryHead {
    pub fn entry_size(&self) -> u32 {
        u32::from_be(self.entry_size)
    }

    pub fn offset(&self) -> u32 {
        u32::from_be(self.offset)
    }

    pub fn compressed_size(&self) -> u32 {
        u32::from_be(self.compressed_size)
    }

    pub fn uncompressed_size(&self) -> u32 {
        u32::from_be(self.uncompressed_size)
    }
}

/// Type tag of a TOC entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// `s`: python script, the entry points of the program
    Source,
    /// `M`: compiled package `__init__`
    Package,
    /// `m`: compiled module
    Module,
    /// `z`: PYZ archive of compiled modules
    Pyz,
    /// `Z`: zipfile, written with the same layout as a PYZ
    ZipFile,
    /// `b`: shared library or other binary
    Binary,
    /// `d`: dependency on another archive
    Dependency,
    /// `x`: data file
    Data,
    /// `o`: runtime option, the name holds the option
    RuntimeOption,
    /// `l`: splash screen resources
    Splash,
    Other(u8),
}

impl EntryKind {
    pub fn from_tag(tag: u8) -> EntryKind {
        match tag {
            b's' => EntryKind::Source,
            b'M' => EntryKind::Package,
            b'm' => EntryKind::Module,
            b'z' => EntryKind::Pyz,
            b'Z' => EntryKind::ZipFile,
            b'b' => EntryKind::Binary,
            b'd' => EntryKind::Dependency,
            b'x' => EntryKind::Data,
            b'o' => EntryKind::RuntimeOption,
            b'l' => EntryKind::Splash,
            other => EntryKind::Other(other),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            EntryKind::Source => b's',
            EntryKind::Package => b'M',
            EntryKind::Module => b'm',
            EntryKind::Pyz => b'z',
            EntryKind::ZipFile => b'Z',
            EntryKind::Binary => b'b',
            EntryKind::Dependency => b'd',
            EntryKind::Data => b'x',
            EntryKind::RuntimeOption => b'o',
            EntryKind::Splash => b'l',
            EntryKind::Other(tag) => *tag,
        }
    }

    /// Entries stored as bare code objects that need a pyc header
    pub fn is_compiled(&self) -> bool {
        matches!(
            self,
            EntryKind::Source | EntryKind::Package | EntryKind::Module
        )
    }

    /// Entries which may hold a nested PYZ archive
    pub fn is_pyz(&self) -> bool {
        matches!(self, EntryKind::Pyz | EntryKind::ZipFile)
    }
}

/// Decoded TOC entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Absolute offset of the entry data in the host file
    pub pos: u64,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub compressed: bool,
    pub kind: EntryKind,
    /// NUL trimmed name; empty when the archive stores no name
    pub name: String,
}

impl Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pos={:#x} size={} uncompressed={} compressed={} name={:?}",
            self.kind.tag() as char,
            self.pos,
            self.compressed_size,
            self.uncompressed_size,
            self.compressed,
            self.name,
        )
    }
}

impl Entry {
    /// Absolute end of the entry data, if it does not overflow
    pub fn end(&self) -> Option<u64> {
        self.pos.checked_add(u64::from(self.compressed_size))
    }
}

/// Decode every entry of a table of contents.
///
/// `data` holds exactly the declared table; decoding must consume all of it.
/// `overlay_pos` is added to each entry offset and `toc_pos` is only used to
/// report absolute offsets in errors.
pub fn parse_toc(data: &[u8], overlay_pos: u64, toc_pos: u64) -> Result<Vec<Entry>, Error> {
    let declared = data.len() as u64;
    let mut entries = Vec::new();
    let mut parsed = 0usize;

    while parsed < data.len() {
        let head_bytes = data
            .get(parsed..parsed + ENTRY_HEAD_SIZE)
            .ok_or(Error::TruncatedToc {
                consumed: (parsed + ENTRY_HEAD_SIZE) as u64,
                declared,
            })?;
        let head: EntryHead = *bytemuck::from_bytes(head_bytes);

        let entry_size = head.entry_size();
        let record_len = usize::try_from(entry_size)?;
        if record_len < ENTRY_HEAD_SIZE {
            return Err(Error::InvalidEntrySize {
                offset: toc_pos + parsed as u64,
                size: entry_size,
            });
        }

        let record_end = parsed.checked_add(record_len).ok_or(Error::Overflow)?;
        let name_bytes = data
            .get(parsed + ENTRY_HEAD_SIZE..record_end)
            .ok_or(Error::TruncatedToc {
                consumed: record_end as u64,
                declared,
            })?;
        let name = String::from_utf8_lossy(name_bytes)
            .trim_end_matches('\0')
            .into();

        let pos = overlay_pos
            .checked_add(u64::from(head.offset()))
            .ok_or(Error::Overflow)?;

        entries.push(Entry {
            pos,
            compressed_size: head.compressed_size(),
            uncompressed_size: head.uncompressed_size(),
            compressed: head.compress_flag == 1,
            kind: EntryKind::from_tag(head.kind),
            name,
        });

        parsed = record_end;
    }

    debug!("Decoded {} TOC entries from {} bytes", entries.len(), parsed);
    Ok(entries)
}
