#![no_std]
extern crate alloc;

use core::mem;

pub use crate::entry::{parse_toc, Entry, EntryHead, EntryKind, ENTRY_HEAD_SIZE};
pub use crate::error::Error;
pub use crate::header::{Cookie, CookieExt, CookieLayout, Overlay};
pub use crate::locate::{find_cookie, SEARCH_CHUNK_SIZE};
pub use crate::marshal::Object;
pub use crate::package::ArchiveSrc;
pub use crate::pyc::{split_version, PycHeader, PycLayout};
pub use crate::pyz::{PyzEntry, PyzHeader, PyzName, PyzToc, PYZ_HEADER_SIZE, PYZ_MAGIC};

mod entry;
mod error;
mod header;
mod locate;
pub mod marshal;
mod package;
mod pyc;
mod pyz;

#[cfg(test)]
mod test;

/// Magic number which identifies a PyInstaller CArchive cookie
pub const MAGIC: [u8; 8] = *b"MEI\x0c\x0b\x0a\x0b\x0e";

/// Cookie written by PyInstaller 2.0
pub const COOKIE_SIZE: usize = mem::size_of::<Cookie>();
/// Cookie written by PyInstaller 2.1+, with the python library name appended
pub const COOKIE_EXT_SIZE: usize = mem::size_of::<CookieExt>();
