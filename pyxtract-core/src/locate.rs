//! Backward search for the CArchive cookie
use alloc::vec;

use crate::{ArchiveSrc, Error, MAGIC};

/// Size of each window read while scanning for the cookie
pub const SEARCH_CHUNK_SIZE: usize = 0x2000;

/// Find the offset of the last cookie magic in `src`.
///
/// The source is scanned from the end in windows of [`SEARCH_CHUNK_SIZE`]
/// bytes. Consecutive windows overlap by `MAGIC.len() - 1` bytes so that a
/// magic split across a window edge is still found.
pub fn find_cookie<S: ArchiveSrc + ?Sized>(src: &mut S) -> Result<u64, S::Err> {
    let size = src.len();
    if size < MAGIC.len() as u64 {
        return Err(Error::FileTooShort(size).into());
    }

    let mut buf = vec![0; SEARCH_CHUNK_SIZE];
    let mut end = size;
    loop {
        let start = end.saturating_sub(SEARCH_CHUNK_SIZE as u64);
        // Bounded by SEARCH_CHUNK_SIZE
        let chunk_len = (end - start) as usize;
        if chunk_len < MAGIC.len() {
            break;
        }

        let chunk = &mut buf[..chunk_len];
        src.read_exact_at(start, chunk)?;
        if let Some(pos) = chunk.windows(MAGIC.len()).rposition(|w| w == MAGIC) {
            return Ok(start + pos as u64);
        }

        if start == 0 {
            break;
        }
        end = start + MAGIC.len() as u64 - 1;
    }

    Err(Error::CookieNotFound.into())
}
