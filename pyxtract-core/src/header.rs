//! The packed structs represent the on-disk format of the CArchive cookie

use alloc::string::String;
use alloc::vec::Vec;
use bytemuck::{Pod, Zeroable};

use crate::entry::parse_toc;
use crate::{Entry, Error, COOKIE_EXT_SIZE, COOKIE_SIZE, MAGIC};

/// Marker searched for in the bytes following a 2.0 cookie. Only 2.1+
/// cookies carry a library name such as `python39.dll` there.
const LIBNAME_MARKER: &[u8] = b"python";

/// Cookie written by PyInstaller 2.0. All integers are big endian.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C, packed)]
pub struct Cookie {
    pub magic: [u8; 8],
    /// Length of the whole package, including the cookie
    pub package_len: u32,
    /// Offset of the table of contents, relative to the overlay start
    pub toc_offset: u32,
    pub toc_len: u32,
    /// Python version as `major * 10 + minor` (`major * 100 + minor` from 3.10)
    pub py_ver: u32,
}

/// Cookie written by PyInstaller 2.1+
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C, packed)]
pub struct CookieExt {
    pub cookie: Cookie,
    /// NUL padded name of the python shared library
    pub py_libname: [u8; 64],
}

impl Cookie {
    pub fn package_len(&self) -> u32 {
        u32::from_be(self.package_len)
    }

    pub fn toc_offset(&self) -> u32 {
        u32::from_be(self.toc_offset)
    }

    pub fn toc_len(&self) -> u32 {
        u32::from_be(self.toc_len)
    }

    pub fn py_ver(&self) -> u32 {
        u32::from_be(self.py_ver)
    }
}

impl CookieExt {
    /// Retrieve the library name, ending at the first NUL
    pub fn py_libname_bytes(&self) -> &[u8] {
        let end = self
            .py_libname
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.py_libname.len());
        &self.py_libname[..end]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieLayout {
    /// PyInstaller 2.0, 24 bytes
    Legacy,
    /// PyInstaller 2.1+, 88 bytes
    Extended,
}

impl CookieLayout {
    /// Pick the layout from the bytes immediately following a 2.0 sized
    /// cookie (up to 64 of them; fewer near the end of the file).
    pub fn detect(tail: &[u8]) -> CookieLayout {
        let tail = &tail[..tail.len().min(COOKIE_EXT_SIZE - COOKIE_SIZE)];
        if tail
            .windows(LIBNAME_MARKER.len())
            .any(|w| w == LIBNAME_MARKER)
        {
            CookieLayout::Extended
        } else {
            CookieLayout::Legacy
        }
    }

    pub fn size(&self) -> usize {
        match self {
            CookieLayout::Legacy => COOKIE_SIZE,
            CookieLayout::Extended => COOKIE_EXT_SIZE,
        }
    }
}

/// Geometry of the CArchive overlay, derived from the cookie
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay {
    pub layout: CookieLayout,
    pub cookie_pos: u64,
    pub package_len: u64,
    /// Size of the appended data, including anything following the cookie
    pub size: u64,
    /// Absolute offset of the overlay start; entry offsets are relative to it
    pub pos: u64,
    pub toc_pos: u64,
    pub toc_len: u64,
    pub py_ver: u32,
    pub py_libname: Option<String>,
}

impl Overlay {
    /// Decode the cookie found at `cookie_pos` in a file of `file_len` bytes.
    ///
    /// `data` must start at the cookie and hold at least `layout.size()` bytes.
    pub fn new(
        data: &[u8],
        layout: CookieLayout,
        cookie_pos: u64,
        file_len: u64,
    ) -> Result<Overlay, Error> {
        let data = data
            .get(..layout.size())
            .ok_or(Error::MalformedHeader("cookie is truncated"))?;

        let (cookie, py_libname) = match layout {
            CookieLayout::Legacy => (*bytemuck::from_bytes::<Cookie>(data), None),
            CookieLayout::Extended => {
                let ext = bytemuck::from_bytes::<CookieExt>(data);
                let name = String::from_utf8_lossy(ext.py_libname_bytes()).into_owned();
                (ext.cookie, Some(name))
            }
        };

        if cookie.magic != MAGIC {
            return Err(Error::MalformedHeader("bad cookie magic"));
        }

        let tail_bytes = cookie_pos
            .checked_add(layout.size() as u64)
            .and_then(|end| file_len.checked_sub(end))
            .ok_or(Error::MalformedHeader("cookie extends past end of file"))?;
        let package_len = u64::from(cookie.package_len());
        let size = package_len.checked_add(tail_bytes).ok_or(Error::Overflow)?;
        let pos = file_len
            .checked_sub(size)
            .ok_or(Error::MalformedHeader("overlay starts before the beginning of the file"))?;

        let toc_pos = pos
            .checked_add(u64::from(cookie.toc_offset()))
            .ok_or(Error::Overflow)?;
        let toc_len = u64::from(cookie.toc_len());
        match toc_pos.checked_add(toc_len) {
            Some(toc_end) if toc_end <= file_len => {}
            _ => {
                return Err(Error::MalformedHeader(
                    "table of contents extends past end of file",
                ))
            }
        }

        Ok(Overlay {
            layout,
            cookie_pos,
            package_len,
            size,
            pos,
            toc_pos,
            toc_len,
            py_ver: cookie.py_ver(),
            py_libname,
        })
    }

    /// Decode the table of contents from `data`, which starts at `toc_pos`
    pub fn entries(&self, data: &[u8]) -> Result<Vec<Entry>, Error> {
        let toc_len = usize::try_from(self.toc_len)?;
        let toc = data.get(..toc_len).ok_or(Error::TruncatedToc {
            consumed: data.len() as u64,
            declared: self.toc_len,
        })?;
        parse_toc(toc, self.pos, self.toc_pos)
    }
}
