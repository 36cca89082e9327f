//! Reconstruction of the header prepended to compiled python modules
use alloc::vec::Vec;

use crate::Error;

/// Layout of the metadata following the magic tag of a `.pyc` file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PycLayout {
    /// 4 byte timestamp
    Timestamp,
    /// 4 byte timestamp, 4 byte source size
    Sized,
    /// PEP 552: 4 byte bitfield, 8 byte timestamp + size or hash
    Deterministic,
}

impl PycLayout {
    /// Number of zeroed bytes following the magic tag
    pub fn padding(&self) -> usize {
        match self {
            PycLayout::Timestamp => 4,
            PycLayout::Sized => 4 + 4,
            PycLayout::Deterministic => 4 + 8,
        }
    }
}

/// (major, minor, magic tag, layout)
const PYC_VERSIONS: &[(u32, u32, u16, PycLayout)] = &[
    (1, 5, 20121, PycLayout::Timestamp),
    (1, 6, 50428, PycLayout::Timestamp),
    (2, 0, 50823, PycLayout::Timestamp),
    (2, 1, 60202, PycLayout::Sized),
    (2, 2, 60717, PycLayout::Sized),
    (2, 3, 62021, PycLayout::Sized),
    (2, 4, 62061, PycLayout::Sized),
    (2, 5, 62131, PycLayout::Sized),
    (2, 6, 62161, PycLayout::Sized),
    (2, 7, 62211, PycLayout::Sized),
    (3, 0, 3131, PycLayout::Sized),
    (3, 1, 3151, PycLayout::Sized),
    (3, 2, 3180, PycLayout::Sized),
    (3, 3, 3230, PycLayout::Sized),
    (3, 4, 3310, PycLayout::Sized),
    (3, 5, 3351, PycLayout::Sized),
    (3, 6, 3379, PycLayout::Sized),
    (3, 7, 3394, PycLayout::Deterministic),
    (3, 8, 3413, PycLayout::Deterministic),
    (3, 9, 3425, PycLayout::Deterministic),
    (3, 10, 3439, PycLayout::Deterministic),
    (3, 11, 3495, PycLayout::Deterministic),
    (3, 12, 3531, PycLayout::Deterministic),
    (3, 13, 3571, PycLayout::Deterministic),
];

/// Split a cookie version code into (major, minor): the first decimal digit
/// is the major version, the remaining digits the minor version.
pub fn split_version(code: u32) -> Option<(u32, u32)> {
    if code < 10 {
        return None;
    }
    let mut scale = 1;
    while code / scale >= 10 {
        scale *= 10;
    }
    Some((code / scale, code % scale))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PycHeader {
    pub version: (u32, u32),
    pub magic: u16,
    pub layout: PycLayout,
}

impl PycHeader {
    /// Look up the header for a cookie version code such as `27`, `37` or `310`
    pub fn for_version(code: u32) -> Result<PycHeader, Error> {
        let version = split_version(code).ok_or(Error::UnsupportedRuntimeVersion(code))?;
        PYC_VERSIONS
            .iter()
            .find(|(major, minor, _, _)| (*major, *minor) == version)
            .map(|&(_, _, magic, layout)| PycHeader {
                version,
                magic,
                layout,
            })
            .ok_or(Error::UnsupportedRuntimeVersion(code))
    }

    /// The 4 byte magic number the interpreter itself uses, as found in the
    /// header of a PYZ archive
    pub fn magic_number(&self) -> [u8; 4] {
        let [lo, hi] = self.magic.to_le_bytes();
        [lo, hi, b'\r', b'\n']
    }

    /// Length of the header written by [`PycHeader::to_bytes`]
    pub fn size(&self) -> usize {
        2 + self.layout.padding()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.extend_from_slice(&self.magic.to_le_bytes());
        bytes.resize(self.size(), 0);
        bytes
    }

    /// Header followed by the code object `data`
    pub fn wrap(&self, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size() + data.len());
        bytes.extend_from_slice(&self.to_bytes());
        bytes.extend_from_slice(data);
        bytes
    }
}
