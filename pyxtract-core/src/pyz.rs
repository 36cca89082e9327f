//! The PYZ archive: compressed modules with a marshalled table of contents
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::mem;

use bytemuck::{Pod, Zeroable};

use crate::marshal::{self, Object};
use crate::Error;

pub const PYZ_MAGIC: [u8; 4] = *b"PYZ\0";
pub const PYZ_HEADER_SIZE: usize = mem::size_of::<PyzHeader>();

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C, packed)]
pub struct PyzHeader {
    pub magic: [u8; 4],
    /// Magic number of the interpreter that built the archive
    pub pyc_magic: [u8; 4],
    /// Big endian offset of the marshalled table of contents
    pub toc_offset: u32,
}

impl PyzHeader {
    pub fn new(data: &[u8]) -> Result<PyzHeader, Error> {
        let bytes = data
            .get(..PYZ_HEADER_SIZE)
            .ok_or(Error::InvalidPyzToc("header is truncated"))?;
        let header: PyzHeader = *bytemuck::from_bytes(bytes);
        if header.magic != PYZ_MAGIC {
            return Err(Error::InvalidPyzMagic(header.magic));
        }
        Ok(header)
    }

    pub fn toc_offset(&self) -> u32 {
        u32::from_be(self.toc_offset)
    }
}

/// Module name as stored in the table. Newer archives use text, older ones
/// byte strings that are usually, but not always, valid UTF-8.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PyzName {
    Text(String),
    Raw(Vec<u8>),
}

impl PyzName {
    fn from_object(obj: &Object) -> Result<PyzName, Error> {
        match obj {
            Object::Str(s) => Ok(PyzName::Text(s.clone())),
            Object::Bytes(b) => Ok(match String::from_utf8(b.clone()) {
                Ok(s) => PyzName::Text(s),
                Err(err) => PyzName::Raw(err.into_bytes()),
            }),
            _ => Err(Error::InvalidPyzToc("entry name is not a string")),
        }
    }

    /// Dotted module name; undecodable names are converted lossily
    pub fn to_string_lossy(&self) -> String {
        match self {
            PyzName::Text(s) => s.clone(),
            PyzName::Raw(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PyzEntry {
    pub name: PyzName,
    pub is_pkg: bool,
    /// Offset of the compressed module, relative to the start of the PYZ
    pub offset: u64,
    pub length: u64,
}

impl PyzEntry {
    /// Decode `(ispkg, pos, length)`
    fn from_fields(name: PyzName, fields: &[Object]) -> Result<PyzEntry, Error> {
        let [is_pkg, offset, length] = fields else {
            return Err(Error::InvalidPyzToc("entry does not have three fields"));
        };
        let int = |obj: &Object| -> Result<u64, Error> {
            let value = obj
                .as_int()
                .ok_or(Error::InvalidPyzToc("entry field is not an integer"))?;
            u64::try_from(value).map_err(|_| Error::InvalidPyzToc("entry field is negative"))
        };
        Ok(PyzEntry {
            name,
            is_pkg: int(is_pkg)? != 0,
            offset: int(offset)?,
            length: int(length)?,
        })
    }

    /// Absolute end of the compressed module, if it does not overflow
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

/// Normalized table of contents, in first-seen order with the last
/// definition of each name winning
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PyzToc {
    entries: Vec<PyzEntry>,
}

impl PyzToc {
    /// Decode the table of contents of the PYZ archive held in `data`
    pub fn parse(data: &[u8]) -> Result<(PyzHeader, PyzToc), Error> {
        let header = PyzHeader::new(data)?;
        let toc_offset = usize::try_from(header.toc_offset())?;
        let toc_data = data
            .get(toc_offset..)
            .ok_or(Error::InvalidPyzToc("table offset is past end of archive"))?;
        let toc = PyzToc::from_object(&marshal::loads(toc_data)?)?;
        Ok((header, toc))
    }

    /// Normalize the deserialized table. Accepts a dict of
    /// `name: (ispkg, pos, length)`, a list of `(name, (ispkg, pos, length))`
    /// pairs, or a list of flat `(name, ispkg, pos, length)` tuples.
    pub fn from_object(obj: &Object) -> Result<PyzToc, Error> {
        let mut toc = PyzToc::default();
        match obj {
            Object::Dict(pairs) => {
                for (key, value) in pairs {
                    let fields = value
                        .as_seq()
                        .ok_or(Error::InvalidPyzToc("entry value is not a tuple"))?;
                    toc.entries
                        .push(PyzEntry::from_fields(PyzName::from_object(key)?, fields)?);
                }
            }
            Object::List(items) | Object::Tuple(items) => {
                for item in items {
                    let entry = match item.as_seq() {
                        Some([key, value]) => {
                            let fields = value
                                .as_seq()
                                .ok_or(Error::InvalidPyzToc("entry value is not a tuple"))?;
                            PyzEntry::from_fields(PyzName::from_object(key)?, fields)?
                        }
                        Some([key, fields @ ..]) => {
                            PyzEntry::from_fields(PyzName::from_object(key)?, fields)?
                        }
                        _ => return Err(Error::InvalidPyzToc("entry is not a tuple")),
                    };
                    toc.entries.push(entry);
                }
            }
            _ => return Err(Error::InvalidPyzToc("table is neither a dict nor a list")),
        }
        toc.dedup();
        Ok(toc)
    }

    fn dedup(&mut self) {
        let mut first_seen: BTreeMap<PyzName, usize> = BTreeMap::new();
        let mut entries: Vec<PyzEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match first_seen.get(&entry.name) {
                Some(&index) => entries[index] = entry,
                None => {
                    first_seen.insert(entry.name.clone(), entries.len());
                    entries.push(entry);
                }
            }
        }
        self.entries = entries;
    }

    pub fn entries(&self) -> &[PyzEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
