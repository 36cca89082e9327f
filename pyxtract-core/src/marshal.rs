//! Reader for the subset of the python `marshal` format used by PYZ tables
//!
//! Only plain data is supported; code objects and other interpreter
//! specific types are rejected.
use alloc::string::String;
use alloc::vec::Vec;

use crate::Error;

/// Containers nested deeper than this are rejected
pub const MAX_DEPTH: usize = 64;

/// Decoded objects may cost at most this many units per input byte. An
/// object costs one unit plus the length of its string data, and every
/// back-reference costs as much as the object it copies.
pub const MAX_EXPANSION: usize = 8;

const FLAG_REF: u8 = 0x80;

const TYPE_NULL: u8 = b'0';
const TYPE_NONE: u8 = b'N';
const TYPE_FALSE: u8 = b'F';
const TYPE_TRUE: u8 = b'T';
const TYPE_STOPITER: u8 = b'S';
const TYPE_ELLIPSIS: u8 = b'.';
const TYPE_INT: u8 = b'i';
const TYPE_INT64: u8 = b'I';
const TYPE_LONG: u8 = b'l';
const TYPE_BINARY_FLOAT: u8 = b'g';
const TYPE_STRING: u8 = b's';
const TYPE_INTERNED: u8 = b't';
const TYPE_STRINGREF: u8 = b'R';
const TYPE_REF: u8 = b'r';
const TYPE_UNICODE: u8 = b'u';
const TYPE_ASCII: u8 = b'a';
const TYPE_ASCII_INTERNED: u8 = b'A';
const TYPE_SHORT_ASCII: u8 = b'z';
const TYPE_SHORT_ASCII_INTERNED: u8 = b'Z';
const TYPE_TUPLE: u8 = b'(';
const TYPE_SMALL_TUPLE: u8 = b')';
const TYPE_LIST: u8 = b'[';
const TYPE_DICT: u8 = b'{';
const TYPE_SET: u8 = b'<';
const TYPE_FROZENSET: u8 = b'>';

#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Tuple(Vec<Object>),
    List(Vec<Object>),
    /// Key/value pairs in stream order
    Dict(Vec<(Object, Object)>),
    Set(Vec<Object>),
    StopIteration,
    Ellipsis,
}

impl Object {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Int(i) => Some(*i),
            Object::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Items of a tuple or list
    pub fn as_seq(&self) -> Option<&[Object]> {
        match self {
            Object::Tuple(items) | Object::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Deserialize one object from the start of `data`. Trailing bytes are
/// ignored, as `marshal.load` does on a file.
pub fn loads(data: &[u8]) -> Result<Object, Error> {
    let mut reader = Reader {
        data,
        pos: 0,
        refs: Vec::new(),
        interned: Vec::new(),
        depth: 0,
        spent: 0,
        limit: data.len().saturating_mul(MAX_EXPANSION),
    };
    match reader.read_object()? {
        Some(obj) => Ok(obj),
        None => Err(reader.error("unexpected NULL object")),
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Objects flagged with FLAG_REF and their cost, `None` while still
    /// being built
    refs: Vec<Option<(Object, usize)>>,
    /// Interned strings of the version 1 format, for TYPE_STRINGREF
    interned: Vec<(Object, usize)>,
    depth: usize,
    spent: usize,
    limit: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, reason: &'static str) -> Error {
        Error::Marshal {
            offset: self.pos,
            reason,
        }
    }

    fn charge(&mut self, cost: usize) -> Result<(), Error> {
        self.spent = self.spent.checked_add(cost).ok_or(Error::Overflow)?;
        if self.spent > self.limit {
            return Err(self.error("object graph too large"));
        }
        Ok(())
    }

    /// Like `take`, charging the bytes against the expansion limit
    fn take_payload(&mut self, len: usize) -> Result<&'a [u8], Error> {
        self.charge(len)?;
        self.take(len)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(len).ok_or(Error::Overflow)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(self.error("unexpected end of data"))?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Length prefix of a string or container. Every element needs at least
    /// one byte, so a length larger than the remaining input is corrupt.
    fn read_len(&mut self) -> Result<usize, Error> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| self.error("negative length"))?;
        if len > self.data.len() - self.pos {
            return Err(self.error("length exceeds remaining data"));
        }
        Ok(len)
    }

    fn read_long(&mut self) -> Result<i64, Error> {
        let n = self.read_i32()?;
        let digits = n.unsigned_abs() as usize;
        let mut value: i64 = 0;
        for i in 0..digits {
            let digit = u16::from_le_bytes(self.read_array()?);
            if digit >= 1 << 15 {
                return Err(self.error("invalid long digit"));
            }
            if digit == 0 {
                continue;
            }
            let shift = 15 * i;
            if shift >= 63 {
                return Err(Error::Overflow);
            }
            let part = i64::from(digit)
                .checked_mul(1 << shift)
                .ok_or(Error::Overflow)?;
            value = value.checked_add(part).ok_or(Error::Overflow)?;
        }
        Ok(if n < 0 { -value } else { value })
    }

    fn read_objects(&mut self, len: usize) -> Result<Vec<Object>, Error> {
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let item = self
                .read_object()?
                .ok_or(self.error("NULL object in sequence"))?;
            items.push(item);
        }
        Ok(items)
    }

    fn read_dict(&mut self) -> Result<Vec<(Object, Object)>, Error> {
        let mut pairs = Vec::new();
        while let Some(key) = self.read_object()? {
            let value = self
                .read_object()?
                .ok_or(self.error("NULL dict value"))?;
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    /// Returns `None` for TYPE_NULL, which terminates dicts
    fn read_object(&mut self) -> Result<Option<Object>, Error> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = self.read_object_inner();
        self.depth -= 1;
        result
    }

    fn read_object_inner(&mut self) -> Result<Option<Object>, Error> {
        let code = self.read_u8()?;
        let kind = code & !FLAG_REF;

        let slot = if code & FLAG_REF != 0 {
            self.refs.push(None);
            Some(self.refs.len() - 1)
        } else {
            None
        };
        let start = self.spent;
        if kind != TYPE_NULL {
            self.charge(1)?;
        }

        let obj = match kind {
            TYPE_NULL => return Ok(None),
            TYPE_NONE => Object::None,
            TYPE_FALSE => Object::Bool(false),
            TYPE_TRUE => Object::Bool(true),
            TYPE_STOPITER => Object::StopIteration,
            TYPE_ELLIPSIS => Object::Ellipsis,
            TYPE_INT => Object::Int(i64::from(self.read_i32()?)),
            TYPE_INT64 => Object::Int(i64::from_le_bytes(self.read_array()?)),
            TYPE_LONG => Object::Int(self.read_long()?),
            TYPE_BINARY_FLOAT => Object::Float(f64::from_le_bytes(self.read_array()?)),
            TYPE_STRING => {
                let len = self.read_len()?;
                Object::Bytes(self.take_payload(len)?.to_vec())
            }
            TYPE_INTERNED => {
                // Text from version 3 on, bytes before; keep text when it decodes
                let len = self.read_len()?;
                let bytes = self.take_payload(len)?;
                let obj = match core::str::from_utf8(bytes) {
                    Ok(s) => Object::Str(s.into()),
                    Err(_) => Object::Bytes(bytes.to_vec()),
                };
                self.interned.push((obj.clone(), len));
                obj
            }
            TYPE_STRINGREF => {
                let index = usize::try_from(self.read_i32()?)
                    .map_err(|_| self.error("negative string reference"))?;
                let len = self
                    .interned
                    .get(index)
                    .map(|(_, len)| *len)
                    .ok_or(self.error("invalid string reference"))?;
                self.charge(len)?;
                self.interned[index].0.clone()
            }
            TYPE_UNICODE | TYPE_ASCII | TYPE_ASCII_INTERNED => {
                let len = self.read_len()?;
                Object::Str(String::from_utf8_lossy(self.take_payload(len)?).into_owned())
            }
            TYPE_SHORT_ASCII | TYPE_SHORT_ASCII_INTERNED => {
                let len = usize::from(self.read_u8()?);
                Object::Str(String::from_utf8_lossy(self.take_payload(len)?).into_owned())
            }
            TYPE_TUPLE => {
                let len = self.read_len()?;
                Object::Tuple(self.read_objects(len)?)
            }
            TYPE_SMALL_TUPLE => {
                let len = usize::from(self.read_u8()?);
                Object::Tuple(self.read_objects(len)?)
            }
            TYPE_LIST => {
                let len = self.read_len()?;
                Object::List(self.read_objects(len)?)
            }
            TYPE_SET | TYPE_FROZENSET => {
                let len = self.read_len()?;
                Object::Set(self.read_objects(len)?)
            }
            TYPE_DICT => Object::Dict(self.read_dict()?),
            TYPE_REF => {
                let index = usize::try_from(self.read_i32()?)
                    .map_err(|_| self.error("negative reference"))?;
                let cost = match self.refs.get(index) {
                    Some(Some((_, cost))) => *cost,
                    Some(None) => return Err(self.error("reference to incomplete object")),
                    None => return Err(self.error("invalid reference")),
                };
                // Charged before copying
                self.charge(cost)?;
                match &self.refs[index] {
                    Some((obj, _)) => obj.clone(),
                    None => return Err(self.error("reference to incomplete object")),
                }
            }
            _ => return Err(self.error("unsupported object type")),
        };

        if let Some(slot) = slot {
            let cost = self.spent - start;
            self.charge(cost)?;
            self.refs[slot] = Some((obj.clone(), cost));
        }
        Ok(Some(obj))
    }
}
