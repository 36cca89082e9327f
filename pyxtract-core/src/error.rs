use alloc::format;
use alloc::string::ToString;
use core::error;
use core::fmt::{Display, Formatter, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Source is shorter than the cookie magic
    FileTooShort(u64),
    CookieNotFound,
    MalformedHeader(&'static str),
    /// Entry records did not add up to the declared table size
    TruncatedToc { consumed: u64, declared: u64 },
    /// Entry record at `offset` declares fewer bytes than its fixed fields
    InvalidEntrySize { offset: u64, size: u32 },
    UnsupportedRuntimeVersion(u32),
    InvalidPyzMagic([u8; 4]),
    /// Object stream could not be read at `offset`
    Marshal { offset: usize, reason: &'static str },
    /// Nested table deserialized to an unexpected shape
    InvalidPyzToc(&'static str),
    ShortRead { offset: u64, expected: usize, actual: usize },
    Overflow,
    TryFromInt(core::num::TryFromIntError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result {
        use Error::*;

        let msg = match self {
            FileTooShort(len) => format!("File is too short or truncated ({} bytes)", len),
            CookieNotFound => {
                "Missing cookie, unsupported pyinstaller version or not a pyinstaller archive"
                    .to_string()
            }
            MalformedHeader(reason) => format!("Malformed archive header: {}", reason),
            TruncatedToc { consumed, declared } => format!(
                "Truncated table of contents: consumed {} of {} declared bytes",
                consumed, declared
            ),
            InvalidEntrySize { offset, size } => {
                format!("Invalid entry size {} at offset {:#x}", size, offset)
            }
            UnsupportedRuntimeVersion(ver) => format!("Unsupported python version: {}", ver),
            InvalidPyzMagic(magic) => format!("Invalid PYZ magic: {:02x?}", magic),
            Marshal { offset, reason } => {
                format!("Unmarshalling failed at offset {:#x}: {}", offset, reason)
            }
            InvalidPyzToc(reason) => format!("Invalid PYZ table of contents: {}", reason),
            ShortRead { offset, expected, actual } => format!(
                "Short read at offset {:#x}: expected {} bytes, got {}",
                offset, expected, actual
            ),
            Overflow => "Overflow".to_string(),
            TryFromInt(err) => format!("TryFromInt: {}", err),
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::TryFromInt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<core::num::TryFromIntError> for Error {
    fn from(err: core::num::TryFromIntError) -> Error {
        Error::TryFromInt(err)
    }
}
