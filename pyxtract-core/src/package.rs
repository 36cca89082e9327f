use core::convert::TryFrom;

use crate::Error;

/// Random-access byte source holding an archive
pub trait ArchiveSrc {
    type Err: From<Error>;

    /// Total length of the source in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read up to `buf.len()` bytes at `offset`, returning the count read
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err>;

    /// Like `read_at`, but fails unless the whole buffer was filled
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Self::Err> {
        let count = self.read_at(offset, buf)?;
        if count != buf.len() {
            return Err(Error::ShortRead {
                offset,
                expected: buf.len(),
                actual: count,
            }
            .into());
        }
        Ok(())
    }
}

impl ArchiveSrc for &[u8] {
    type Err = Error;

    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let start = usize::try_from(offset).map_err(Error::TryFromInt)?;
        let data: &[u8] = self;
        if start >= data.len() {
            return Ok(0);
        }
        let end = start
            .checked_add(buf.len())
            .ok_or(Error::Overflow)?
            .min(data.len());
        let count = end - start;
        buf[..count].copy_from_slice(&data[start..end]);
        Ok(count)
    }
}
