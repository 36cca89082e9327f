use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use pyxtract_core::ArchiveSrc;

use crate::{wrap_io_err, Error};

/// A file on disk opened for random access reads
#[derive(Debug)]
pub struct HostFile {
    path: PathBuf,
    src: BufReader<File>,
    len: u64,
}

impl HostFile {
    pub fn open(path: impl AsRef<Path>) -> Result<HostFile, Error> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(wrap_io_err!(path, "Open"))?;
        let len = file
            .metadata()
            .map_err(wrap_io_err!(path, "Reading metadata"))?
            .len();

        Ok(HostFile {
            path,
            src: BufReader::new(file),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveSrc for HostFile {
    type Err = Error;

    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err> {
        self.src
            .seek(SeekFrom::Start(offset))
            .map_err(wrap_io_err!(self.path, "Seek at read_at"))?;
        self.src
            .read_exact(buf)
            .map_err(wrap_io_err!(self.path, "Read at read_at"))?;
        Ok(buf.len())
    }
}
