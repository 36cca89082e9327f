use std::fs;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::ZlibDecoder;
use log::info;
use pyxtract_core::{ArchiveSrc, Entry, EntryKind, PycHeader};

use crate::ext::EntryExt;
use crate::{pyz, target_in, wrap_io_err, CArchive, Error, Report, Warning};

/// Options for [`CArchive::extract`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtractOptions {
    /// Also unpack the modules of nested PYZ archives
    pub extract_pyz: bool,
}

/// Decompress a zlib stream
pub(crate) fn inflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Write `data` to `path`, creating missing parent directories
pub(crate) fn write_file(path: &Path, data: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(wrap_io_err!(parent, "Creating directory"))?;
    }
    fs::write(path, data).map_err(wrap_io_err!(path, "Writing file"))
}

impl<S> CArchive<S>
where
    S: ArchiveSrc,
    Error: From<S::Err>,
{
    /// Write every entry below `root`, which is created if needed.
    ///
    /// Problems confined to one entry are recorded in the returned [`Report`]
    /// and extraction moves on. Reading the host or writing output failing
    /// aborts the run.
    pub fn extract(
        self,
        root: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<Report, Error> {
        let root = root.as_ref();
        let CArchive {
            mut src,
            overlay,
            entries,
            mut report,
        } = self;

        fs::create_dir_all(root).map_err(wrap_io_err!(root, "Creating output directory"))?;
        info!("Beginning extraction to {}", root.display());

        let pyc = PycHeader::for_version(overlay.py_ver);
        for entry in &entries {
            let data = match read_entry(&mut src, entry, &mut report)? {
                Some(data) => data,
                None => continue,
            };

            let relative = entry.target_path();
            let path = match target_in(root, &entry.name, &relative, &mut report) {
                Some(path) => path,
                None => continue,
            };

            if entry.kind.is_compiled() {
                if entry.kind == EntryKind::Source {
                    info!("Possible entry point: {}", relative.display());
                }
                match &pyc {
                    Ok(header) => write_file(&path, &header.wrap(&data))?,
                    Err(_) => {
                        report.warn(Warning::UnsupportedRuntimeVersion {
                            name: entry.name.clone(),
                            version: overlay.py_ver,
                        });
                        continue;
                    }
                }
                report.written += 1;
            } else {
                write_file(&path, &data)?;
                report.written += 1;
                if options.extract_pyz && entry.kind.is_pyz() {
                    pyz::extract_nested(&path, &entry.name, overlay.py_ver, &mut report)?;
                }
            }
        }

        info!(
            "Successfully extracted {} files with {} warnings to {}",
            report.written,
            report.warnings.len(),
            root.display()
        );
        Ok(report)
    }
}

/// Read and decompress the payload of `entry`. `None` means the entry was
/// skipped and a warning recorded.
fn read_entry<S>(
    src: &mut S,
    entry: &Entry,
    report: &mut Report,
) -> Result<Option<Vec<u8>>, Error>
where
    S: ArchiveSrc,
    Error: From<S::Err>,
{
    if entry.end().map_or(true, |end| end > src.len()) {
        report.warn(Warning::EntryOutOfBounds {
            name: entry.name.clone(),
            pos: entry.pos,
            size: entry.compressed_size,
        });
        return Ok(None);
    }

    let size = usize::try_from(entry.compressed_size).map_err(pyxtract_core::Error::from)?;
    let mut data = vec![0; size];
    src.read_exact_at(entry.pos, &mut data)?;
    if !entry.compressed {
        return Ok(Some(data));
    }

    let data = match inflate(&data) {
        Ok(data) => data,
        Err(source) => {
            report.warn(Warning::Decompress {
                name: entry.name.clone(),
                pos: entry.pos,
                source,
            });
            return Ok(None);
        }
    };
    if data.len() as u64 != u64::from(entry.uncompressed_size) {
        report.warn(Warning::PayloadIntegrityMismatch {
            name: entry.name.clone(),
            pos: entry.pos,
            declared: entry.uncompressed_size,
            actual: data.len(),
        });
    }
    Ok(Some(data))
}
