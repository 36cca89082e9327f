use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info};
use pyxtract_core::{PycHeader, PyzToc, PYZ_MAGIC};

use crate::ext::EntryExt;
use crate::extract::{inflate, write_file};
use crate::{target_in, wrap_io_err, Error, Report, Warning};

/// Directory the modules of the nested archive at `path` are written to
fn nested_root(path: &Path) -> PathBuf {
    let mut dir = OsString::from(path.as_os_str());
    dir.push("_extracted");
    PathBuf::from(dir)
}

/// Unpack the PYZ archive written at `path`, an entry called `name` of a
/// CArchive targeting python `py_ver`.
///
/// Only failing to read `path` back or to write output is an error. A
/// foreign or damaged archive is reported and skipped.
pub(crate) fn extract_nested(
    path: &Path,
    name: &str,
    py_ver: u32,
    report: &mut Report,
) -> Result<(), Error> {
    let mut magic = Vec::with_capacity(8);
    File::open(path)
        .map_err(wrap_io_err!(path, "Open"))?
        .take(8)
        .read_to_end(&mut magic)
        .map_err(wrap_io_err!(path, "Reading PYZ magic"))?;
    if magic.get(..4) != Some(&PYZ_MAGIC[..]) {
        report.warn(Warning::NotNestedArchive {
            name: name.to_string(),
            magic,
        });
        return Ok(());
    }

    let pyc = match PycHeader::for_version(py_ver) {
        Ok(pyc) => pyc,
        Err(_) => {
            report.warn(Warning::UnsupportedRuntimeVersion {
                name: name.to_string(),
                version: py_ver,
            });
            return Ok(());
        }
    };
    let expected = pyc.magic_number();
    if magic.get(4..8) != Some(&expected[..]) {
        let mut found = [0; 4];
        let tag = magic.get(4..).unwrap_or_default();
        found[..tag.len()].copy_from_slice(tag);
        report.warn(Warning::NestedVersionMismatch {
            name: name.to_string(),
            found,
            expected,
        });
        return Ok(());
    }

    let data = fs::read(path).map_err(wrap_io_err!(path, "Reading PYZ archive"))?;
    let toc = match PyzToc::parse(&data) {
        Ok((_, toc)) => toc,
        Err(source) => {
            report.warn(Warning::NestedTocCorrupt {
                name: name.to_string(),
                source,
            });
            return Ok(());
        }
    };
    info!("Found {} files in PYZ archive", toc.len());

    let root = nested_root(path);
    fs::create_dir_all(&root).map_err(wrap_io_err!(root, "Creating output directory"))?;

    for entry in toc.entries() {
        let module = entry.name.to_string_lossy();
        let payload = match entry
            .end()
            .and_then(|end| usize::try_from(end).ok())
            .and_then(|end| data.get(usize::try_from(entry.offset).ok()?..end))
        {
            Some(payload) => payload,
            None => {
                report.warn(Warning::NestedEntryOutOfBounds {
                    name: name.to_string(),
                    module,
                    offset: entry.offset,
                    length: entry.length,
                });
                continue;
            }
        };

        let relative = entry.target_path();
        let target = match target_in(&root, &module, &relative, report) {
            Some(target) => target,
            None => continue,
        };
        match inflate(payload) {
            Ok(code) => {
                debug!("Writing {}", target.display());
                write_file(&target, &pyc.wrap(&code))?;
            }
            Err(source) => {
                let mut encrypted = OsString::from(target.as_os_str());
                encrypted.push(".encrypted");
                let encrypted = PathBuf::from(encrypted);
                write_file(&encrypted, payload)?;
                report.warn(Warning::NestedPayloadUndecodable {
                    module,
                    path: target,
                    source,
                });
            }
        }
        report.written += 1;
    }
    Ok(())
}
