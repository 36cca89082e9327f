use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pyxtract_core::CookieLayout;

use crate::{wrap_io_err, CArchive, Error, ExtractOptions, Report};

/// Directory an archive is extracted to: `<basename>_extracted`, placed in
/// `output` or else the current directory
pub fn output_root(archive: &Path, output: Option<&Path>) -> Result<PathBuf, Error> {
    let mut name = archive
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| Error::InvalidPath {
            entry: archive.display().to_string(),
            path: archive.to_path_buf(),
        })?;
    name.push("_extracted");

    let parent = match output {
        Some(output) => output.to_path_buf(),
        None => std::env::current_dir().map_err(wrap_io_err!("Reading current directory"))?,
    };
    Ok(parent.join(name))
}

pub fn extract(
    archive_path: impl AsRef<Path>,
    output: Option<&Path>,
    extract_pyz: bool,
) -> Result<Report, Error> {
    let archive_path = archive_path.as_ref();
    let archive = CArchive::open(archive_path)?;
    let root = output_root(archive_path, output)?;
    archive.extract(root, &ExtractOptions { extract_pyz })
}

pub fn list(archive_path: impl AsRef<Path>) -> Result<(), Error> {
    let archive = CArchive::open(archive_path)?;
    let overlay = archive.overlay();

    let layout = match overlay.layout {
        CookieLayout::Legacy => "2.0",
        CookieLayout::Extended => "2.1+",
    };
    println!("pyinstaller: {}", layout);
    println!("python: {}", overlay.py_ver);
    if let Some(libname) = &overlay.py_libname {
        println!("library: {}", libname);
    }
    println!("package length: {}", overlay.package_len);
    println!("entries: {}", archive.entries().len());
    for entry in archive.entries() {
        println!("{}", entry);
    }
    Ok(())
}
