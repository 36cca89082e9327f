use std::collections::HashSet;
use std::path::Path;

use log::{debug, info};
use pyxtract_core::{
    find_cookie, ArchiveSrc, CookieLayout, Entry, Overlay, COOKIE_EXT_SIZE, COOKIE_SIZE,
};

use crate::{Error, HostFile, Report, Warning};

/// A PyInstaller CArchive appended to a host executable
#[derive(Debug)]
pub struct CArchive<S = HostFile> {
    pub(crate) src: S,
    pub(crate) overlay: Overlay,
    pub(crate) entries: Vec<Entry>,
    pub(crate) report: Report,
}

impl CArchive<HostFile> {
    pub fn open(path: impl AsRef<Path>) -> Result<CArchive<HostFile>, Error> {
        let path = path.as_ref();
        info!("Processing {}", path.display());
        CArchive::new(HostFile::open(path)?)
    }
}

impl<S> CArchive<S>
where
    S: ArchiveSrc,
    Error: From<S::Err>,
{
    /// Locate the cookie in `src` and decode the header and table of contents
    pub fn new(mut src: S) -> Result<CArchive<S>, Error> {
        let overlay = read_overlay(&mut src)?;

        // Bounded by the file size, checked when decoding the cookie
        let toc_len = usize::try_from(overlay.toc_len).map_err(pyxtract_core::Error::from)?;
        let mut toc = vec![0; toc_len];
        src.read_exact_at(overlay.toc_pos, &mut toc)?;
        let mut entries = overlay.entries(&toc)?;

        let mut report = Report::default();
        name_unnamed(&mut entries, &mut report);
        info!("Found {} files in CArchive", entries.len());

        Ok(CArchive {
            src,
            overlay,
            entries,
            report,
        })
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Conditions recovered from while opening the archive
    pub fn warnings(&self) -> &[Warning] {
        &self.report.warnings
    }
}

fn read_overlay<S>(src: &mut S) -> Result<Overlay, Error>
where
    S: ArchiveSrc,
    Error: From<S::Err>,
{
    let len = src.len();
    let cookie_pos = find_cookie(src)?;
    debug!("Found cookie at {:#x}", cookie_pos);

    // The extended cookie may run past the end of a file with a 2.0 cookie
    let available = usize::try_from((len - cookie_pos).min(COOKIE_EXT_SIZE as u64))
        .map_err(pyxtract_core::Error::from)?;
    let mut cookie = vec![0; available];
    src.read_exact_at(cookie_pos, &mut cookie)?;

    let layout = CookieLayout::detect(cookie.get(COOKIE_SIZE..).unwrap_or_default());
    match layout {
        CookieLayout::Legacy => info!("Pyinstaller version: 2.0"),
        CookieLayout::Extended => info!("Pyinstaller version: 2.1+"),
    }

    let overlay = Overlay::new(&cookie, layout, cookie_pos, len)?;
    if let Some(libname) = &overlay.py_libname {
        debug!("py_libname: {}", libname);
    }
    info!("Python version: {}", overlay.py_ver);
    info!("Length of package: {} bytes", overlay.package_len);
    Ok(overlay)
}

/// Give every entry with an empty name a random one that is not otherwise
/// used in the archive
fn name_unnamed(entries: &mut [Entry], report: &mut Report) {
    let mut taken: HashSet<String> = entries.iter().map(|entry| entry.name.clone()).collect();
    for entry in entries.iter_mut().filter(|entry| entry.name.is_empty()) {
        let name = loop {
            let candidate = format!("unnamed-{:016x}", rand::random::<u64>());
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(name.clone());
        entry.name = name.clone();
        report.warn(Warning::UnnamedEntry {
            pos: entry.pos,
            name,
        });
    }
}

#[cfg(test)]
mod tests {
    use pyxtract_core::{Entry, EntryKind};

    use super::name_unnamed;
    use crate::{Report, Warning};

    fn unnamed(pos: u64) -> Entry {
        Entry {
            pos,
            compressed_size: 0,
            uncompressed_size: 0,
            compressed: false,
            kind: EntryKind::Data,
            name: String::new(),
        }
    }

    #[test]
    fn unnamed_entries_get_distinct_names() {
        let mut entries: Vec<Entry> = (0..64).map(unnamed).collect();
        entries.push(Entry {
            name: "named".to_string(),
            ..unnamed(99)
        });
        let mut report = Report::default();
        name_unnamed(&mut entries, &mut report);

        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert!(names.iter().all(|name| !name.is_empty()));
        assert_eq!(names[64], "named");
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 65);

        assert_eq!(report.warnings.len(), 64);
        assert!(matches!(
            &report.warnings[3],
            Warning::UnnamedEntry { pos: 3, name } if *name == entries[3].name
        ));
    }
}
