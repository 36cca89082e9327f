//! Extension traits for base types defined in `pyxtract-core`.
use std::path::PathBuf;

use pyxtract_core::{Entry, PyzEntry};

/// Stand-in for `..` and for names with no usable component
const PLACEHOLDER: &str = "__";

/// Turn an archive member name into a relative path that stays below the
/// extraction directory. Both `/` and `\` separate components, empty and
/// `.` components are dropped, and every `..` is replaced.
pub fn sanitize(name: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for component in name.split(|c: char| c == '/' || c == '\\') {
        match component {
            "" | "." => {}
            component => path.push(component.replace("..", PLACEHOLDER)),
        }
    }
    if path.as_os_str().is_empty() {
        path.push(PLACEHOLDER);
    }
    path
}

pub trait EntryExt {
    /// Relative output path of the entry data
    fn target_path(&self) -> PathBuf;
}

impl EntryExt for Entry {
    fn target_path(&self) -> PathBuf {
        if self.kind.is_compiled() {
            sanitize(&format!("{}.pyc", self.name))
        } else {
            sanitize(&self.name)
        }
    }
}

impl EntryExt for PyzEntry {
    /// Dotted module names become directories; packages are written as
    /// `__init__.pyc` inside theirs.
    fn target_path(&self) -> PathBuf {
        let dotted = self
            .name
            .to_string_lossy()
            .replace("..", PLACEHOLDER)
            .replace('.', "/");
        if self.is_pkg {
            sanitize(&format!("{}/__init__.pyc", dotted))
        } else {
            sanitize(&format!("{}.pyc", dotted))
        }
    }
}
