mod archive;
mod bin;
pub mod ext;
mod extract;
mod package;
mod pyz;
mod report;

pub use archive::*;
pub use bin::*;
pub use extract::*;
pub use package::*;
pub use report::*;

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Create a closure mapping an [`io::Error`] to [`Error::Io`], with the
/// given path and context.
#[macro_export]
macro_rules! wrap_io_err {
    ($path:expr, $context:expr) => {
        |source| $crate::Error::Io {
            source,
            path: Some(::std::path::Path::new(&$path).to_path_buf()),
            context: $context,
        }
    };
    ($context:expr) => {
        |source| $crate::Error::Io {
            source,
            path: None,
            context: $context,
        }
    };
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

#[derive(thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] pyxtract_core::Error),
    #[error("{context}{}", display_path(.path))]
    Io {
        source: io::Error,
        path: Option<PathBuf>,
        context: &'static str,
    },
    #[error("Path {} for entry {entry:?} leaves the extraction directory", .path.display())]
    InvalidPath { entry: String, path: PathBuf },
}

impl Error {
    /// True for errors raised while reading the host or writing output, as
    /// opposed to structural errors in the archive itself
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;

        let mut source = self.source();
        while let Some(err) = source {
            writeln!(f, "\tCaused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}

/// Join `relative` onto `root` if every component of it is a plain name.
/// Otherwise warn and return `None`, so the entry is skipped.
pub(crate) fn target_in(
    root: &Path,
    entry: &str,
    relative: &Path,
    report: &mut Report,
) -> Option<PathBuf> {
    use std::path::Component;

    if relative.as_os_str().is_empty()
        || !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
    {
        report.warn(Warning::UnsafePath {
            name: entry.to_string(),
            path: relative.to_path_buf(),
        });
        return None;
    }
    Some(root.join(relative))
}
