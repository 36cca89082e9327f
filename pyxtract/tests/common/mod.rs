//! Synthetic PyInstaller executables
#![allow(dead_code)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pyxtract_core::{CookieLayout, ENTRY_HEAD_SIZE, MAGIC, PYZ_MAGIC};

pub struct TestDir {
    tmpdir: tempfile::TempDir,
}

impl TestDir {
    pub fn new() -> io::Result<TestDir> {
        Ok(TestDir {
            tmpdir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.tmpdir.path().join(path)
    }

    /// Save `data` as a file and return its path
    pub fn write(&self, name: &str, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, data)?;
        Ok(path)
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

struct Member {
    name: Vec<u8>,
    kind: u8,
    compressed: bool,
    uncompressed_size: u32,
    data: Vec<u8>,
}

/// Lays out `stub | entry data | toc | cookie | trailing`
pub struct HostBuilder {
    layout: CookieLayout,
    py_ver: u32,
    trailing: Vec<u8>,
    members: Vec<Member>,
}

impl HostBuilder {
    pub fn new(py_ver: u32) -> HostBuilder {
        HostBuilder {
            layout: CookieLayout::Extended,
            py_ver,
            trailing: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn legacy(mut self) -> HostBuilder {
        self.layout = CookieLayout::Legacy;
        self
    }

    /// Data appended after the cookie, like a code signature
    pub fn trailing(mut self, trailing: &[u8]) -> HostBuilder {
        self.trailing = trailing.to_vec();
        self
    }

    /// Stored entry
    pub fn raw(mut self, kind: u8, name: &str, data: &[u8]) -> HostBuilder {
        self.members.push(Member {
            name: name.as_bytes().to_vec(),
            kind,
            compressed: false,
            uncompressed_size: data.len() as u32,
            data: data.to_vec(),
        });
        self
    }

    /// Compressed entry declaring its true uncompressed size
    pub fn deflated(self, kind: u8, name: &str, data: &[u8]) -> HostBuilder {
        let size = data.len() as u32;
        self.deflated_sized(kind, name, data, size)
    }

    /// Compressed entry declaring `uncompressed_size`
    pub fn deflated_sized(
        mut self,
        kind: u8,
        name: &str,
        data: &[u8],
        uncompressed_size: u32,
    ) -> HostBuilder {
        self.members.push(Member {
            name: name.as_bytes().to_vec(),
            kind,
            compressed: true,
            uncompressed_size,
            data: deflate(data),
        });
        self
    }

    /// Entry flagged as compressed holding `data` verbatim
    pub fn corrupt(mut self, kind: u8, name: &str, data: &[u8]) -> HostBuilder {
        self.members.push(Member {
            name: name.as_bytes().to_vec(),
            kind,
            compressed: true,
            uncompressed_size: data.len() as u32,
            data: data.to_vec(),
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut overlay = Vec::new();
        let mut toc = Vec::new();
        for member in &self.members {
            let size = (ENTRY_HEAD_SIZE + member.name.len() + 4) as u32;
            toc.extend_from_slice(&size.to_be_bytes());
            toc.extend_from_slice(&(overlay.len() as u32).to_be_bytes());
            toc.extend_from_slice(&(member.data.len() as u32).to_be_bytes());
            toc.extend_from_slice(&member.uncompressed_size.to_be_bytes());
            toc.push(member.compressed as u8);
            toc.push(member.kind);
            toc.extend_from_slice(&member.name);
            toc.extend_from_slice(&[0; 4]);
            overlay.extend_from_slice(&member.data);
        }
        let toc_offset = overlay.len() as u32;
        overlay.extend_from_slice(&toc);

        let mut host = b"MZ\x90\x00 bootloader stub".to_vec();
        let package_len = (overlay.len() + self.layout.size()) as u32;
        host.extend_from_slice(&overlay);
        host.extend_from_slice(&MAGIC);
        host.extend_from_slice(&package_len.to_be_bytes());
        host.extend_from_slice(&toc_offset.to_be_bytes());
        host.extend_from_slice(&(toc.len() as u32).to_be_bytes());
        host.extend_from_slice(&self.py_ver.to_be_bytes());
        if self.layout == CookieLayout::Extended {
            let mut libname = format!("python{}.dll", self.py_ver).into_bytes();
            libname.resize(64, 0);
            host.extend_from_slice(&libname);
        }
        host.extend_from_slice(&self.trailing);
        host
    }
}

/// Offset of the big endian `toc_len` field in a built host
pub fn toc_len_field(host: &[u8]) -> usize {
    let cookie = host
        .windows(MAGIC.len())
        .rposition(|window| window == MAGIC)
        .unwrap();
    cookie + 16
}

fn marshal_str(out: &mut Vec<u8>, s: &str) {
    out.push(b'u');
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn marshal_int(out: &mut Vec<u8>, value: u32) {
    out.push(b'i');
    out.extend_from_slice(&value.to_le_bytes());
}

fn marshal_fields(out: &mut Vec<u8>, is_pkg: bool, pos: u32, len: u32) {
    out.extend_from_slice(b")\x03");
    marshal_int(out, is_pkg as u32);
    marshal_int(out, pos);
    marshal_int(out, len);
}

pub type TocWriter = fn(&[(&str, bool, u32, u32)]) -> Vec<u8>;

/// `{name: (ispkg, pos, length)}`
pub fn dict_toc(entries: &[(&str, bool, u32, u32)]) -> Vec<u8> {
    let mut out = b"{".to_vec();
    for &(name, is_pkg, pos, len) in entries {
        marshal_str(&mut out, name);
        marshal_fields(&mut out, is_pkg, pos, len);
    }
    out.push(b'0');
    out
}

/// `[(name, (ispkg, pos, length)), ...]`
pub fn list_toc(entries: &[(&str, bool, u32, u32)]) -> Vec<u8> {
    let mut out = b"[".to_vec();
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for &(name, is_pkg, pos, len) in entries {
        out.extend_from_slice(b")\x02");
        marshal_str(&mut out, name);
        marshal_fields(&mut out, is_pkg, pos, len);
    }
    out
}

/// A PYZ archive holding `(name, is_pkg, stored bytes)` modules
pub fn pyz(pyc_magic: [u8; 4], modules: &[(&str, bool, Vec<u8>)], write_toc: TocWriter) -> Vec<u8> {
    let mut data = PYZ_MAGIC.to_vec();
    data.extend_from_slice(&pyc_magic);
    data.extend_from_slice(&[0; 4]);

    let mut toc = Vec::new();
    for (name, is_pkg, stored) in modules {
        toc.push((*name, *is_pkg, data.len() as u32, stored.len() as u32));
        data.extend_from_slice(stored);
    }
    let toc_offset = data.len() as u32;
    data[8..12].copy_from_slice(&toc_offset.to_be_bytes());
    data.extend_from_slice(&write_toc(&toc));
    data
}
