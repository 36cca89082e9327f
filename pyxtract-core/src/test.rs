//! Synthetic archives for unit tests
use alloc::string::String;
use alloc::vec::Vec;

use crate::{CookieLayout, ENTRY_HEAD_SIZE, MAGIC, PYZ_MAGIC};

pub const LIBNAME: &[u8] = b"python39.dll";

pub fn cookie_bytes(
    layout: CookieLayout,
    package_len: u32,
    toc_offset: u32,
    toc_len: u32,
    py_ver: u32,
) -> Vec<u8> {
    let mut cookie = Vec::with_capacity(layout.size());
    cookie.extend_from_slice(&MAGIC);
    cookie.extend_from_slice(&package_len.to_be_bytes());
    cookie.extend_from_slice(&toc_offset.to_be_bytes());
    cookie.extend_from_slice(&toc_len.to_be_bytes());
    cookie.extend_from_slice(&py_ver.to_be_bytes());
    if layout == CookieLayout::Extended {
        cookie.extend_from_slice(LIBNAME);
        cookie.resize(layout.size(), 0);
    }
    cookie
}

#[derive(Clone, Debug)]
pub struct TestEntry {
    pub offset: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub compress_flag: u8,
    pub kind: u8,
    pub name: Vec<u8>,
    /// NUL bytes appended to the name
    pub padding: usize,
}

impl TestEntry {
    pub fn raw(name: &str, offset: u32) -> TestEntry {
        TestEntry {
            offset,
            compressed_size: 0,
            uncompressed_size: 0,
            compress_flag: 0,
            kind: b'x',
            name: name.as_bytes().to_vec(),
            padding: 0,
        }
    }
}

pub fn toc_record(entry: &TestEntry) -> Vec<u8> {
    let size = ENTRY_HEAD_SIZE + entry.name.len() + entry.padding;
    let mut record = Vec::with_capacity(size);
    record.extend_from_slice(&(size as u32).to_be_bytes());
    record.extend_from_slice(&entry.offset.to_be_bytes());
    record.extend_from_slice(&entry.compressed_size.to_be_bytes());
    record.extend_from_slice(&entry.uncompressed_size.to_be_bytes());
    record.push(entry.compress_flag);
    record.push(entry.kind);
    record.extend_from_slice(&entry.name);
    record.resize(size, 0);
    record
}

pub struct Host {
    pub data: Vec<u8>,
    pub cookie_pos: u64,
}

/// Lays out `prefix | entry data | toc | cookie | trailing`
pub struct HostBuilder {
    layout: CookieLayout,
    py_ver: u32,
    prefix: Vec<u8>,
    entries: Vec<(TestEntry, Vec<u8>)>,
    trailing: Vec<u8>,
}

impl HostBuilder {
    pub fn new(layout: CookieLayout) -> HostBuilder {
        HostBuilder {
            layout,
            py_ver: 39,
            prefix: Vec::new(),
            entries: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub fn py_ver(mut self, py_ver: u32) -> HostBuilder {
        self.py_ver = py_ver;
        self
    }

    pub fn prefix(mut self, prefix: &[u8]) -> HostBuilder {
        self.prefix = prefix.to_vec();
        self
    }

    pub fn trailing(mut self, trailing: &[u8]) -> HostBuilder {
        self.trailing = trailing.to_vec();
        self
    }

    pub fn raw_entry(mut self, name: &str, data: &[u8]) -> HostBuilder {
        let entry = TestEntry {
            compressed_size: data.len() as u32,
            uncompressed_size: data.len() as u32,
            ..TestEntry::raw(name, 0)
        };
        self.entries.push((entry, data.to_vec()));
        self
    }

    pub fn build(self) -> Host {
        let mut overlay = Vec::new();
        let mut records = Vec::new();
        for (mut entry, data) in self.entries {
            entry.offset = overlay.len() as u32;
            overlay.extend_from_slice(&data);
            records.extend_from_slice(&toc_record(&entry));
        }
        let toc_offset = overlay.len() as u32;
        overlay.extend_from_slice(&records);

        let package_len = (overlay.len() + self.layout.size()) as u32;
        let cookie = cookie_bytes(
            self.layout,
            package_len,
            toc_offset,
            records.len() as u32,
            self.py_ver,
        );

        let mut data = self.prefix;
        data.extend_from_slice(&overlay);
        let cookie_pos = data.len() as u64;
        data.extend_from_slice(&cookie);
        data.extend_from_slice(&self.trailing);
        Host { data, cookie_pos }
    }
}

pub struct PyzModule {
    pub name: String,
    pub is_pkg: bool,
    pub data: Vec<u8>,
}

impl PyzModule {
    pub fn new(name: &str, is_pkg: bool, data: &[u8]) -> PyzModule {
        PyzModule {
            name: name.into(),
            is_pkg,
            data: data.to_vec(),
        }
    }
}

fn marshal_str(out: &mut Vec<u8>, s: &str) {
    out.push(b'u');
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn marshal_fields(out: &mut Vec<u8>, is_pkg: bool, pos: u32, len: u32) {
    out.extend_from_slice(b")\x03");
    out.push(b'i');
    out.extend_from_slice(&(is_pkg as u32).to_le_bytes());
    out.push(b'i');
    out.extend_from_slice(&pos.to_le_bytes());
    out.push(b'i');
    out.extend_from_slice(&len.to_le_bytes());
}

/// `{name: (ispkg, pos, length)}`
pub fn marshal_dict_toc(entries: &[(&str, bool, u32, u32)]) -> Vec<u8> {
    let mut out = Vec::from(&b"{"[..]);
    for &(name, is_pkg, pos, len) in entries {
        marshal_str(&mut out, name);
        marshal_fields(&mut out, is_pkg, pos, len);
    }
    out.push(b'0');
    out
}

/// Lays out `header | module data | marshalled toc`
pub fn pyz_bytes(
    pyc_magic: [u8; 4],
    modules: &[PyzModule],
    write_toc: fn(&[(&str, bool, u32, u32)]) -> Vec<u8>,
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&PYZ_MAGIC);
    data.extend_from_slice(&pyc_magic);
    data.extend_from_slice(&[0; 4]);

    let mut toc = Vec::new();
    for module in modules {
        toc.push((
            module.name.as_str(),
            module.is_pkg,
            data.len() as u32,
            module.data.len() as u32,
        ));
        data.extend_from_slice(&module.data);
    }
    let toc_offset = data.len() as u32;
    data[8..12].copy_from_slice(&toc_offset.to_be_bytes());
    data.extend_from_slice(&write_toc(&toc));
    data
}
