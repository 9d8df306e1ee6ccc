//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use cfb::CompoundFile;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copy a fixture directory tree into `dest`.
pub fn copy_tree(src: &Path, dest: &Path) {
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.unwrap();
        let target = dest.join(entry.path().strip_prefix(src).unwrap());
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
}

pub const PT_LONG: u16 = 0x0003;
pub const PT_SYSTIME: u16 = 0x0040;

/// Builds minimal Outlook `.msg` compound files in memory.
pub struct MsgBuilder {
    file: CompoundFile<Cursor<Vec<u8>>>,
}

impl MsgBuilder {
    pub fn new() -> Self {
        Self {
            file: CompoundFile::create(Cursor::new(Vec::new())).unwrap(),
        }
    }

    pub fn storage(&mut self, path: &str) -> &mut Self {
        self.file.create_storage(path).unwrap();
        self
    }

    fn write(&mut self, storage: &str, name: &str, data: &[u8]) {
        let path = Path::new(storage).join(name);
        let mut stream = self.file.create_stream(&path).unwrap();
        stream.write_all(data).unwrap();
        stream.flush().unwrap();
    }

    /// A `PT_UNICODE` property stream.
    pub fn unicode(&mut self, storage: &str, id: u16, value: &str) -> &mut Self {
        let bytes: Vec<u8> = value.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        self.write(storage, &format!("__substg1.0_{id:04X}001F"), &bytes);
        self
    }

    /// A `PT_BINARY` property stream.
    pub fn binary(&mut self, storage: &str, id: u16, value: &[u8]) -> &mut Self {
        self.write(storage, &format!("__substg1.0_{id:04X}0102"), value);
        self
    }

    /// The fixed-width property table. `header_len` is 32 for the top-level
    /// message, 24 for an embedded one and 8 for recipients/attachments.
    pub fn properties(&mut self, storage: &str, header_len: usize, props: &[(u16, u16, u64)]) -> &mut Self {
        let mut data = vec![0u8; header_len];
        for &(id, prop_type, value) in props {
            let tag = (u32::from(id) << 16) | u32::from(prop_type);
            data.extend_from_slice(&tag.to_le_bytes());
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&value.to_le_bytes());
        }
        self.write(storage, "__properties_version1.0", &data);
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.file.flush().unwrap();
        self.file.into_inner().into_inner()
    }
}

/// FILETIME ticks for a Unix timestamp.
pub fn filetime(unix_secs: i64) -> u64 {
    ((unix_secs + 11_644_473_600) as u64) * 10_000_000
}
