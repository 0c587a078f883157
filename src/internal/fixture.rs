//! In-memory cache images for tests.

use crate::internal::cache_format::{
    CACHE_MAGIC, CACHE_VERSION, ENTRY_SIZE, HEADER_ALIGN, HEADER_SIZE, LEGACY_ENTRY_SIZE,
    LEGACY_MAGIC,
};

#[derive(Debug, Clone)]
enum Offsets {
    Strings { key: String, value: String },
    Raw { key: u32, value: u32 },
}

#[derive(Debug, Clone)]
struct ImageEntry {
    flags: i32,
    offsets: Offsets,
    os_version: u32,
    hwcap: u64,
}

/// Builder for `ld.so.cache` bytes, optionally behind a legacy prefix.
#[derive(Debug, Clone, Default)]
pub(crate) struct CacheImage {
    entries: Vec<ImageEntry>,
    legacy: Option<u32>,
    reserved: [u32; 3],
    drop_final_nul: bool,
}

impl CacheImage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entry(self, flags: i32, key: &str, value: &str) -> Self {
        self.entry_with_caps(flags, key, value, 0, 0)
    }

    pub(crate) fn entry_with_caps(
        mut self,
        flags: i32,
        key: &str,
        value: &str,
        os_version: u32,
        hwcap: u64,
    ) -> Self {
        self.entries.push(ImageEntry {
            flags,
            offsets: Offsets::Strings {
                key: key.to_string(),
                value: value.to_string(),
            },
            os_version,
            hwcap,
        });
        self
    }

    /// Entry with offsets written verbatim, relative to the header start.
    pub(crate) fn raw_entry(mut self, flags: i32, key: u32, value: u32) -> Self {
        self.entries.push(ImageEntry {
            flags,
            offsets: Offsets::Raw { key, value },
            os_version: 0,
            hwcap: 0,
        });
        self
    }

    pub(crate) fn legacy_prefix(mut self, nlibs: u32) -> Self {
        self.legacy = Some(nlibs);
        self
    }

    pub(crate) fn reserved(mut self, reserved: [u32; 3]) -> Self {
        self.reserved = reserved;
        self
    }

    /// Cut the NUL terminating the last string so it runs into the end of the buffer.
    pub(crate) fn unterminated_tail(mut self) -> Self {
        self.drop_final_nul = true;
        self
    }

    pub(crate) fn string_table_len(&self) -> usize {
        self.string_table().0.len()
    }

    fn string_table(&self) -> (Vec<u8>, Vec<(u32, u32)>) {
        let base = (HEADER_SIZE + self.entries.len() * ENTRY_SIZE) as u32;
        let mut table = Vec::new();
        let mut offsets = Vec::new();

        for entry in &self.entries {
            match &entry.offsets {
                Offsets::Strings { key, value } => {
                    let key_offset = base + table.len() as u32;
                    table.extend_from_slice(key.as_bytes());
                    table.push(0);
                    let value_offset = base + table.len() as u32;
                    table.extend_from_slice(value.as_bytes());
                    table.push(0);
                    offsets.push((key_offset, value_offset));
                }
                Offsets::Raw { key, value } => offsets.push((*key, *value)),
            }
        }

        if self.drop_final_nul && table.last() == Some(&0) {
            table.pop();
        }
        (table, offsets)
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::new();

        if let Some(nlibs) = self.legacy {
            data.extend_from_slice(LEGACY_MAGIC);
            data.push(0);
            data.extend_from_slice(&nlibs.to_le_bytes());
            for i in 0..nlibs {
                data.extend_from_slice(&3i32.to_le_bytes());
                data.extend_from_slice(&i.to_le_bytes());
                data.extend_from_slice(&i.to_le_bytes());
            }
            debug_assert_eq!(data.len(), 16 + nlibs as usize * LEGACY_ENTRY_SIZE);
            while data.len() % HEADER_ALIGN != 0 {
                data.push(0);
            }
        }

        let (table, offsets) = self.string_table();

        data.extend_from_slice(&CACHE_MAGIC);
        data.extend_from_slice(&CACHE_VERSION);
        data.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        data.extend_from_slice(&(table.len() as u32).to_le_bytes());
        for word in self.reserved {
            data.extend_from_slice(&word.to_le_bytes());
        }
        data.extend_from_slice(&0u64.to_le_bytes());

        for (entry, (key, value)) in self.entries.iter().zip(offsets) {
            data.extend_from_slice(&entry.flags.to_le_bytes());
            data.extend_from_slice(&key.to_le_bytes());
            data.extend_from_slice(&value.to_le_bytes());
            data.extend_from_slice(&entry.os_version.to_le_bytes());
            data.extend_from_slice(&entry.hwcap.to_le_bytes());
        }

        data.extend_from_slice(&table);
        data
    }
}
