//! Cache reading API.
//!
//! [`LdCache`] owns the read-only mapping of a cache file together with the
//! header and entry table decoded from it.

use crate::config::CacheConfig;
use crate::internal::cache_format::{self, Arch, Entry, Header, StringTable};
use crate::Error;
use camino::{Utf8Path, Utf8PathBuf};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io;
use tracing::debug;

/// An open `ld.so.cache`.
///
/// The mapping lives exactly as long as this value. Once opened nothing in it
/// changes, so lookups can run concurrently from any number of threads.
#[derive(Debug)]
pub struct LdCache {
    config: CacheConfig,
    path: Utf8PathBuf,
    map: Mmap,
    header: Header,
    pub(crate) entries: Vec<Entry>,
    strings_base: usize,
    legacy_nlibs: Option<u32>,
}

/// A cache entry with both of its strings readable.
#[derive(Debug, Clone)]
pub struct CacheEntry<'a> {
    pub key: Cow<'a, str>,
    pub value: Cow<'a, str>,
    pub flags: i32,
    pub arch: Arch,
    pub os_version: u32,
    pub hwcap: u64,
}

impl LdCache {
    /// Open the host's `/etc/ld.so.cache`.
    pub fn open() -> Result<Self, Error> {
        Self::open_with(CacheConfig::default())
    }

    /// Open `<root>/etc/ld.so.cache` and resolve libraries under `root`.
    pub fn with_root(root: impl Into<Utf8PathBuf>) -> Result<Self, Error> {
        Self::open_with(CacheConfig::builder().root(root).build())
    }

    pub fn open_with(config: CacheConfig) -> Result<Self, Error> {
        let path = config.cache_file();
        debug!("Opening ld.so.cache at {}", path);

        let file = File::open(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound { path: path.clone() },
            _ => Error::Io(err),
        })?;
        // The mapping is private and read-only; it is dropped with `Self`
        // or right here if parsing fails.
        let map = unsafe { Mmap::map(&file)? };
        let layout = cache_format::parse_cache(&map)?;

        debug!(
            "Parsed {} entries ({} bytes of strings) from {}",
            layout.header.nlibs, layout.header.table_size, path
        );

        Ok(Self {
            config,
            path,
            header: layout.header,
            entries: layout.entries,
            strings_base: layout.strings_base,
            legacy_nlibs: layout.legacy_nlibs,
            map,
        })
    }

    /// Unmap the cache. Dropping the value does the same.
    pub fn close(self) {
        debug!("Closing {}", self.path);
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn magic(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.header.magic)
    }

    pub fn version(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.header.version)
    }

    /// Number of entries declared by the header.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry count of the `ld.so-1.7.0` prefix, if the file had one.
    pub fn legacy_entry_count(&self) -> Option<u32> {
        self.legacy_nlibs
    }

    pub(crate) fn strings(&self) -> StringTable<'_> {
        StringTable::new(&self.map[self.strings_base..])
    }

    /// Iterate over every entry whose key and value can be read.
    pub fn entries(&self) -> impl Iterator<Item = CacheEntry<'_>> + '_ {
        let strings = self.strings();
        self.entries.iter().filter_map(move |entry| {
            let key = strings.c_str(entry.key)?;
            let value = strings.c_str(entry.value)?;
            Some(CacheEntry {
                key: String::from_utf8_lossy(key),
                value: String::from_utf8_lossy(value),
                flags: entry.flags,
                arch: entry.arch,
                os_version: entry.os_version,
                hwcap: entry.hwcap,
            })
        })
    }
}

impl fmt::Display for LdCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} libs found in cache `{}'", self.len(), self.path)?;
        for entry in self.entries() {
            let kind = if entry.flags & cache_format::FLAG_TYPE_ELF != 0 {
                "libc6"
            } else {
                "unknown"
            };
            write!(f, "\t{} ({}", entry.key, kind)?;
            if entry.arch != Arch::I386 {
                write!(f, ",{}", entry.arch)?;
            }
            if entry.hwcap != 0 {
                write!(f, ", hwcap: {:#018x}", entry.hwcap)?;
            }
            writeln!(f, ") => {}", entry.value)?;
        }
        Ok(())
    }
}
