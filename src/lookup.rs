//! Library lookup.
//!
//! Matching is by byte prefix on the cache key, not equality: `"libfoo"`
//! selects `libfoo.so.1`, and also `libfoobar.so`. Callers wanting an exact
//! soname should ask for it in full, e.g. `"libfoo.so."`.

use crate::internal::cache_format::WordSize;
use crate::reader::LdCache;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use tracing::debug;

/// Canonical library paths found by [`LdCache::lookup`], split by word size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryPaths {
    pub paths32: Vec<Utf8PathBuf>,
    pub paths64: Vec<Utf8PathBuf>,
}

impl LibraryPaths {
    pub fn is_empty(&self) -> bool {
        self.paths32.is_empty() && self.paths64.is_empty()
    }

    /// Add `path` to the bucket for `size` unless it is already there.
    fn insert(&mut self, seen: &mut [HashSet<Utf8PathBuf>; 2], size: WordSize, path: Utf8PathBuf) {
        let (paths, seen) = match size {
            WordSize::Bits32 => (&mut self.paths32, &mut seen[0]),
            WordSize::Bits64 => (&mut self.paths64, &mut seen[1]),
        };
        if seen.insert(path.clone()) {
            paths.push(path);
        }
    }
}

impl From<LibraryPaths> for (Vec<Utf8PathBuf>, Vec<Utf8PathBuf>) {
    fn from(paths: LibraryPaths) -> Self {
        (paths.paths32, paths.paths64)
    }
}

impl LdCache {
    /// Find every library whose cache key starts with one of `names`.
    ///
    /// Entries are visited in cache order. Each match is joined under the
    /// configured root and resolved through symlinks; entries that are not
    /// ELF libraries, have an unsupported architecture, point outside the
    /// string table or do not resolve are skipped. Each bucket keeps the
    /// first occurrence of a canonical path.
    pub fn lookup<S: AsRef<str>>(&self, names: &[S]) -> LibraryPaths {
        debug!(
            "Looking up {:?} in cache",
            names.iter().map(AsRef::<str>::as_ref).collect::<Vec<_>>()
        );

        let strings = self.strings();
        let mut found = LibraryPaths::default();
        let mut seen: [HashSet<Utf8PathBuf>; 2] = Default::default();

        for entry in &self.entries {
            if !entry.is_elf() {
                continue;
            }
            let Some(size) = entry.arch.word_size() else {
                continue;
            };
            let (Some(key), Some(value)) = (strings.tail(entry.key), strings.tail(entry.value))
            else {
                continue;
            };

            if !names
                .iter()
                .any(|name| key.starts_with(name.as_ref().as_bytes()))
            {
                continue;
            }

            let Some(end) = value.iter().position(|&b| b == 0) else {
                continue;
            };
            let Ok(value) = std::str::from_utf8(&value[..end]) else {
                debug!("skipping non UTF-8 path in cache");
                continue;
            };

            if let Some(path) = self.resolve(value) {
                found.insert(&mut seen, size, path);
            }
        }

        found
    }

    fn resolve(&self, value: &str) -> Option<Utf8PathBuf> {
        let candidate = self.config().join_root(Utf8Path::new(value));
        debug!("checking {}", candidate);

        match candidate.canonicalize_utf8() {
            Ok(path) => Some(path),
            Err(err) => {
                debug!("could not resolve symlink for {}: {}", candidate, err);
                None
            }
        }
    }
}
