//! Open-time configuration.
//!
//! A [`CacheConfig`] decides which cache file is read and under which
//! filesystem root the library paths stored in it are resolved.

use crate::reader::LdCache;
use crate::Error;
use bon::Builder;
use camino::{Utf8Path, Utf8PathBuf};

/// Location of the system cache, relative to the root.
pub const LD_CACHE_PATH: &str = "/etc/ld.so.cache";

/// Where to find the cache and how to resolve the paths it contains.
///
/// ```no_run
/// use ldcache::CacheConfig;
///
/// let cache = CacheConfig::builder()
///     .root("/run/containers/rootfs")
///     .build()
///     .open()?;
/// # Ok::<(), ldcache::Error>(())
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct CacheConfig {
    /// Alternative root prefix (like chroot). Empty means the host root.
    #[builder(into)]
    root: Option<Utf8PathBuf>,

    /// Explicit cache file, used as given instead of `<root>/etc/ld.so.cache`.
    #[builder(into)]
    cache_path: Option<Utf8PathBuf>,
}

impl CacheConfig {
    pub fn root(&self) -> Option<&Utf8Path> {
        self.root.as_deref().filter(|root| !root.as_str().is_empty())
    }

    /// Path of the cache file to map.
    pub fn cache_file(&self) -> Utf8PathBuf {
        match &self.cache_path {
            Some(path) => path.clone(),
            None => self.join_root(Utf8Path::new(LD_CACHE_PATH)),
        }
    }

    /// Place `path` under the root prefix, if any.
    pub fn join_root(&self, path: &Utf8Path) -> Utf8PathBuf {
        match self.root() {
            Some(root) => root.join(path.strip_prefix("/").unwrap_or(path)),
            None => path.to_path_buf(),
        }
    }

    /// Map and parse the configured cache file.
    pub fn open(self) -> Result<LdCache, Error> {
        LdCache::open_with(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reads_system_cache() {
        let config = CacheConfig::default();
        assert_eq!(config.root(), None);
        assert_eq!(config.cache_file(), "/etc/ld.so.cache");
        assert_eq!(
            config.join_root(Utf8Path::new("/usr/lib/libc.so.6")),
            "/usr/lib/libc.so.6"
        );
    }

    #[test]
    fn root_prefixes_cache_and_library_paths() {
        let config = CacheConfig::builder().root("/srv/root").build();
        assert_eq!(config.cache_file(), "/srv/root/etc/ld.so.cache");
        assert_eq!(
            config.join_root(Utf8Path::new("/usr/lib/libc.so.6")),
            "/srv/root/usr/lib/libc.so.6"
        );
    }

    #[test]
    fn empty_root_means_host_root() {
        let config = CacheConfig::builder().root("").build();
        assert_eq!(config.root(), None);
        assert_eq!(config.cache_file(), "/etc/ld.so.cache");
    }

    #[test]
    fn explicit_cache_path_is_not_prefixed() {
        let config = CacheConfig::builder()
            .root("/srv/root")
            .cache_path("/tmp/ld.so.cache")
            .build();
        assert_eq!(config.cache_file(), "/tmp/ld.so.cache");
        assert_eq!(
            config.join_root(Utf8Path::new("/lib/libm.so.6")),
            "/srv/root/lib/libm.so.6"
        );
    }
}
