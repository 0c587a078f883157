// ldcache - glibc ld.so.cache reader
// MIT, 2025

//! A reader for glibc's dynamic linker cache, `ld.so.cache`.
//!
//! This library provides:
//! - Memory-mapped, bounds-checked decoding of the cache file, including
//!   files that still carry the `ld.so-1.7.0` legacy prefix
//! - Library lookup by name prefix, split into 32-bit and 64-bit results
//! - Resolution of the matched paths to canonical paths, optionally under an
//!   alternative root such as a container filesystem
//!
//! # Example: Find a library
//!
//! ```no_run
//! use ldcache::LdCache;
//!
//! let cache = LdCache::open()?;
//! let found = cache.lookup(&["libcuda.so", "libnvidia-ml.so"]);
//! for path in &found.paths64 {
//!     println!("{path}");
//! }
//! # Ok::<(), ldcache::Error>(())
//! ```
//!
//! # Example: Read a container's cache
//!
//! ```no_run
//! use ldcache::LdCache;
//!
//! let cache = LdCache::with_root("/var/lib/containers/rootfs")?;
//! print!("{cache}");
//! # Ok::<(), ldcache::Error>(())
//! ```

mod internal;

pub mod config;
pub mod error;
pub mod lookup;
pub mod reader;

pub use config::CacheConfig;
pub use error::{Error, Result};
pub use internal::cache_format::{Arch, Header, WordSize};
pub use lookup::LibraryPaths;
pub use reader::{CacheEntry, LdCache};
