//! Low-level cache binary format implementation.
//!
//! This module decodes the binary layout of ld.so.cache files:
//! - The optional `ld.so-1.7.0` legacy prefix, which is skipped
//! - The `glibc-ld.so.cache1.1` header and its entry array
//! - Entry flag bits, decoded once into [`Arch`]
//! - The string table the entries point into

use crate::internal::cursor::Cursor;
use crate::Error;
use std::fmt;

pub(crate) const LEGACY_MAGIC: &[u8] = b"ld.so-1.7.0";
pub(crate) const CACHE_MAGIC: [u8; 17] = *b"glibc-ld.so.cache";
pub(crate) const CACHE_VERSION: [u8; 3] = *b"1.1";

/// Legacy header: magic plus NUL (12 bytes) and a u32 entry count.
pub(crate) const LEGACY_HEADER_SIZE: usize = 16;
/// Legacy entry: i32 flags, u32 key, u32 value.
pub(crate) const LEGACY_ENTRY_SIZE: usize = 12;
/// Current header, including the trailing padding to 8-byte alignment.
pub(crate) const HEADER_SIZE: usize = 48;
/// Current entry: i32 flags, u32 key, u32 value, u32 osversion, u64 hwcap.
pub(crate) const ENTRY_SIZE: usize = 24;
pub(crate) const HEADER_ALIGN: usize = 8;

// Flag constants from glibc sysdeps/generic/ldconfig.h
pub(crate) const FLAG_TYPE_MASK: i32 = 0x00ff;
pub(crate) const FLAG_TYPE_ELF: i32 = 0x0001;
pub(crate) const FLAG_ARCH_MASK: i32 = 0xff00;
pub(crate) const FLAG_ARCH_I386: i32 = 0x0000;
pub(crate) const FLAG_X8664_LIB64: i32 = 0x0300;
pub(crate) const FLAG_POWERPC_LIB64: i32 = 0x0500;
pub(crate) const FLAG_X8664_LIBX32: i32 = 0x0800;

/// Word size of the libraries an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordSize {
    Bits32,
    Bits64,
}

/// Architecture class encoded in the flag bits of a cache entry.
///
/// Only the classes a lookup can place into a result bucket are named;
/// everything else is [`Arch::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    I386,
    X86_64,
    X32,
    Ppc64le,
    Unsupported,
}

impl Arch {
    pub(crate) fn from_flags(flags: i32) -> Self {
        match flags & FLAG_ARCH_MASK {
            FLAG_ARCH_I386 => Arch::I386,
            FLAG_X8664_LIB64 => Arch::X86_64,
            FLAG_X8664_LIBX32 => Arch::X32,
            FLAG_POWERPC_LIB64 => Arch::Ppc64le,
            _ => Arch::Unsupported,
        }
    }

    /// Result bucket for this class, `None` when it has none.
    pub fn word_size(self) -> Option<WordSize> {
        match self {
            Arch::X86_64 | Arch::Ppc64le => Some(WordSize::Bits64),
            Arch::I386 | Arch::X32 => Some(WordSize::Bits32),
            Arch::Unsupported => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::I386 => "i386",
            Arch::X86_64 => "x86-64",
            Arch::X32 => "x32",
            Arch::Ppc64le => "ppc64le",
            Arch::Unsupported => "unsupported",
        })
    }
}

/// Decoded `glibc-ld.so.cache1.1` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 17],
    pub version: [u8; 3],
    pub nlibs: u32,
    pub table_size: u32,
    /// Reserved words, kept as read.
    pub reserved: [u32; 3],
    /// Alignment padding closing the header, kept as read.
    pub padding: u64,
}

/// One decoded entry of the current format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) flags: i32,
    pub(crate) arch: Arch,
    pub(crate) key: u32,
    pub(crate) value: u32,
    pub(crate) os_version: u32,
    pub(crate) hwcap: u64,
}

impl Entry {
    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);
        let flags = cursor.read_i32()?;
        Ok(Entry {
            flags,
            arch: Arch::from_flags(flags),
            key: cursor.read_u32()?,
            value: cursor.read_u32()?,
            os_version: cursor.read_u32()?,
            hwcap: cursor.read_u64()?,
        })
    }

    pub(crate) fn is_elf(&self) -> bool {
        (self.flags & FLAG_TYPE_MASK) & FLAG_TYPE_ELF != 0
    }
}

/// Everything the parser extracts from a cache buffer.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) header: Header,
    pub(crate) entries: Vec<Entry>,
    /// Offset of the current header; entry key/value offsets count from here.
    pub(crate) strings_base: usize,
    /// Entry count of a skipped legacy prefix.
    pub(crate) legacy_nlibs: Option<u32>,
}

/// Parse cache binary data
pub(crate) fn parse_cache(data: &[u8]) -> Result<Layout, Error> {
    let mut cursor = Cursor::new(data);

    let legacy_nlibs = if data.starts_with(LEGACY_MAGIC) {
        Some(skip_legacy(&mut cursor)?)
    } else {
        None
    };

    let strings_base = cursor.position();
    let header = read_header(&mut cursor)?;

    if header.magic != CACHE_MAGIC {
        return Err(Error::invalid("bad header magic"));
    }
    if header.version != CACHE_VERSION {
        return Err(Error::invalid(format!(
            "unsupported version {:?}",
            String::from_utf8_lossy(&header.version)
        )));
    }

    let table_len = (header.nlibs as usize)
        .checked_mul(ENTRY_SIZE)
        .ok_or_else(|| Error::invalid("entry count overflows"))?;
    let table = cursor.take(table_len)?;
    let entries = table
        .chunks_exact(ENTRY_SIZE)
        .map(Entry::decode)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Layout {
        header,
        entries,
        strings_base,
        legacy_nlibs,
    })
}

fn skip_legacy(cursor: &mut Cursor<'_>) -> Result<u32, Error> {
    cursor.skip(LEGACY_HEADER_SIZE - 4)?;
    let nlibs = cursor.read_u32()?;
    let entries_len = (nlibs as usize)
        .checked_mul(LEGACY_ENTRY_SIZE)
        .ok_or_else(|| Error::invalid("legacy entry count overflows"))?;
    cursor.skip(entries_len)?;
    cursor.align_to(HEADER_ALIGN)?;
    Ok(nlibs)
}

fn read_header(cursor: &mut Cursor<'_>) -> Result<Header, Error> {
    if cursor.remaining() < HEADER_SIZE {
        return Err(Error::invalid(format!(
            "header needs {} bytes, {} available",
            HEADER_SIZE,
            cursor.remaining()
        )));
    }
    Ok(Header {
        magic: cursor.read_array()?,
        version: cursor.read_array()?,
        nlibs: cursor.read_u32()?,
        table_size: cursor.read_u32()?,
        reserved: [cursor.read_u32()?, cursor.read_u32()?, cursor.read_u32()?],
        padding: cursor.read_u64()?,
    })
}

/// View of the string region entries point into.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bytes from `offset` to the end of the table, `None` past the end.
    pub(crate) fn tail(&self, offset: u32) -> Option<&'a [u8]> {
        self.data.get(offset as usize..)
    }

    /// NUL-terminated string at `offset`, without the terminator.
    pub(crate) fn c_str(&self, offset: u32) -> Option<&'a [u8]> {
        let tail = self.tail(offset)?;
        let end = tail.iter().position(|&b| b == 0)?;
        Some(&tail[..end])
    }
}
