//! Bounds-checked reader over an untrusted byte buffer.
//!
//! Every read checks the remaining length first and fails with
//! [`Error::InvalidFormat`] instead of reading past the end.

use crate::Error;

#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `len` bytes and advance past them.
    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::invalid(format!(
                    "truncated: need {} bytes at offset {}, {} available",
                    len,
                    self.pos,
                    self.remaining()
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.take(len).map(|_| ())
    }

    /// Advance to the next multiple of `align`, which must be a power of two.
    pub(crate) fn align_to(&mut self, align: usize) -> Result<(), Error> {
        debug_assert!(align.is_power_of_two());
        let padding = self.pos.wrapping_neg() & (align - 1);
        self.skip(padding)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, Error> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, Error> {
        self.read_array().map(u64::from_le_bytes)
    }
}
