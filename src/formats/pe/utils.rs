//! Utility functions for PE parsing

use crate::formats::pe::types::{PeError, Result};

/// Extension trait for reading little-endian primitives from byte slices.
///
/// Every accessor is bounds-checked and returns `None` instead of panicking,
/// including when `offset + width` would overflow.
pub trait ReadExt {
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.read_slice_at(offset, 2)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.read_slice_at(offset, 4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.get(offset..end)
    }
}

/// Align a value up to the specified power-of-two alignment.
///
/// Returns `None` on overflow.
#[inline(always)]
pub fn align_up(value: usize, alignment: usize) -> Option<usize> {
    if alignment == 0 {
        return Some(value);
    }
    value
        .checked_add(alignment - 1)
        .map(|v| v & !(alignment - 1))
}

/// Ensure `offset..offset + size` lies within `data_len`, reporting a truncated header otherwise.
#[inline(always)]
pub fn check_bounds(offset: usize, size: usize, data_len: usize) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= data_len => Ok(()),
        Some(end) => Err(PeError::TruncatedHeader {
            expected: end,
            actual: data_len,
        }),
        None => Err(PeError::TruncatedHeader {
            expected: usize::MAX,
            actual: data_len,
        }),
    }
}
