//! Bounds-checked access to guest linear memory.
//!
//! Capability functions never index the raw buffer. They go through a
//! [`MemoryView`] obtained from a [`GuestHeap`], and every out-of-range access
//! comes back as a [`HostError`] instead of a panic.

use std::ops::Range;
use wsvm_core::error::{HostError, HostResult};

/// Read/write window over the guest's linear memory bytes.
pub struct MemoryView<'a> {
    data: &'a mut [u8],
}

impl<'a> MemoryView<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn range(&self, ptr: u32, len: u64) -> Option<Range<usize>> {
        let start = ptr as u64;
        let end = start.checked_add(len)?;
        if end > self.data.len() as u64 {
            return None;
        }
        Some(start as usize..end as usize)
    }

    pub fn read(&self, ptr: u32, len: u32) -> HostResult<&[u8]> {
        let range = self
            .range(ptr, len as u64)
            .ok_or(HostError::ReadOutOfBounds {
                ptr,
                len,
                size: self.size(),
            })?;
        Ok(&self.data[range])
    }

    /// Fails unless `[ptr, ptr + len)` is writable.
    pub fn check_write(&self, ptr: u32, len: u64) -> HostResult<()> {
        self.range(ptr, len)
            .map(|_| ())
            .ok_or(HostError::WriteOutOfBounds {
                ptr,
                len,
                size: self.size(),
            })
    }

    pub fn write(&mut self, ptr: u32, bytes: &[u8]) -> HostResult<()> {
        let len = bytes.len() as u64;
        let range = self.range(ptr, len).ok_or(HostError::WriteOutOfBounds {
            ptr,
            len,
            size: self.size(),
        })?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u32_le(&self, ptr: u32) -> HostResult<u32> {
        let bytes = self.read(ptr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_u32_le(&mut self, ptr: u32, value: u32) -> HostResult<()> {
        self.write(ptr, &value.to_le_bytes())
    }
}

/// Guest memory together with the guest's exported allocator.
///
/// Allocation re-enters the guest and may grow memory, so a view must be
/// re-acquired after every [`GuestHeap::alloc`].
pub trait GuestHeap {
    fn memory(&mut self) -> HostResult<MemoryView<'_>>;

    /// Calls the guest allocator for `len` bytes and returns the address.
    fn alloc(&mut self, len: u32) -> HostResult<u32>;
}

/// Plain byte buffer with a bump allocator, standing in for a guest.
#[derive(Debug, Clone)]
pub struct VecHeap {
    data: Vec<u8>,
    next: u32,
    has_allocator: bool,
}

impl VecHeap {
    const DEFAULT_HEAP_BASE: u32 = 1024;

    pub fn new(size: usize) -> Self {
        let base = Self::DEFAULT_HEAP_BASE.min(size as u32 / 2);
        Self {
            data: vec![0; size],
            next: base.max(8),
            has_allocator: true,
        }
    }

    pub fn with_heap_base(mut self, base: u32) -> Self {
        self.next = base;
        self
    }

    /// Behaves like a guest that exports no `alloc`.
    pub fn without_allocator(mut self) -> Self {
        self.has_allocator = false;
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl GuestHeap for VecHeap {
    fn memory(&mut self) -> HostResult<MemoryView<'_>> {
        Ok(MemoryView::new(&mut self.data))
    }

    fn alloc(&mut self, len: u32) -> HostResult<u32> {
        if !self.has_allocator {
            return Err(HostError::AllocatorMissing);
        }
        let addr = self.next.checked_add(7).map(|n| n & !7).ok_or_else(|| {
            HostError::AllocFailed("heap exhausted".to_string())
        })?;
        let end = addr as u64 + len as u64;
        if end > self.data.len() as u64 {
            return Err(HostError::AllocFailed(format!(
                "cannot allocate {} bytes at {}",
                len, addr
            )));
        }
        self.next = end as u32;
        Ok(addr)
    }
}
