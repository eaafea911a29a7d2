//! Byte marshaling across the host/guest boundary.
//!
//! Two string encodings meet here and stay separate:
//!
//! - **ABI strings**: UTF-8 bytes addressed by an explicit `(ptr, len)` pair.
//!   Every `ws_*` capability uses these.
//! - **Diagnostic strings**: UTF-16LE units whose byte length sits in the
//!   4 bytes just before `ptr`. Only the guest toolchain's `abort` uses them.
//!
//! Host-to-guest values are written into memory obtained from the guest
//! allocator and announced through a pointer/size pair.

use crate::memory::{GuestHeap, MemoryView};
use std::char::REPLACEMENT_CHARACTER;
use wsvm_core::error::{HostError, HostResult};

/// Units decoded per step by [`decode_diagnostic_string`].
pub const DIAGNOSTIC_CHUNK_UNITS: usize = 1024;

/// A host-computed value headed for guest memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostValue {
    /// Encoded as UTF-8.
    Text(String),
    Bytes(Vec<u8>),
}

impl HostValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            HostValue::Text(s) => s.as_bytes(),
            HostValue::Bytes(b) => b,
        }
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Text(s)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(b: Vec<u8>) -> Self {
        HostValue::Bytes(b)
    }
}

/// Guest `i32` pointers and lengths are unsigned 32-bit addresses.
pub fn guest_u32(value: i32) -> u32 {
    value as u32
}

pub fn decode_utf8(memory: &MemoryView<'_>, ptr: u32, len: u32) -> HostResult<String> {
    let bytes = memory.read(ptr, len)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| HostError::InvalidUtf8 { ptr, len })
}

/// Decodes a length-prefixed UTF-16 string. A null `ptr` yields `None`.
pub fn decode_diagnostic_string(memory: &MemoryView<'_>, ptr: u32) -> HostResult<Option<String>> {
    decode_diagnostic_string_chunked(memory, ptr, DIAGNOSTIC_CHUNK_UNITS)
}

/// Same as [`decode_diagnostic_string`] with an explicit chunk size.
///
/// Output does not depend on `chunk_units`: a high surrogate that ends a
/// chunk is held back and decoded with the next one.
pub fn decode_diagnostic_string_chunked(
    memory: &MemoryView<'_>,
    ptr: u32,
    chunk_units: usize,
) -> HostResult<Option<String>> {
    if ptr == 0 {
        return Ok(None);
    }
    let header = ptr.checked_sub(4).ok_or(HostError::ReadOutOfBounds {
        ptr,
        len: 4,
        size: memory.size(),
    })?;
    let byte_len = memory.read_u32_le(header)?;
    let units = byte_len / 2;
    let bytes = memory.read(ptr, units * 2)?;

    let chunk_units = chunk_units.max(1);
    let mut out = String::with_capacity(units as usize);
    let mut buf: Vec<u16> = Vec::with_capacity(chunk_units + 1);
    let mut carry: Option<u16> = None;

    for chunk in bytes.chunks(chunk_units * 2) {
        buf.clear();
        buf.extend(carry.take());
        buf.extend(
            chunk
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
        );
        if buf.last().is_some_and(|&unit| is_high_surrogate(unit)) {
            carry = buf.pop();
        }
        out.extend(
            char::decode_utf16(buf.iter().copied()).map(|r| r.unwrap_or(REPLACEMENT_CHARACTER)),
        );
    }
    if carry.is_some() {
        out.push(REPLACEMENT_CHARACTER);
    }
    Ok(Some(out))
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

/// Allocates `bytes.len()` bytes in the guest and copies `bytes` there.
pub fn write_guest_allocated<H>(heap: &mut H, bytes: &[u8]) -> HostResult<u32>
where
    H: GuestHeap + ?Sized,
{
    let len = u32::try_from(bytes.len())
        .map_err(|_| HostError::AllocFailed(format!("{} bytes exceed guest address space", bytes.len())))?;
    let addr = heap.alloc(len)?;
    if addr == 0 {
        return Err(HostError::AllocFailed("allocator returned null".to_string()));
    }
    heap.memory()?.write(addr, bytes)?;
    Ok(addr)
}

fn check_output_slot(memory: &MemoryView<'_>, ptr: u32) -> HostResult<()> {
    memory
        .check_write(ptr, 4)
        .map_err(|_| HostError::OutputSlotOutOfBounds {
            ptr,
            size: memory.size(),
        })
}

/// Writes `(address, len)` as two LE `u32`s. Writes nothing unless both
/// output slots are in bounds.
pub fn write_pointer_size_pair(
    memory: &mut MemoryView<'_>,
    out_addr_ptr: u32,
    out_size_ptr: u32,
    address: u32,
    len: u32,
) -> HostResult<()> {
    check_output_slot(memory, out_addr_ptr)?;
    check_output_slot(memory, out_size_ptr)?;
    memory.write_u32_le(out_addr_ptr, address)?;
    memory.write_u32_le(out_size_ptr, len)?;
    Ok(())
}

/// Allocate, copy and announce: how every capability returns data.
///
/// The output slots are checked before the guest allocator runs, so a bad
/// slot address costs no allocation.
pub fn copy_host_value_to_guest<H>(
    heap: &mut H,
    value: &HostValue,
    out_addr_ptr: u32,
    out_size_ptr: u32,
) -> HostResult<u32>
where
    H: GuestHeap + ?Sized,
{
    {
        let memory = heap.memory()?;
        check_output_slot(&memory, out_addr_ptr)?;
        check_output_slot(&memory, out_size_ptr)?;
    }
    let bytes = value.as_bytes();
    let addr = write_guest_allocated(heap, bytes)?;
    write_pointer_size_pair(
        &mut heap.memory()?,
        out_addr_ptr,
        out_size_ptr,
        addr,
        bytes.len() as u32,
    )?;
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VecHeap;

    fn utf16_string_at(heap: &mut VecHeap, ptr: u32, units: &[u16]) {
        let mut view = heap.memory().unwrap();
        view.write_u32_le(ptr - 4, (units.len() * 2) as u32).unwrap();
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        view.write(ptr, &bytes).unwrap();
    }

    #[test]
    fn utf8_round_trip_through_guest() {
        let mut heap = VecHeap::new(4096);
        let text = "héllo wörld ✓";
        let addr = copy_host_value_to_guest(&mut heap, &HostValue::from(text), 8, 12).unwrap();

        let view = heap.memory().unwrap();
        assert_eq!(view.read_u32_le(8).unwrap(), addr);
        assert_eq!(view.read_u32_le(12).unwrap() as usize, text.len());
        let decoded = decode_utf8(&view, addr, text.len() as u32).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn raw_bytes_copy_verbatim() {
        let mut heap = VecHeap::new(4096);
        let payload = vec![0u8, 0xff, 0x10, 0x80];
        let addr = copy_host_value_to_guest(&mut heap, &HostValue::from(payload.clone()), 0, 4).unwrap();
        let view = heap.memory().unwrap();
        assert_eq!(view.read(addr, 4).unwrap(), payload.as_slice());
    }

    #[test]
    fn invalid_utf8_is_a_decode_failure() {
        let mut heap = VecHeap::new(64);
        heap.bytes_mut()[0..2].copy_from_slice(&[0xc3, 0x28]);
        let view = heap.memory().unwrap();
        let err = decode_utf8(&view, 0, 2).unwrap_err();
        assert_eq!(err, HostError::InvalidUtf8 { ptr: 0, len: 2 });
        assert!(decode_utf8(&view, 60, 8).is_err());
    }

    #[test]
    fn pointer_pair_round_trip() {
        let mut heap = VecHeap::new(32);
        for (addr, len) in [(0u32, 0u32), (1, 2), (u32::MAX, u32::MAX), (0x1234_5678, 9)] {
            let mut view = heap.memory().unwrap();
            write_pointer_size_pair(&mut view, 20, 28, addr, len).unwrap();
            assert_eq!(view.read_u32_le(20).unwrap(), addr);
            assert_eq!(view.read_u32_le(28).unwrap(), len);
        }
    }

    #[test]
    fn pointer_pair_out_of_bounds_writes_nothing() {
        let mut heap = VecHeap::new(32);
        let mut view = heap.memory().unwrap();
        let err = write_pointer_size_pair(&mut view, 0, 29, 7, 7).unwrap_err();
        assert!(matches!(err, HostError::OutputSlotOutOfBounds { ptr: 29, .. }));
        assert_eq!(view.read_u32_le(0).unwrap(), 0);
    }

    #[test]
    fn bad_output_slot_skips_allocation() {
        let mut heap = VecHeap::new(256).with_heap_base(64);
        let before = heap.bytes().to_vec();
        let err = copy_host_value_to_guest(&mut heap, &HostValue::from("abc"), 0, 1000).unwrap_err();
        assert_eq!(err.status(), wsvm_core::status::StatusCode::HostInternal);
        assert_eq!(heap.bytes(), before.as_slice());
        // Allocator was not consumed.
        assert_eq!(heap.alloc(1).unwrap(), 64);
    }

    #[test]
    fn missing_allocator_fails_to_vm() {
        let mut heap = VecHeap::new(64).without_allocator();
        let err = copy_host_value_to_guest(&mut heap, &HostValue::from("x"), 0, 4).unwrap_err();
        assert_eq!(err.status(), wsvm_core::status::StatusCode::TransDataToVMFailed);
    }

    #[test]
    fn diagnostic_string_decodes() {
        let mut heap = VecHeap::new(256);
        let units: Vec<u16> = "abort!".encode_utf16().collect();
        utf16_string_at(&mut heap, 64, &units);
        let view = heap.memory().unwrap();
        assert_eq!(decode_diagnostic_string(&view, 64).unwrap().as_deref(), Some("abort!"));
        assert_eq!(decode_diagnostic_string(&view, 0).unwrap(), None);
        assert!(decode_diagnostic_string(&view, 2).is_err());
    }

    #[test]
    fn diagnostic_chunking_is_idempotent() {
        let text = "a😀b\u{10348}c".repeat(7);
        let mut units: Vec<u16> = text.encode_utf16().collect();
        // Lone surrogates on both sides.
        units.insert(3, 0xDC00);
        units.push(0xD800);

        let mut heap = VecHeap::new(1024);
        utf16_string_at(&mut heap, 16, &units);
        let view = heap.memory().unwrap();

        let whole = decode_diagnostic_string_chunked(&view, 16, units.len()).unwrap();
        for chunk in 1..=units.len() {
            let chunked = decode_diagnostic_string_chunked(&view, 16, chunk).unwrap();
            assert_eq!(chunked, whole, "chunk size {}", chunk);
        }
        let expected: String = char::decode_utf16(units.iter().copied())
            .map(|r| r.unwrap_or(REPLACEMENT_CHARACTER))
            .collect();
        assert_eq!(whole.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn diagnostic_length_beyond_memory_fails() {
        let mut heap = VecHeap::new(64);
        heap.memory().unwrap().write_u32_le(12, 1000).unwrap();
        let view = heap.memory().unwrap();
        assert!(decode_diagnostic_string(&view, 16).is_err());
    }
}
