//! Variable-length framed SPSC byte ring.
//!
//! A single power-of-two byte buffer addressed by monotonic 64-bit
//! producer/consumer indices. Each record is a [`FrameHeader`] followed by
//! `len` body bytes, padded to 8-byte alignment. A frame is written
//! whole-or-not-at-all and published with a single release store on the
//! producer index, so a reader can never observe a torn frame. When a
//! frame would cross the physical end of the buffer the producer emits a
//! wrap record (`len == WRAP_LEN`) and restarts at offset zero; readers
//! skip wrap records transparently.

use std::cell::UnsafeCell;
use std::mem::size_of;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Frame alignment and header size in bytes.
pub const FRAME_ALIGN: u64 = 8;
const HEADER_LEN: u64 = size_of::<FrameHeader>() as u64;

/// Body-length sentinel marking a wrap record.
pub const WRAP_LEN: u32 = u32::MAX;

/// On-wire frame header: `(msg_type, entry count, body length)`.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy)]
#[repr(C)]
pub struct FrameHeader {
    pub msg_type: u16,
    pub count: u16,
    pub len: u32,
}

const fn align_up(len: u64) -> u64 {
    (len + FRAME_ALIGN - 1) & !(FRAME_ALIGN - 1)
}

struct Inner {
    buf: Box<[UnsafeCell<u8>]>,
    mask: u64,
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
}

unsafe impl Send for Inner {}
unsafe impl Sync for Inner {}

impl Inner {
    #[inline]
    fn capacity(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Copy `src` into the buffer at physical offset `offset`. The caller
    /// guarantees the range is owned by the producer and does not cross
    /// the buffer end.
    #[inline]
    unsafe fn write_bytes(&self, offset: u64, src: &[u8]) {
        debug_assert!(offset + src.len() as u64 <= self.capacity());
        let dst = self.buf[offset as usize].get();
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len()) };
    }

    /// Borrow `len` bytes at physical offset `offset`. The caller
    /// guarantees the range was published by the producer.
    #[inline]
    unsafe fn read_slice(&self, offset: u64, len: u64) -> &[u8] {
        debug_assert!(offset + len <= self.capacity());
        let ptr = self.buf[offset as usize].get() as *const u8;
        unsafe { std::slice::from_raw_parts(ptr, len as usize) }
    }
}

/// Producer half of a [`byte_ring`].
pub struct VarRingWriter {
    inner: Arc<Inner>,
}

/// Consumer half of a [`byte_ring`].
pub struct VarRingReader {
    inner: Arc<Inner>,
}

/// Create a framed byte ring of `capacity` bytes (a power of two, at
/// least 64).
///
/// # Panics
/// Panics on an invalid capacity.
pub fn byte_ring(capacity: usize) -> (VarRingWriter, VarRingReader) {
    assert!(
        capacity >= 64 && capacity.is_power_of_two(),
        "byte ring capacity must be a power of two >= 64, got {capacity}"
    );
    let buf = (0..capacity)
        .map(|_| UnsafeCell::new(0u8))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let inner = Arc::new(Inner {
        buf,
        mask: capacity as u64 - 1,
        head: CachePadded::new(AtomicU64::new(0)),
        tail: CachePadded::new(AtomicU64::new(0)),
    });
    (
        VarRingWriter {
            inner: Arc::clone(&inner),
        },
        VarRingReader { inner },
    )
}

impl VarRingWriter {
    /// Write one frame consisting of a fixed `meta` block followed by
    /// `entries`. Returns `false` without side effects when the frame
    /// does not fit; the caller drops or escalates.
    pub fn write_var<M, E>(&mut self, msg_type: u16, meta: &M, entries: &[E]) -> bool
    where
        M: IntoBytes + Immutable,
        E: IntoBytes + Immutable,
    {
        let body_len = size_of::<M>() as u64 + std::mem::size_of_val(entries) as u64;
        if body_len >= u64::from(WRAP_LEN) || entries.len() > usize::from(u16::MAX) {
            return false;
        }
        let frame_len = HEADER_LEN + align_up(body_len);

        let inner = &*self.inner;
        let capacity = inner.capacity();
        if frame_len > capacity {
            return false;
        }

        let head = inner.head.load(Ordering::Relaxed);
        let tail = inner.tail.load(Ordering::Acquire);
        let free = capacity - head.wrapping_sub(tail);

        let offset = head & inner.mask;
        let to_end = capacity - offset;

        let (frame_offset, advance) = if frame_len <= to_end {
            if frame_len > free {
                return false;
            }
            (offset, frame_len)
        } else {
            // Frame would cross the physical end: burn the remainder with
            // a wrap record and restart at offset zero.
            if to_end + frame_len > free {
                return false;
            }
            let wrap = FrameHeader {
                msg_type: 0,
                count: 0,
                len: WRAP_LEN,
            };
            unsafe { inner.write_bytes(offset, wrap.as_bytes()) };
            (0, to_end + frame_len)
        };

        let header = FrameHeader {
            msg_type,
            count: entries.len() as u16,
            len: body_len as u32,
        };
        unsafe {
            inner.write_bytes(frame_offset, header.as_bytes());
            inner.write_bytes(frame_offset + HEADER_LEN, meta.as_bytes());
            inner.write_bytes(
                frame_offset + HEADER_LEN + size_of::<M>() as u64,
                entries.as_bytes(),
            );
        }

        inner
            .head
            .store(head.wrapping_add(advance), Ordering::Release);
        true
    }
}

impl VarRingReader {
    /// Drain all published frames in FIFO order. The handler receives
    /// `(msg_type, count, body)`; the body borrow is only valid for the
    /// duration of the call. Returns the number of frames delivered.
    pub fn read<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(u16, u16, &[u8]),
    {
        let inner = &*self.inner;
        let capacity = inner.capacity();
        let mut delivered = 0usize;

        loop {
            let tail = inner.tail.load(Ordering::Relaxed);
            let head = inner.head.load(Ordering::Acquire);
            if tail == head {
                return delivered;
            }

            let offset = tail & inner.mask;
            let header_bytes = unsafe { inner.read_slice(offset, HEADER_LEN) };
            let header = FrameHeader::read_from_bytes(header_bytes)
                .expect("frame header is a fixed 8-byte POD");

            if header.len == WRAP_LEN {
                let skip = capacity - offset;
                inner.tail.store(tail.wrapping_add(skip), Ordering::Release);
                continue;
            }

            let body_len = u64::from(header.len);
            let body = unsafe { inner.read_slice(offset + HEADER_LEN, body_len) };
            handler(header.msg_type, header.count, body);

            let advance = HEADER_LEN + align_up(body_len);
            inner
                .tail
                .store(tail.wrapping_add(advance), Ordering::Release);
            delivered += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        let inner = &*self.inner;
        inner.head.load(Ordering::Acquire) == inner.tail.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy, PartialEq)]
    #[repr(C)]
    struct TestMeta {
        a: u64,
        b: u64,
    }

    #[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy, PartialEq)]
    #[repr(C)]
    struct TestEntry {
        price: i64,
        qty: i64,
    }

    fn entry(price: i64, qty: i64) -> TestEntry {
        TestEntry { price, qty }
    }

    #[test]
    fn frames_round_trip_in_order() {
        let (mut w, mut r) = byte_ring(1024);
        let meta = TestMeta { a: 7, b: 9 };
        assert!(w.write_var(2, &meta, &[entry(1, 10), entry(2, 20)]));
        assert!(w.write_var(3, &meta, &[entry(3, 30)]));

        let mut seen = Vec::new();
        let n = r.read(|msg_type, count, body| {
            let (m, rest) = TestMeta::read_from_prefix(body).unwrap();
            assert_eq!(m, meta);
            let mut entries = Vec::new();
            for chunk in rest.chunks_exact(size_of::<TestEntry>()) {
                entries.push(TestEntry::read_from_bytes(chunk).unwrap());
            }
            seen.push((msg_type, count, entries));
        });
        assert_eq!(n, 2);
        assert_eq!(seen[0].0, 2);
        assert_eq!(seen[0].1, 2);
        assert_eq!(seen[0].2, vec![entry(1, 10), entry(2, 20)]);
        assert_eq!(seen[1].0, 3);
        assert_eq!(seen[1].2, vec![entry(3, 30)]);
        assert!(r.is_empty());
    }

    #[test]
    fn overflow_returns_false_without_corruption() {
        let (mut w, mut r) = byte_ring(128);
        let meta = TestMeta { a: 1, b: 2 };
        let entries = [entry(0, 0); 4]; // 8 + 16 + 64 = 88 bytes per frame
        assert!(w.write_var(1, &meta, &entries));
        assert!(!w.write_var(1, &meta, &entries));
        assert_eq!(r.read(|_, _, _| {}), 1);
        assert!(w.write_var(1, &meta, &entries));
    }

    #[test]
    fn wraparound_is_transparent() {
        let (mut w, mut r) = byte_ring(256);
        let meta = TestMeta { a: 0, b: 0 };
        // Frames of 8 + 16 + 32 = 56 -> padded 56; drive the indices past
        // the physical end several times.
        let entries = [entry(5, 5), entry(6, 6)];
        let mut written = 0u64;
        let mut read_back = 0u64;
        for _ in 0..40 {
            if w.write_var(4, &meta, &entries) {
                written += 1;
            }
            read_back += r.read(|msg_type, count, body| {
                assert_eq!(msg_type, 4);
                assert_eq!(count, 2);
                assert_eq!(body.len(), size_of::<TestMeta>() + 2 * size_of::<TestEntry>());
            }) as u64;
        }
        read_back += r.read(|_, _, _| {}) as u64;
        assert_eq!(written, read_back);
        assert!(written >= 35, "ring should accept nearly every frame");
    }

    #[test]
    fn empty_body_frame() {
        let (mut w, mut r) = byte_ring(64);
        let meta = TestMeta { a: 42, b: 0 };
        let none: [TestEntry; 0] = [];
        assert!(w.write_var(9, &meta, &none));
        let n = r.read(|msg_type, count, body| {
            assert_eq!(msg_type, 9);
            assert_eq!(count, 0);
            let (m, rest) = TestMeta::read_from_prefix(body).unwrap();
            assert_eq!(m.a, 42);
            assert!(rest.is_empty());
        });
        assert_eq!(n, 1);
    }
}
