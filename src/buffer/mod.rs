//! Streaming uniform buffers.
//!
//! A [`StreamingBuffer`] is a fixed-capacity region that is rewritten from
//! offset zero every frame. Writes happen through a [`Mapping`], a scoped
//! guard obtained with [`StreamingBuffer::map_for_write`]: it resets the head,
//! hands out aligned appends and uploads the written range when it is
//! unmapped or dropped, so an early return can never leave the buffer mapped.
//!
//! The bytes are staged host side and handed to a [`BufferBackend`] on unmap.
//! [`WgpuBackend`] forwards them to the GPU through the queue, [`HostBackend`]
//! keeps a host copy which is what the CPU-only tests decode.

pub mod backend;
pub mod layout;

pub use backend::{HostBackend, WgpuBackend};

use crate::error::StreamError;

/// Returns `true` for 1, 2, 4, 8, ...
pub fn is_power_of_two(value: u64) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Rounds `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
pub fn align(value: u64, alignment: u64) -> Result<u64, StreamError> {
    if !is_power_of_two(alignment) {
        return Err(StreamError::InvalidAlignment(alignment));
    }
    let mask = alignment - 1;
    value
        .checked_add(mask)
        .map(|v| v & !mask)
        .ok_or(StreamError::CapacityExceeded {
            head: value,
            requested: alignment,
            capacity: u64::MAX,
        })
}

/// What the GPU side of a streaming buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Uniform,
}

impl BufferKind {
    /// Usage flags for a buffer that the CPU rewrites every frame.
    ///
    /// `COPY_SRC` lets the written blocks be copied out and checked.
    pub fn usages(&self) -> wgpu::BufferUsages {
        match self {
            BufferKind::Uniform => {
                wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC
            }
        }
    }
}

/// Receives the bytes of a mapping when it is closed.
pub trait BufferBackend {
    /// Called once per unmap with everything written since the matching map,
    /// starting at offset zero.
    fn upload(&mut self, bytes: &[u8]);
}

/// A linear, alignment-aware writer over a fixed-capacity buffer.
///
/// Invariant: `head <= capacity`. Writes that would break it are rejected
/// with [`StreamError::CapacityExceeded`] and leave the head where it was.
#[derive(Debug)]
pub struct StreamingBuffer<B: BufferBackend = WgpuBackend> {
    label: String,
    capacity: u64,
    head: u64,
    staging: Vec<u8>,
    backend: B,
}

impl<B: BufferBackend> StreamingBuffer<B> {
    /// Wrap `backend` with a staging area of `capacity` bytes.
    pub fn with_backend(label: &str, capacity: usize, backend: B) -> Self {
        Self {
            label: label.to_string(),
            capacity: capacity as u64,
            head: 0,
            staging: vec![0; capacity],
            backend,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Head at the end of the most recent mapping.
    pub fn head(&self) -> u64 {
        self.head
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The bytes written during the most recent mapping.
    pub fn written(&self) -> &[u8] {
        &self.staging[..self.head as usize]
    }

    /// Open the buffer for this frame's writes and reset the head to zero.
    ///
    /// The returned guard borrows the buffer mutably, so there is never more
    /// than one writer.
    pub fn map_for_write(&mut self) -> Mapping<'_, B> {
        self.head = 0;
        Mapping {
            buffer: self,
            open: true,
        }
    }
}

/// Scoped write access to a [`StreamingBuffer`].
///
/// Dropping the guard unmaps it, uploading whatever was written.
#[derive(Debug)]
pub struct Mapping<'a, B: BufferBackend> {
    buffer: &'a mut StreamingBuffer<B>,
    open: bool,
}

impl<'a, B: BufferBackend> Mapping<'a, B> {
    pub fn head(&self) -> u64 {
        self.buffer.head
    }

    pub fn capacity(&self) -> u64 {
        self.buffer.capacity
    }

    /// Advance the head to the next multiple of `alignment`.
    ///
    /// Skipped bytes are zeroed so that identical input always produces
    /// identical buffer contents.
    pub fn align_head(&mut self, alignment: u64) -> Result<u64, StreamError> {
        let head = self.buffer.head;
        let aligned = align(head, alignment)?;
        if aligned > self.buffer.capacity {
            return Err(StreamError::CapacityExceeded {
                head,
                requested: aligned - head,
                capacity: self.buffer.capacity,
            });
        }
        self.buffer.staging[head as usize..aligned as usize].fill(0);
        self.buffer.head = aligned;
        Ok(aligned)
    }

    /// Align the head, copy `data` there and advance past it.
    ///
    /// Returns the offset the data was written at. This is the only write
    /// primitive, the typed helpers in [`layout`] are built on it.
    pub fn push_aligned_data(&mut self, data: &[u8], alignment: u64) -> Result<u64, StreamError> {
        let head = self.buffer.head;
        let start = align(head, alignment)?;
        let size = data.len() as u64;
        let end = start
            .checked_add(size)
            .filter(|end| *end <= self.buffer.capacity)
            .ok_or(StreamError::CapacityExceeded {
                head,
                requested: (start - head).saturating_add(size),
                capacity: self.buffer.capacity,
            })?;
        let staging = &mut self.buffer.staging;
        staging[head as usize..start as usize].fill(0);
        staging[start as usize..end as usize].copy_from_slice(data);
        self.buffer.head = end;
        Ok(start)
    }

    /// Close the mapping and upload the written range. Returns the final head.
    pub fn unmap(mut self) -> u64 {
        self.flush();
        self.buffer.head
    }

    fn flush(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let written = self.buffer.head as usize;
        let StreamingBuffer {
            staging, backend, ..
        } = &mut *self.buffer;
        backend.upload(&staging[..written]);
        log::trace!("{}: unmapped {} bytes", self.buffer.label, written);
    }
}

impl<'a, B: BufferBackend> Drop for Mapping<'a, B> {
    fn drop(&mut self) {
        self.flush();
    }
}
