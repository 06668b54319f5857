use anyhow::Context;

use super::{BufferBackend, BufferKind, StreamingBuffer};

/// Uploads through `Queue::write_buffer` into a GPU buffer.
#[derive(Debug)]
pub struct WgpuBackend {
    buffer: wgpu::Buffer,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl BufferBackend for WgpuBackend {
    fn upload(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.queue.write_buffer(&self.buffer, 0, bytes);
    }
}

/// Keeps the last uploaded bytes in host memory.
#[derive(Debug, Default, Clone)]
pub struct HostBackend {
    contents: Vec<u8>,
    uploads: usize,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received by the most recent upload.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Number of completed map/unmap cycles.
    pub fn uploads(&self) -> usize {
        self.uploads
    }
}

impl BufferBackend for HostBackend {
    fn upload(&mut self, bytes: &[u8]) {
        self.contents.clear();
        self.contents.extend_from_slice(bytes);
        self.uploads += 1;
    }
}

impl StreamingBuffer<WgpuBackend> {
    /// Allocate a GPU buffer of `size` bytes that is rewritten every frame.
    ///
    /// Fails if the size is zero or larger than the device allows; there is
    /// no fallback to a smaller buffer.
    pub fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u64,
        kind: BufferKind,
        label: &str,
    ) -> anyhow::Result<Self> {
        let limits = device.limits();
        anyhow::ensure!(size > 0, "{label}: cannot allocate an empty streaming buffer");
        anyhow::ensure!(
            size <= limits.max_buffer_size,
            "{label}: {size} bytes exceed the device limit of {} bytes",
            limits.max_buffer_size
        );
        let max_binding = u64::from(limits.max_uniform_buffer_binding_size);
        if size > max_binding {
            log::warn!(
                "{label}: {size} bytes is larger than a single uniform binding \
                 ({max_binding} bytes)"
            );
        }
        let capacity = usize::try_from(size)
            .with_context(|| format!("{label}: {size} bytes do not fit host memory"))?;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: kind.usages(),
            mapped_at_creation: false,
        });
        log::info!("{label}: allocated {size} byte {kind:?} streaming buffer");

        Ok(StreamingBuffer::with_backend(
            label,
            capacity,
            WgpuBackend {
                buffer,
                queue: queue.clone(),
            },
        ))
    }

    /// The GPU buffer blocks are bound from.
    pub fn gpu_buffer(&self) -> &wgpu::Buffer {
        self.backend().buffer()
    }
}
