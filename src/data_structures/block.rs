/// A logical record inside a streaming buffer.
///
/// Blocks are only meaningful for the frame that wrote them; every frame
/// records fresh ones after the head reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    pub offset: wgpu::BufferAddress,
    pub size: wgpu::BufferAddress,
}

impl Block {
    /// One past the last byte of the block.
    pub fn end(&self) -> wgpu::BufferAddress {
        self.offset + self.size
    }
}
