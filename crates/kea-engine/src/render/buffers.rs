//! Typed CPU arrays mirrored into wgpu buffers.
//!
//! The CPU side is always authoritative; GPU buffers are (re)created lazily on
//! upload and grow to the next power of two.

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::paint::Color;

/// Index pattern of one quad: two triangles over corners TL, TR, BR, BL.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Indices for `quads` quads: `QUAD_INDICES + 4·i` for each quad `i`.
///
/// `quads` must not exceed [`MAX_QUADS`](super::MAX_QUADS).
pub fn generate_indices(quads: usize) -> Vec<u16> {
    let mut out = Vec::with_capacity(quads * 6);
    for i in 0..quads {
        let base = (i * 4) as u16;
        out.extend(QUAD_INDICES.iter().map(|&k| base + k));
    }
    out
}

/// Per-vertex colors of one quad: `color` on each of its 4 corners.
#[inline]
pub fn generate_colors(color: Color) -> [[f32; 4]; 4] {
    [color.to_array(); 4]
}

/// Dynamic vertex attribute array.
#[derive(Debug)]
pub struct ArrayBuffer<T: Pod> {
    label: &'static str,
    items: Vec<T>,
    buffer: Option<wgpu::Buffer>,
    capacity: usize,
}

impl<T: Pod> ArrayBuffer<T> {
    pub fn new(label: &'static str) -> Self {
        Self { label, items: Vec::new(), buffer: None, capacity: 0 }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    #[inline]
    pub fn extend_from_slice(&mut self, items: &[T]) {
        self.items.extend_from_slice(items);
    }

    #[inline]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// GPU buffer as of the last upload.
    #[inline]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Bytes written by the last upload.
    #[inline]
    pub fn byte_len(&self) -> u64 {
        std::mem::size_of_val(self.items.as_slice()) as u64
    }

    /// Writes the CPU items into the GPU buffer, growing it first if needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.items.is_empty() {
            return;
        }
        self.ensure_capacity(device, self.items.len());
        let Some(buffer) = self.buffer.as_ref() else { return };
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&self.items));
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.capacity && self.buffer.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(64);
        log::debug!("{}: growing vertex buffer to {new_cap} items", self.label);

        self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: (new_cap * std::mem::size_of::<T>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.capacity = new_cap;
    }
}

/// Static quad index buffer, regenerated only when the quad capacity grows.
#[derive(Debug, Default)]
pub struct ElementArrayBuffer {
    indices: Vec<u16>,
    quads: usize,
    buffer: Option<wgpu::Buffer>,
    stale: bool,
}

impl ElementArrayBuffer {
    pub fn new(quads: usize) -> Self {
        Self { indices: generate_indices(quads), quads, buffer: None, stale: true }
    }

    /// Makes room for `quads` quads. Never shrinks.
    pub fn reserve(&mut self, quads: usize) {
        if quads <= self.quads {
            return;
        }
        self.indices = generate_indices(quads);
        self.quads = quads;
        self.stale = true;
    }

    #[inline]
    pub fn quads(&self) -> usize {
        self.quads
    }

    #[inline]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    #[inline]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Creates the GPU index buffer if it is missing or out of date.
    pub fn upload(&mut self, device: &wgpu::Device) {
        if !self.stale && self.buffer.is_some() {
            return;
        }
        self.buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kea quad ibo"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        }));
        self.stale = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MAX_QUADS;

    #[test]
    fn indices_follow_quad_pattern() {
        assert_eq!(generate_indices(2), vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn indices_reach_u16_limit() {
        let idx = generate_indices(MAX_QUADS);
        assert_eq!(idx.len(), MAX_QUADS * 6);
        assert_eq!(idx.iter().copied().max(), Some(u16::MAX));
    }

    #[test]
    fn colors_repeat_per_corner() {
        let c = Color::from_premul(0.5, 0.0, 0.25, 0.5);
        assert_eq!(generate_colors(c), [[0.5, 0.0, 0.25, 0.5]; 4]);
    }

    #[test]
    fn element_buffer_never_shrinks() {
        let mut ibo = ElementArrayBuffer::new(10);
        ibo.reserve(4);
        assert_eq!(ibo.quads(), 10);
        ibo.reserve(20);
        assert_eq!(ibo.indices().len(), 120);
    }

    #[test]
    fn array_buffer_clears_cpu_side() {
        let mut buf: ArrayBuffer<[f32; 2]> = ArrayBuffer::new("test");
        buf.push([1.0, 2.0]);
        buf.extend_from_slice(&[[3.0, 4.0]]);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.byte_len(), 16);
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.buffer().is_none());
    }
}
