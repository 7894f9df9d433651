/// VertexBuffer - host-visible vertex data backed by gpu-allocator

use nova_renderer::nova::{Error, Result};
use nova_renderer::{engine_err, engine_error, engine_warn};
use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;

/// Vertex buffer filled once at creation
///
/// Memory is CPU-writable and GPU-readable, so the upload is a plain copy into
/// the mapped allocation with no staging buffer.
pub struct VertexBuffer {
    context: Arc<VulkanContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    vertex_count: u32,
}

impl VertexBuffer {
    /// Create a buffer holding `data` (tightly packed vertices)
    ///
    /// # Arguments
    ///
    /// * `context` - Shared Vulkan state (device and allocator)
    /// * `data` - Vertex bytes
    /// * `vertex_count` - Number of vertices in `data`
    pub fn new(context: Arc<VulkanContext>, data: &[u8], vertex_count: u32) -> Result<Self> {
        if data.is_empty() {
            engine_error!("nova::vulkan", "Refusing to create an empty vertex buffer");
            return Err(Error::InvalidResource("Vertex buffer needs at least one byte".to_string()));
        }
        let size = data.len() as u64;

        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { context.device.create_buffer(&create_info, None) }
            .map_err(|e| engine_err!("nova::vulkan", "Failed to create vertex buffer of {} bytes: {:?}", size, e))?;

        // From here on Drop releases whatever was created
        let mut vertex_buffer = Self { context, buffer, allocation: None, size, vertex_count };

        let requirements = unsafe { vertex_buffer.context.device.get_buffer_memory_requirements(buffer) };
        let allocation = vertex_buffer.context.allocator()
            .allocate(&AllocationCreateDesc {
                name: "vertex buffer",
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                engine_error!("nova::vulkan", "Out of GPU memory for vertex buffer ({} bytes): {:?}", requirements.size, e);
                Error::OutOfMemory
            })?;
        let allocation = vertex_buffer.allocation.insert(allocation);

        unsafe {
            vertex_buffer.context.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("nova::vulkan", "Failed to bind vertex buffer memory: {:?}", e))?;
        }

        let mapped = allocation.mapped_slice_mut().ok_or_else(|| {
            engine_error!("nova::vulkan", "Vertex buffer memory is not host-visible");
            Error::BackendError("Vertex buffer memory is not mapped".to_string())
        })?;
        mapped[..data.len()].copy_from_slice(data);

        Ok(vertex_buffer)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            if let Err(e) = self.context.allocator().free(allocation) {
                engine_warn!("nova::vulkan", "Failed to free vertex buffer memory: {:?}", e);
            }
        }
        unsafe {
            self.context.device.destroy_buffer(self.buffer, None);
        }
    }
}
