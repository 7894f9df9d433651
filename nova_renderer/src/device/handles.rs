/// Opaque GPU object handles
///
/// Backends store their native handle as a `u64` (Vulkan: `vk::Handle::as_raw`).
/// The core only compares and copies them.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw backend handle
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw backend handle
            pub const fn as_raw(self) -> u64 {
                self.0
            }
        }
    };
}

define_handle!(
    /// Binary GPU-GPU signal (Vulkan semaphore)
    SemaphoreHandle
);

define_handle!(
    /// CPU-observable completion marker (Vulkan fence)
    FenceHandle
);

define_handle!(
    /// Prerecorded unit of GPU work
    CommandBufferHandle
);

define_handle!(
    /// Presentable image owned by the swapchain
    ImageHandle
);

define_handle!(
    /// View over a presentable image
    ImageViewHandle
);

/// Size of a 2D surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (minimized window)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
