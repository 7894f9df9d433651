/// Swapchain trait - for window presentation

use crate::error::Result;
use crate::device::{Extent2D, ImageHandle, ImageViewHandle, SemaphoreHandle};

/// Pixel format of the presentable images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum SurfaceFormat {
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
}

/// One presentable image and its view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentableImage {
    /// Position in the swapchain's ordered image sequence
    pub index: u32,
    pub image: ImageHandle,
    pub view: ImageViewHandle,
}

/// Result of a successful acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    pub image_index: u32,
    /// The surface no longer matches exactly; presentation still works
    pub suboptimal: bool,
}

/// Result of a successful presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Optimal,
    Suboptimal,
}

/// Swapchain for presenting rendered images to a window
///
/// Owns the presentable images exclusively; everything else refers to them by index.
pub trait Swapchain: Send {
    /// Acquire the next available image index
    ///
    /// `signal` is raised asynchronously once the image is actually free.
    ///
    /// # Errors
    ///
    /// `Error::SurfaceOutOfDate` (recreate and retry next frame), `Error::SurfaceLost` (fatal)
    fn acquire_next_image(&mut self, signal: SemaphoreHandle) -> Result<AcquiredImage>;

    /// Present an image once `wait_on` is signaled
    ///
    /// # Arguments
    ///
    /// * `image_index` - Index of the image to present (from acquire_next_image)
    /// * `wait_on` - Semaphore signaled when rendering into the image is finished
    fn present(&mut self, image_index: u32, wait_on: SemaphoreHandle) -> Result<PresentStatus>;

    /// Rebuild the whole image set at a new size
    ///
    /// # Arguments
    ///
    /// * `width` - New width in pixels
    /// * `height` - New height in pixels
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Current presentable images, ordered by index
    fn images(&self) -> &[PresentableImage];

    /// Get the number of images in the swapchain
    fn image_count(&self) -> usize {
        self.images().len()
    }

    /// Size of the presentable images
    fn extent(&self) -> Extent2D;

    /// Get the pixel format of the swapchain images
    fn format(&self) -> SurfaceFormat;
}
