/// CommandRecorder trait - prerecorded per-image work

use crate::error::Result;
use crate::device::{CommandBufferHandle, Extent2D, PresentableImage, SurfaceFormat};

/// Supplies one prerecorded unit of work per presentable image
///
/// Whatever the recorder creates depends on the image set, so it is torn down
/// before the swapchain is recreated and built again afterwards.
pub trait CommandRecorder: Send {
    /// Create and record the work for every image
    fn build(&mut self, images: &[PresentableImage], extent: Extent2D, format: SurfaceFormat) -> Result<()>;

    /// Work to submit for an image
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if `image_index` is out of range or nothing is built
    fn commands(&self, image_index: u32) -> Result<CommandBufferHandle>;

    /// Release everything created by `build` (no-op when nothing is built)
    fn destroy(&mut self);
}
