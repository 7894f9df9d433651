/// Image-in-flight tracker - which slot last submitted work for each image

use crate::error::{Error, Result};
use crate::device::{GraphicsDevice, FenceHandle};
use crate::frame::frame_slot::{wait_for_marker, WaitPolicy};
use crate::engine_trace;

/// One entry per presentable image: empty, or the retired marker of the slot
/// that last submitted work for it
///
/// Entries are overwritten on every claim and never cleared on completion. The
/// whole table is reset only when the image set is rebuilt.
#[derive(Debug, Clone, Default)]
pub struct ImagesInFlight {
    entries: Vec<Option<FenceHandle>>,
}

impl ImagesInFlight {
    pub fn new(image_count: usize) -> Self {
        Self { entries: vec![None; image_count] }
    }

    /// Take ownership of `image_index` for the slot owning `slot_marker`
    ///
    /// Blocks until the previous user's marker is signaled when the entry holds a
    /// different marker. When it already holds `slot_marker`, the slot wait has
    /// just retired that work and the marker is freshly reset, so no wait happens.
    pub fn claim(
        &mut self,
        device: &dyn GraphicsDevice,
        image_index: u32,
        slot_marker: FenceHandle,
        policy: WaitPolicy,
    ) -> Result<()> {
        let count = self.entries.len();
        let entry = self
            .entries
            .get_mut(image_index as usize)
            .ok_or_else(|| Error::InvalidResource(format!(
                "image index {} out of range ({} images)", image_index, count
            )))?;

        if let Some(previous) = *entry {
            if previous != slot_marker {
                engine_trace!("nova::FrameLoop", "Image {} still in flight, waiting for previous user", image_index);
                wait_for_marker(device, previous, policy, &format!("image {}", image_index))?;
            }
        }

        *entry = Some(slot_marker);
        Ok(())
    }

    /// Resize to `image_count` empty entries
    pub fn reset(&mut self, image_count: usize) {
        self.entries.clear();
        self.entries.resize(image_count, None);
    }

    pub fn entry(&self, image_index: u32) -> Option<FenceHandle> {
        self.entries.get(image_index as usize).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty entries
    pub fn occupied_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }
}

#[cfg(test)]
#[path = "images_in_flight_tests.rs"]
mod tests;
