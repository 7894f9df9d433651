/// Frame module - frame pacing: slot pool, image tracker, submission, loop driver

// Module declarations
pub mod frame_slot;
pub mod images_in_flight;
pub mod submission;
pub mod frame_loop;

// Re-export everything
pub use frame_slot::{FrameSlot, FrameSlotPool, WaitPolicy};
pub use images_in_flight::ImagesInFlight;
pub use submission::SubmissionCoordinator;
pub use frame_loop::*;
