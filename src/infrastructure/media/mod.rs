//! Media infrastructure module
//!
//! Local storage for uploaded avatars and image upload checks.

mod storage;
mod upload;

pub use storage::{LocalMediaStorage, MediaStorage, MAX_MEDIA_NAME_LEN};
#[cfg(test)]
pub(crate) use upload::sample_png;
pub use upload::{decode_image, is_valid_image, INVALID_IMAGE_MESSAGE};
