//! Data models for the profile-picture pipeline
//!
//! Crop geometry, encoded buffers and descriptors, the typed user record and
//! the request/response bodies of the upload protocol.

mod crop;
mod image;
pub mod presigned_upload;
mod user;

// Re-export all models for convenient imports
pub use crop::*;
pub use image::*;
pub use presigned_upload::*;
pub use user::*;
