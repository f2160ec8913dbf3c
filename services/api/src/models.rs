//! API service models

pub mod gallery;
pub mod pic;
pub mod user;

// Re-export for convenience
pub use gallery::{Gallery, GalleryPayload};
pub use pic::{NewPic, Pic};
pub use user::{NewUser, SignupRequest, User};
