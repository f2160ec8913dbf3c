//! Repositories for database operations

pub mod gallery;
pub mod pic;
pub mod user;

pub use gallery::GalleryRepository;
pub use pic::PicRepository;
pub use user::UserRepository;
