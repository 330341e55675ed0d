pub mod download;
pub mod extract;
pub mod index;
