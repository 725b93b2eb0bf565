//! Core pack machinery: packing, the index, the virtual filesystem and the
//! on-disk archive

pub mod archive;
pub mod blob;
pub mod catalog;
pub mod compression;
pub mod extract;
pub mod mime;
pub mod packer;
pub mod path;
pub mod tag;
pub mod vfs;
