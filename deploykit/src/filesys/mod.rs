//! File system primitives

pub mod dir;
pub mod file;
pub mod link;
