//! Data models

pub mod release;
