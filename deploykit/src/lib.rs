//! deploykit library
//!
//! Versioned releases under `<root>/releases/<tag>`, a `current` pointer,
//! per-release metadata, rollback, roll-forward, retention and an
//! idempotent `ensure`.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
