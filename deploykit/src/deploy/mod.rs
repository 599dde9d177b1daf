//! Release lifecycle engine

pub mod catalog;
pub mod deployer;
pub mod git;
pub mod manager;
pub mod meta;
pub mod navigator;
pub mod pointer;
pub mod reconcile;
pub mod retention;
pub mod skeleton;
pub mod tag;

pub use manager::ReleaseManager;
