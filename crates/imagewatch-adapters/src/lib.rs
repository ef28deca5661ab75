//! Imagewatch Adapters - Filesystem host for imagewatch.
//!
//! This crate provides adapters for:
//! - A document built from files and directories
//! - A proxy loader that decodes images on worker threads
//! - A wall-clock event loop driving timers and decode completions

pub mod event_loop;
pub mod fs;
pub mod loader;

pub use event_loop::EventLoop;
pub use fs::{is_supported_image, FsDocument};
pub use loader::{decode_dimensions, DecodeLoader, IoSource};
