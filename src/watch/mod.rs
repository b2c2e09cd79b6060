// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the `[[watch]]` rules of the config.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Content hashing, so that events which do not change a file's bytes
//!   (duplicate save events, rebuilt outputs) are ignored.
//!
//! It does not run anything itself; it only turns filesystem changes into
//! runtime events.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use cache::FileCache;
pub use patterns::{collect_matching_files, rules_from_config, WatchRule};
pub use watcher::{spawn_watcher, WatcherHandle};
