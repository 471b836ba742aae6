//! Workspace placeholder crate.
//!
//! Exposes feature flags that map to the individual workspace crates so that
//! host applications can depend on `encore-workspace` alone:
//!
//! - `desktop-shims` (default): the full [`core_service`] façade with the
//!   reqwest/tokio/SQLite desktop bridges.
//! - `engine-only`: just [`core_playback`], for hosts that inject every bridge.

#[cfg(feature = "desktop-shims")]
pub use core_service;

#[cfg(feature = "engine-only")]
pub use core_playback;
