//! Workspace umbrella crate.
//!
//! Exposes the player service behind feature flags so host applications can
//! depend on `streamplay-workspace` alone. With the default `desktop-shims`
//! feature, `core_service::bootstrap_desktop` wires the desktop bridges into a
//! ready [`PlayerService`](core_service::PlayerService).

#[cfg(feature = "desktop-shims")]
pub use core_service;
