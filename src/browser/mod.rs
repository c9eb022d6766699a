//! Browser acquisition module.
//!
//! Everything needed to obtain a local browser with an open CDP endpoint:
//!
//! | Part | Description |
//! |------|-------------|
//! | [`locate_browser`] | Finds an installed Chrome or Edge binary |
//! | `launcher` | Spawns the process / requests the embedded surface |
//! | [`SurfaceFactory`] | Host-implemented seam for internal mode |
//!
//! External mode spawns a real browser process on [`NODE_DEBUG_PORT`];
//! internal mode borrows an embedded surface from the host shell. Either
//! way the rest of the node only sees a debug port and a shutdown handle.

// ============================================================================
// Submodules
// ============================================================================

/// Process spawn and surface acquisition.
pub(crate) mod launcher;

/// Browser installation discovery.
pub mod locator;

/// Embedded surface seam for internal mode.
pub mod surface;

// ============================================================================
// Constants
// ============================================================================

/// CDP debugging port the node assigns to the browser it launches.
///
/// Fixed and node-owned; distinct from any debugging port the panel server
/// itself might use on the same machine.
pub const NODE_DEBUG_PORT: u16 = 9223;

/// Neutral page the browser is parked on after launch.
pub const START_PAGE: &str = "about:blank";

// ============================================================================
// Re-exports
// ============================================================================

pub use locator::{BrowserKind, LocatedBrowser, locate_browser};
pub use surface::{CreatedSurface, EmbeddedSurface, SURFACE_PARTITION, SurfaceFactory, SurfaceSpec};
