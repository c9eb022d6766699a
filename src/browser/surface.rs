//! Embedded surface seam for internal mode.
//!
//! In internal mode the node does not spawn a browser process; it asks the
//! host application for an embedded browser view with CDP enabled. The host
//! (a desktop shell built on an embedded Chromium) implements these traits;
//! the node stays agnostic of the host toolkit.
//!
//! Contract for implementors:
//!
//! - The surface lives in its own persistent storage partition
//!   ([`SurfaceSpec::partition`]), separate from any session the host uses
//!   for its own UI.
//! - Script isolation is on and no privileged host API is exposed to page
//!   content; remote automation traffic must not reach host internals.
//! - [`SurfaceFactory::create`] resolves only after the start page has
//!   finished loading, so the CDP endpoint is ready to poll.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::browser::START_PAGE;
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Storage partition the embedded surface lives in.
pub const SURFACE_PARTITION: &str = "persist:browser-node";

// ============================================================================
// Surface Spec
// ============================================================================

/// What the node asks the host to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSpec {
    /// Storage partition name.
    pub partition: String,
    /// Page loaded before the surface is handed over.
    pub start_url: String,
    /// Whether page content runs with script isolation.
    pub isolate_scripts: bool,
    /// Whether page content may reach privileged host APIs.
    pub allow_host_api: bool,
}

impl SurfaceSpec {
    /// The surface spec the node always requests: isolated, unprivileged,
    /// parked on a blank page.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            partition: SURFACE_PARTITION.to_string(),
            start_url: START_PAGE.to_string(),
            isolate_scripts: true,
            allow_host_api: false,
        }
    }
}

impl Default for SurfaceSpec {
    fn default() -> Self {
        Self::isolated()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A surface the host created for the node.
pub struct CreatedSurface {
    /// The live surface.
    pub surface: Box<dyn EmbeddedSurface>,
    /// Fires when the host destroys the surface outside of node shutdown.
    /// Hosts that cannot observe destruction pass [`None`].
    pub closed: Option<oneshot::Receiver<()>>,
}

/// Creates embedded surfaces on request.
///
/// Registered with the controller builder by hosts that support internal
/// mode.
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    /// Creates a surface matching `spec`.
    ///
    /// Must resolve only once the start page has loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SurfaceUnavailable`](crate::Error::SurfaceUnavailable)
    /// when the host cannot create the surface.
    async fn create(&self, spec: &SurfaceSpec) -> Result<CreatedSurface>;
}

/// A live embedded browser surface.
#[async_trait]
pub trait EmbeddedSurface: Send {
    /// CDP debugging port of the host's embedded browser.
    fn debug_port(&self) -> u16;

    /// Destroys the surface. Called once during node teardown.
    async fn destroy(&mut self);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_spec() {
        let spec = SurfaceSpec::isolated();
        assert_eq!(spec.partition, "persist:browser-node");
        assert_eq!(spec.start_url, "about:blank");
        assert!(spec.isolate_scripts);
        assert!(!spec.allow_host_api);
    }

    #[test]
    fn test_default_is_isolated() {
        assert_eq!(SurfaceSpec::default(), SurfaceSpec::isolated());
    }
}
