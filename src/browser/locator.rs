//! Browser installation discovery.
//!
//! External mode needs a Chromium-based browser binary. The locator walks
//! an ordered, OS-specific candidate list (Chrome installs first, Edge as
//! the fallback) and picks the first path that exists. Plain filesystem
//! checks only: no PATH search, no registry reads, no version probing.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

// ============================================================================
// Types
// ============================================================================

/// Browser family of a located binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    /// Google Chrome or Chromium.
    Chrome,
    /// Microsoft Edge.
    Edge,
}

impl BrowserKind {
    /// Human-readable browser name.
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Chrome => "Google Chrome",
            Self::Edge => "Microsoft Edge",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A browser binary found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBrowser {
    /// Browser family.
    pub kind: BrowserKind,
    /// Path to the executable.
    pub path: PathBuf,
}

// ============================================================================
// Candidate Tables
// ============================================================================

#[cfg(target_os = "macos")]
fn candidate_paths() -> Vec<(BrowserKind, PathBuf)> {
    vec![
        (
            BrowserKind::Chrome,
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        ),
        (
            BrowserKind::Chrome,
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ),
        (
            BrowserKind::Edge,
            PathBuf::from("/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"),
        ),
    ]
}

#[cfg(target_os = "windows")]
fn candidate_paths() -> Vec<(BrowserKind, PathBuf)> {
    let mut candidates = vec![
        (
            BrowserKind::Chrome,
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
        ),
        (
            BrowserKind::Chrome,
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ),
    ];
    if let Some(local) = std::env::var_os("LOCALAPPDATA") {
        candidates.push((
            BrowserKind::Chrome,
            PathBuf::from(local).join(r"Google\Chrome\Application\chrome.exe"),
        ));
    }
    candidates.push((
        BrowserKind::Edge,
        PathBuf::from(r"C:\Program Files\Microsoft\Edge\Application\msedge.exe"),
    ));
    candidates.push((
        BrowserKind::Edge,
        PathBuf::from(r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe"),
    ));
    candidates
}

#[cfg(all(unix, not(target_os = "macos")))]
fn candidate_paths() -> Vec<(BrowserKind, PathBuf)> {
    [
        (BrowserKind::Chrome, "/usr/bin/google-chrome"),
        (BrowserKind::Chrome, "/usr/bin/google-chrome-stable"),
        (BrowserKind::Chrome, "/opt/google/chrome/chrome"),
        (BrowserKind::Chrome, "/usr/bin/chromium"),
        (BrowserKind::Chrome, "/usr/bin/chromium-browser"),
        (BrowserKind::Chrome, "/snap/bin/chromium"),
        (BrowserKind::Edge, "/usr/bin/microsoft-edge"),
        (BrowserKind::Edge, "/usr/bin/microsoft-edge-stable"),
        (BrowserKind::Edge, "/opt/microsoft/msedge/msedge"),
    ]
    .into_iter()
    .map(|(kind, path)| (kind, PathBuf::from(path)))
    .collect()
}

// ============================================================================
// Locator
// ============================================================================

/// Returns the first candidate whose path exists.
fn first_existing(candidates: &[(BrowserKind, PathBuf)]) -> Option<LocatedBrowser> {
    candidates
        .iter()
        .find(|(_, path)| path.exists())
        .map(|(kind, path)| LocatedBrowser {
            kind: *kind,
            path: path.clone(),
        })
}

/// Locates an installed Chrome or Edge browser.
///
/// Candidates are checked in preference order: Chrome family first, then
/// Edge. Returns [`None`] when no candidate exists on this machine.
#[must_use]
pub fn locate_browser() -> Option<LocatedBrowser> {
    let found = first_existing(&candidate_paths());
    match &found {
        Some(located) => debug!(browser = %located.kind, path = %located.path.display(), "Browser located"),
        None => debug!("No browser installation found in candidate paths"),
    }
    found
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn test_candidates_not_empty() {
        assert!(!candidate_paths().is_empty());
    }

    #[test]
    fn test_chrome_preferred_over_edge() {
        let candidates = candidate_paths();
        let first_chrome = candidates
            .iter()
            .position(|(kind, _)| *kind == BrowserKind::Chrome);
        let first_edge = candidates
            .iter()
            .position(|(kind, _)| *kind == BrowserKind::Edge);
        assert!(first_chrome.unwrap() < first_edge.unwrap());
    }

    #[test]
    fn test_first_existing_picks_earliest_match() {
        let dir = TempDir::new().unwrap();
        let present_a = dir.path().join("chrome-a");
        let present_b = dir.path().join("chrome-b");
        fs::write(&present_a, "").unwrap();
        fs::write(&present_b, "").unwrap();

        let candidates = vec![
            (BrowserKind::Chrome, dir.path().join("missing")),
            (BrowserKind::Chrome, present_a.clone()),
            (BrowserKind::Edge, present_b),
        ];

        let located = first_existing(&candidates).unwrap();
        assert_eq!(located.kind, BrowserKind::Chrome);
        assert_eq!(located.path, present_a);
    }

    #[test]
    fn test_first_existing_none_when_all_missing() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![
            (BrowserKind::Chrome, dir.path().join("nope")),
            (BrowserKind::Edge, dir.path().join("also-nope")),
        ];
        assert!(first_existing(&candidates).is_none());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(BrowserKind::Chrome.to_string(), "Google Chrome");
        assert_eq!(BrowserKind::Edge.to_string(), "Microsoft Edge");
    }
}
