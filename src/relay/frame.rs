//! Opaque relay frames.
//!
//! The relay never parses CDP traffic; a frame is a text or binary payload
//! carried verbatim between the tunnel and the local browser. Control
//! frames (ping, pong, close) are not relay frames: the transport layers
//! handle them, the relay ignores them.

// ============================================================================
// Imports
// ============================================================================

use tokio_tungstenite::tungstenite::{Bytes, Message, Utf8Bytes};

// ============================================================================
// Relay Frame
// ============================================================================

/// One opaque payload moving through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// Text payload (CDP messages are JSON text in practice).
    Text(Utf8Bytes),
    /// Binary payload.
    Binary(Bytes),
}

impl RelayFrame {
    /// Creates a text frame.
    #[inline]
    pub fn text(payload: impl Into<Utf8Bytes>) -> Self {
        Self::Text(payload.into())
    }

    /// Creates a binary frame.
    #[inline]
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::Binary(payload.into())
    }

    /// Extracts a relay frame from a WebSocket message.
    ///
    /// Returns [`None`] for control messages; close handling stays with the
    /// caller.
    #[must_use]
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Self::Text(text)),
            Message::Binary(data) => Some(Self::Binary(data)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }

    /// Converts the frame back into a WebSocket message.
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text),
            Self::Binary(data) => Message::Binary(data),
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Returns `true` for an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_roundtrip() {
        let frame = RelayFrame::text(r#"{"id":1,"method":"Target.getTargets"}"#);
        assert_eq!(frame.len(), 37);

        let message = frame.clone().into_message();
        assert_eq!(RelayFrame::from_message(message), Some(frame));
    }

    #[test]
    fn test_binary_roundtrip() {
        let frame = RelayFrame::binary(vec![0u8, 1, 2, 3]);
        assert_eq!(frame.len(), 4);

        let message = frame.clone().into_message();
        assert_eq!(RelayFrame::from_message(message), Some(frame));
    }

    #[test]
    fn test_control_messages_are_not_frames() {
        assert_eq!(RelayFrame::from_message(Message::Ping(Bytes::new())), None);
        assert_eq!(RelayFrame::from_message(Message::Pong(Bytes::new())), None);
        assert_eq!(RelayFrame::from_message(Message::Close(None)), None);
    }

    #[test]
    fn test_empty_frame() {
        assert!(RelayFrame::text("").is_empty());
        assert!(!RelayFrame::text("x").is_empty());
    }
}
