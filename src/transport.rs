//! Transport contract consumed by the core.
//!
//! Transports (TLS sockets, websocket framing, FIX sessions) live outside
//! this crate. The core only sees opaque byte buffers: inbound payloads
//! arrive through a registered callback on the transport's thread, and
//! outbound frames are handed to [`TransportOut::write`], which must never
//! block.

/// Sentinel payload delivered by a transport when its session becomes
/// usable. Order-entry handlers initiate logon on it; stream handlers
/// subscribe and notify the strategy of the session event.
pub const CONNECTED_SENTINEL: &str = "__CONNECTED__";

/// Outbound half of a transport session.
pub trait TransportOut: Send {
    /// Non-blocking write. Returns bytes written (possibly fewer than
    /// `frame.len()`) or a negative value on error; on a partial write
    /// the caller retains ownership of the remainder and retries.
    fn write(&mut self, frame: &[u8]) -> isize;

    /// Unblock any pending socket wait so the session can shut down.
    fn interrupt(&mut self) {}
}

/// In-memory transport capturing written frames. Test double; also the
/// reference implementation of the partial-write contract.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub frames: Vec<Vec<u8>>,
    /// When set, the next write accepts only this many bytes.
    pub next_partial: Option<usize>,
    /// When set, every write fails with this value.
    pub fail_with: Option<isize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_as_strings(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }
}

impl TransportOut for RecordingTransport {
    fn write(&mut self, frame: &[u8]) -> isize {
        if let Some(err) = self.fail_with {
            return err;
        }
        let take = match self.next_partial.take() {
            Some(n) => n.min(frame.len()),
            None => frame.len(),
        };
        self.frames.push(frame[..take].to_vec());
        take as isize
    }
}
