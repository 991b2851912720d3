//! Integration test suite: universal property tests plus the end-to-end
//! pipeline scenarios.

mod book_props;
mod engine_scenarios;
mod fixed_point_props;
mod pipeline;
mod spsc_props;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tradecore_rs::transport::TransportOut;

/// Transport double whose captured frames stay inspectable after the
/// writer half moves into the engine.
#[derive(Clone, Default)]
pub struct SharedRecordingTransport {
    frames: Arc<Mutex<Vec<String>>>,
}

impl SharedRecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().expect("transport mutex").clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.frames()
            .iter()
            .filter(|frame| frame.contains(needle))
            .count()
    }
}

impl TransportOut for SharedRecordingTransport {
    fn write(&mut self, frame: &[u8]) -> isize {
        self.frames
            .lock()
            .expect("transport mutex")
            .push(String::from_utf8_lossy(frame).into_owned());
        frame.len() as isize
    }
}

/// Spin until `pred` holds or `timeout_ms` elapses.
pub fn wait_for(pred: impl Fn() -> bool, timeout_ms: u64) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    pred()
}
