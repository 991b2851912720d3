//! Order gateway: request ring to transport.
//!
//! Drains the request ring, encodes each request and writes the frame
//! through the non-blocking transport. Partial writes keep ownership of
//! the remainder across pumps; persistent failures drop the frame after a
//! bounded number of attempts and log. A disconnect halts outbound flow
//! until an explicit resynchronisation.

use crate::logging::LogProducer;
use crate::sync::SpscConsumer;
use crate::transport::TransportOut;

use super::encoder::OrderEncoder;
use super::request::OrderRequest;

const MAX_WRITE_ATTEMPTS: u32 = 8;

pub struct OrderGateway {
    log: LogProducer,
    encoder: Box<dyn OrderEncoder>,
    transport: Box<dyn TransportOut>,
    requests: SpscConsumer<OrderRequest>,
    /// Unwritten tail of a partially written frame.
    pending: Option<Vec<u8>>,
    halted: bool,
    dropped: u64,
}

impl OrderGateway {
    pub fn new(
        log: LogProducer,
        encoder: Box<dyn OrderEncoder>,
        transport: Box<dyn TransportOut>,
        requests: SpscConsumer<OrderRequest>,
    ) -> Self {
        OrderGateway {
            log,
            encoder,
            transport,
            requests,
            pending: None,
            halted: false,
            dropped: 0,
        }
    }

    /// The session became usable: emit a logon frame when the dialect
    /// requires one and resume outbound flow.
    pub fn on_connected(&mut self) {
        self.halted = false;
        if let Some(frame) = self.encoder.logon_frame() {
            if !self.write_frame(frame.into_bytes()) {
                self.log.error("failed to write logon frame");
            }
        }
        self.log.info("order gateway session connected");
    }

    /// The transport disconnected: outstanding reserved quantity is
    /// unknown, so no new frames leave until resynchronisation.
    pub fn on_disconnected(&mut self) {
        self.halted = true;
        self.pending = None;
        self.log
            .error("order gateway transport disconnected; halting outbound flow");
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Frames abandoned after exhausting write attempts.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Drain the request ring. Returns the number of requests encoded.
    pub fn pump(&mut self) -> usize {
        if self.halted {
            return 0;
        }

        // Finish any partially written frame before taking new work.
        if let Some(frame) = self.pending.take() {
            if !self.write_frame(frame) {
                return 0;
            }
        }

        let mut sent = 0usize;
        while let Some(request) = self.requests.pop() {
            match self.encoder.encode(&request) {
                Ok(frame) => {
                    self.log.debug(format!("gateway sending {request}"));
                    if !self.write_frame(frame.into_bytes()) {
                        sent += 1;
                        break;
                    }
                    sent += 1;
                }
                Err(err) => {
                    self.log
                        .error(format!("failed to encode {request}: {err}"));
                }
            }
        }
        sent
    }

    /// Write one frame, retrying partial writes. Returns `false` when the
    /// frame (or its tail) is parked in `pending` or dropped.
    fn write_frame(&mut self, mut frame: Vec<u8>) -> bool {
        let mut attempts = 0u32;
        while attempts < MAX_WRITE_ATTEMPTS {
            attempts += 1;
            let written = self.transport.write(&frame);
            if written < 0 {
                self.dropped += 1;
                self.log.error(format!(
                    "transport write error {written}; dropping frame after {attempts} attempts"
                ));
                return false;
            }
            let written = written as usize;
            if written >= frame.len() {
                return true;
            }
            // Caller retains ownership of the remainder on partial write.
            frame.drain(..written);
        }
        self.log.warn(format!(
            "transport still saturated after {MAX_WRITE_ATTEMPTS} attempts; parking {} bytes",
            frame.len()
        ));
        self.pending = Some(frame);
        false
    }
}
