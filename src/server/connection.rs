//! Per-connection protocol state machine.
//!
//! Bytes are appended to the slot's fixed buffer as they arrive and scanned for
//! CRLF-terminated lines. The first line of a request is matched against the
//! registry, the following lines are skipped, and the empty line dispatches the
//! response. Everything still buffered at that point is dropped with the reset.

use std::io::{self, ErrorKind, Read, Write};

use log::{debug, trace};

use crate::parser::match_request;
use crate::registry::{ResponseRef, ResponseRegistry};
use crate::server::error::CloseReason;
use crate::server::slot::{ConnectionSlot, ParseState, PendingWrite};

/// What the event loop should do with a connection after handling an event.
#[derive(Debug)]
pub enum Outcome {
    /// Keep the connection and wait for its next readiness event.
    Open,
    /// Release the slot and close the socket.
    Close(CloseReason),
}

/// Drive a connection after its socket reported readiness.
///
/// A response still waiting to be sent is flushed first; reading resumes only once
/// it is fully queued. Then bytes are received until the socket would block, the
/// peer closes, an error occurs, or the buffer is full.
pub fn on_readable<S: Read + Write>(slot: &mut ConnectionSlot<S>, registry: &ResponseRegistry) -> Outcome {
    loop {
        match flush(slot, registry) {
            Ok(true) => {}
            Ok(false) => return Outcome::Open,
            Err(e) => return Outcome::Close(CloseReason::Io(e)),
        }

        if slot.write_cursor == slot.buffer.len() {
            return Outcome::Close(CloseReason::BufferExhausted);
        }

        let Some(stream) = slot.stream.as_mut() else {
            return Outcome::Open;
        };

        let read = match stream.read(&mut slot.buffer[slot.write_cursor..]) {
            Ok(0) => return Outcome::Close(CloseReason::PeerClosed),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Outcome::Open,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Outcome::Close(CloseReason::Io(e)),
        };

        slot.write_cursor += read;
        trace!("Received {read} bytes, {buffered} buffered", buffered = slot.write_cursor);

        if let Some(response) = scan_lines(slot, registry) {
            slot.reset_request();
            slot.pending = Some(PendingWrite { response, written: 0 });
        }
    }
}

/// Scan the buffered lines that have not been looked at yet.
///
/// Returns the response to send once the empty line ending the request is found.
fn scan_lines<S>(slot: &mut ConnectionSlot<S>, registry: &ResponseRegistry) -> Option<ResponseRef> {
    while let Some(offset) = find_crlf(&slot.buffer[slot.line_cursor..slot.write_cursor]) {
        let line_start = slot.line_cursor;

        if offset == 0 {
            let response = ResponseRef::from(slot.matched.take());
            debug!("Request complete, dispatching {response:?}");
            return Some(response);
        }

        if slot.state == ParseState::AwaitingRequestLine {
            let line = &slot.buffer[line_start..line_start + offset];
            slot.matched = match_request(line, registry);
            slot.state = ParseState::AwaitingBlankLine;
        }

        slot.line_cursor = line_start + offset + 2;
    }

    None
}

/// Write as much of the pending response as the socket takes.
///
/// Returns `Ok(true)` once nothing is left to send and `Ok(false)` if the socket
/// would block first.
fn flush<S: Write>(slot: &mut ConnectionSlot<S>, registry: &ResponseRegistry) -> io::Result<bool> {
    let Some(pending) = slot.pending.as_mut() else {
        return Ok(true);
    };
    let Some(stream) = slot.stream.as_mut() else {
        return Ok(true);
    };

    let bytes = registry.response_bytes(pending.response);
    while pending.written < bytes.len() {
        match stream.write(&bytes[pending.written..]) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => pending.written += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                trace!("Send would block after {written} of {len} bytes", written = pending.written, len = bytes.len());
                return Ok(false);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    slot.pending = None;
    Ok(true)
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
