//! Per-connection request handling, driven by transport events.
//!
//! The transport reports three things: bytes arrived (or the peer closed), bytes were
//! acknowledged, or the connection died. A connection answers exactly one request and then
//! closes, but only after every response byte has been acknowledged; closing earlier can
//! drop the tail of the page.

use core::fmt::Debug;

use super::request::{self, Route, REQUEST_BUFFER_LEN};
use super::response::{self, Response, NOT_FOUND};
use crate::board::{Board, Outcome, Timestamp};

/// What a connection needs from the network stack.
pub trait Transport {
    type Error: Debug;

    /// `len` received bytes were consumed, the receive window may reopen.
    fn recved(&mut self, len: usize);

    /// Queue `data` for sending. The bytes are copied before this returns.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Start a graceful close.
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Reset the connection.
    fn abort(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for a request line
    Accepted,
    /// A GET request line was classified
    Parsed,
    /// A response was produced and handed to the transport
    Responded,
    /// Waiting for the transport to confirm the response was sent
    AwaitingAck,
    Closed,
}

enum Reply {
    NotFound,
    Page,
}

pub struct Connection {
    state: ConnectionState,
    request: heapless::Vec<u8, REQUEST_BUFFER_LEN>,
    response: Response,
    unacked: usize,
}

impl Default for Connection {
    fn default() -> Self {
        Self::accept()
    }
}

impl Connection {
    pub fn accept() -> Self {
        Connection {
            state: ConnectionState::Accepted,
            request: heapless::Vec::new(),
            response: Response::new(),
            unacked: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Handle received bytes, `None` means the peer closed its side.
    ///
    /// Only the first line of the first segment is interpreted. Returns whether the board changed.
    pub fn on_receive<T: Transport, B: Board>(
        &mut self,
        transport: &mut T,
        payload: Option<&[u8]>,
        board: &mut B,
        now: Timestamp,
    ) -> Outcome {
        if self.is_closed() {
            return Outcome::Unchanged;
        }
        let Some(payload) = payload else {
            log::debug!("Peer closed the connection");
            self.close(transport);
            return Outcome::Unchanged;
        };
        transport.recved(payload.len());

        if self.state != ConnectionState::Accepted {
            log::debug!("Ignoring {} bytes after the request line", payload.len());
            return Outcome::Unchanged;
        }

        let kept = payload.len().min(REQUEST_BUFFER_LEN);
        if kept < payload.len() {
            log::debug!("Request truncated from {} to {kept} bytes", payload.len());
        }
        self.request.clear();
        let _ = self.request.extend_from_slice(&payload[..kept]);

        let Some(line) = request::first_line(&self.request) else {
            return Outcome::Unchanged;
        };
        if !request::is_get(line) {
            log::debug!("Dropping non-GET request {line:?}");
            return Outcome::Unchanged;
        }

        self.state = ConnectionState::Parsed;
        let (outcome, rendered) = match request::route::<B>(line) {
            Route::NotFound => {
                log::info!("404 for {line:?}");
                self.respond(transport, Reply::NotFound);
                return Outcome::Unchanged;
            }
            Route::Index => (Outcome::Unchanged, response::render_page(board, &mut self.response)),
            Route::Query(line) => {
                let outcome = board.apply(line, now);
                (outcome, response::render_page(board, &mut self.response))
            }
        };

        match rendered {
            Ok(()) => self.respond(transport, Reply::Page),
            Err(e) => {
                log::warn!("Failed to render page: {e}");
                self.close(transport);
            }
        }
        outcome
    }

    /// The transport confirmed `len` bytes were sent. Closes once the whole response is out.
    pub fn on_sent<T: Transport>(&mut self, transport: &mut T, len: usize) {
        if self.state != ConnectionState::AwaitingAck {
            return;
        }
        self.unacked = self.unacked.saturating_sub(len);
        if self.unacked == 0 {
            self.close(transport);
        }
    }

    /// The transport already dropped the connection.
    pub fn on_error(&mut self) {
        log::warn!("Connection dropped by the transport in state {:?}", self.state);
        self.state = ConnectionState::Closed;
    }

    fn respond<T: Transport>(&mut self, transport: &mut T, reply: Reply) {
        let bytes = match reply {
            Reply::NotFound => NOT_FOUND.as_bytes(),
            Reply::Page => self.response.as_bytes(),
        };
        let len = bytes.len();
        self.state = ConnectionState::Responded;

        match transport.write(bytes) {
            Ok(()) => {
                self.unacked = len;
                self.state = ConnectionState::AwaitingAck;
            }
            Err(e) => {
                log::warn!("Failed to write response: {e:?}");
                self.close(transport);
            }
        }
    }

    fn close<T: Transport>(&mut self, transport: &mut T) {
        if let Err(e) = transport.close() {
            log::warn!("Failed to close connection, aborting: {e:?}");
            transport.abort();
        }
        self.state = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::occupancy::MAX_OCCUPANCY;
    use crate::board::{OccupancyBoard, PresenceBoard};
    use crate::outputs::{indicator, Indicator};

    const NOW: Timestamp = Timestamp::from_secs(5);

    #[derive(Default)]
    struct MockTransport {
        sent: Vec<u8>,
        recved: usize,
        closed: bool,
        aborted: bool,
        fail_write: bool,
        fail_close: bool,
    }

    impl Transport for MockTransport {
        type Error = &'static str;

        fn recved(&mut self, len: usize) {
            self.recved += len;
        }

        fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            if self.fail_write {
                return Err("send buffer full");
            }
            self.sent.extend_from_slice(data);
            Ok(())
        }

        fn close(&mut self) -> Result<(), Self::Error> {
            if self.fail_close {
                return Err("out of memory");
            }
            self.closed = true;
            Ok(())
        }

        fn abort(&mut self) {
            self.aborted = true;
        }
    }

    impl MockTransport {
        fn text(&self) -> &str {
            core::str::from_utf8(&self.sent).unwrap()
        }
    }

    /// Run one request through a fresh connection and acknowledge everything it wrote.
    fn exchange<B: Board>(board: &mut B, request: &str) -> MockTransport {
        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        connection.on_receive(&mut transport, Some(request.as_bytes()), board, NOW);
        if connection.state() == ConnectionState::AwaitingAck {
            assert!(!transport.closed, "closed before the response was sent");
            let len = transport.sent.len();
            connection.on_sent(&mut transport, len);
        }
        assert!(connection.is_closed());
        transport
    }

    fn get(target: &str) -> String {
        format!("GET {target} HTTP/1.1\r\nHost: 192.168.4.1\r\nAccept: text/html\r\n\r\n")
    }

    #[test]
    fn check_in_then_out() {
        let mut board = PresenceBoard::new();

        let transport = exchange(&mut board, &get("/?user=joao"));
        assert!(transport.text().starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(transport.text().contains("People present: 1"));
        assert!(board.is_present("JOAO"));
        assert_eq!(indicator(&board), Indicator::Occupied);

        let transport = exchange(&mut board, &get("/?user=joao"));
        assert!(transport.text().contains("People present: 0"));
        assert!(!board.is_present("JOAO"));
        assert_eq!(indicator(&board), Indicator::Empty);
        assert!(transport.text().contains("<li>JOAO checked in at 00:00:05</li><li>JOAO checked out at 00:00:05</li>"));
    }

    #[test]
    fn clear_resets_presence_and_history() {
        let mut board = PresenceBoard::new();
        exchange(&mut board, &get("/?user=maria"));
        exchange(&mut board, &get("/?user=visitante"));

        let transport = exchange(&mut board, &get("/?clear=true"));
        assert_eq!(board.present_count(), 0);
        assert!(board.history().is_empty());
        assert!(transport.text().contains("<ul></ul>"));
    }

    #[test]
    fn floor_add_selects_and_counts() {
        let mut board = OccupancyBoard::new();
        exchange(&mut board, &get("/?floor=2&action=add"));
        assert_eq!(board.counts(), &[0, 0, 1, 0, 0]);
        assert_eq!(board.selected(), 2);
        assert_eq!(indicator(&board), Indicator::Occupied);
    }

    #[test]
    fn floor_add_is_clamped() {
        let mut board = OccupancyBoard::new();
        for _ in 0..51 {
            exchange(&mut board, &get("/?floor=2&action=add"));
        }
        assert_eq!(board.counts()[2], MAX_OCCUPANCY);
    }

    #[test]
    fn unknown_path_is_not_found() {
        let mut board = OccupancyBoard::new();
        exchange(&mut board, &get("/?floor=1&action=add"));

        let transport = exchange(&mut board, &get("/nonsense"));
        assert_eq!(transport.text(), NOT_FOUND);
        assert_eq!(transport.recved, get("/nonsense").len());
        assert_eq!(board.counts(), &[0, 1, 0, 0, 0]);
        assert_eq!(board.selected(), 1);
    }

    #[test]
    fn index_renders_without_changes() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        let outcome = connection.on_receive(&mut transport, Some(b"GET / HTTP/1.1\r\n\r\n"), &mut board, NOW);
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(transport.text().contains("People present: 0"));
        assert_eq!(connection.state(), ConnectionState::AwaitingAck);
    }

    #[test]
    fn close_waits_for_every_byte() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        let outcome = connection.on_receive(&mut transport, Some(get("/?user=carlos").as_bytes()), &mut board, NOW);
        assert_eq!(outcome, Outcome::Changed);

        let len = transport.sent.len();
        connection.on_sent(&mut transport, len - 10);
        assert!(!transport.closed);
        assert_eq!(connection.state(), ConnectionState::AwaitingAck);

        connection.on_sent(&mut transport, 10);
        assert!(transport.closed);
        assert!(!transport.aborted);
        assert!(connection.is_closed());
    }

    #[test]
    fn write_failure_closes_immediately() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport {
            fail_write: true,
            ..Default::default()
        };
        let mut connection = Connection::accept();
        connection.on_receive(&mut transport, Some(get("/").as_bytes()), &mut board, NOW);
        assert!(transport.sent.is_empty());
        assert!(transport.closed);
        assert!(connection.is_closed());
    }

    #[test]
    fn failed_close_escalates_to_abort() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport {
            fail_close: true,
            ..Default::default()
        };
        let mut connection = Connection::accept();
        connection.on_receive(&mut transport, Some(get("/").as_bytes()), &mut board, NOW);
        let len = transport.sent.len();
        connection.on_sent(&mut transport, len);
        assert!(transport.aborted);
        assert!(connection.is_closed());
    }

    #[test]
    fn non_get_gets_no_response() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        let request = b"POST /?user=joao HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
        connection.on_receive(&mut transport, Some(request), &mut board, NOW);

        assert!(transport.sent.is_empty());
        assert_eq!(transport.recved, request.len());
        assert!(!transport.closed);
        assert_eq!(connection.state(), ConnectionState::Accepted);
        assert!(!board.is_present("joao"));

        connection.on_receive(&mut transport, None, &mut board, NOW);
        assert!(transport.closed);
        assert!(connection.is_closed());
    }

    #[test]
    fn oversized_request_is_truncated_and_served() {
        let mut board = PresenceBoard::new();
        let mut request = get("/?user=maria").into_bytes();
        request.resize(3000, b'x');

        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        connection.on_receive(&mut transport, Some(&request), &mut board, NOW);
        assert_eq!(transport.recved, 3000);
        assert!(board.is_present("MARIA"));
        assert_eq!(connection.state(), ConnectionState::AwaitingAck);
    }

    #[test]
    fn later_segments_are_acknowledged_and_ignored() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        connection.on_receive(&mut transport, Some(b"GET /?user=joao HTTP/1.1\r\n"), &mut board, NOW);
        let written = transport.sent.len();

        connection.on_receive(&mut transport, Some(b"GET /?user=joao HTTP/1.1\r\n"), &mut board, NOW);
        assert_eq!(transport.sent.len(), written);
        assert_eq!(transport.recved, 52);
        assert!(board.is_present("joao"));
    }

    #[test]
    fn peer_close_while_waiting_for_ack_closes() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        connection.on_receive(&mut transport, Some(get("/").as_bytes()), &mut board, NOW);
        connection.on_receive(&mut transport, None, &mut board, NOW);
        assert!(transport.closed);
        assert!(connection.is_closed());
    }

    #[test]
    fn events_after_close_are_ignored() {
        let mut board = PresenceBoard::new();
        let mut transport = exchange(&mut board, &get("/"));
        let mut connection = Connection::accept();
        connection.on_error();
        let outcome = connection.on_receive(&mut transport, Some(get("/?user=joao").as_bytes()), &mut board, NOW);
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(!board.is_present("joao"));
        connection.on_sent(&mut transport, 100);
        assert!(connection.is_closed());
    }

    #[test]
    fn empty_segment_keeps_waiting() {
        let mut board = PresenceBoard::new();
        let mut transport = MockTransport::default();
        let mut connection = Connection::accept();
        connection.on_receive(&mut transport, Some(b"\r\n"), &mut board, NOW);
        assert_eq!(connection.state(), ConnectionState::Accepted);
        assert_eq!(transport.recved, 2);

        let request = get("/");
        connection.on_receive(&mut transport, Some(request.as_bytes()), &mut board, NOW);
        assert_eq!(connection.state(), ConnectionState::AwaitingAck);
        assert_eq!(transport.recved, 2 + request.len());
    }
}
