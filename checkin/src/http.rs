//! Socket driver for the connection state machine.
//!
//! Each web task owns one listening socket. Received segments are fed to the
//! [`Connection`] while holding the board, the bytes it writes are staged and pushed
//! out afterwards. `flush` returns once the peer acknowledged everything, which is
//! what the connection waits for before it asks to close.

use checkinlib::board::Timestamp;
use checkinlib::http::{Connection, Transport, REQUEST_BUFFER_LEN, RESPONSE_CAPACITY};
use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_net::Stack;
use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::Write;

use crate::SharedBoard;

pub const MAX_CONNECTIONS: usize = 4;
const TCP_BUFFER_LEN: usize = 1024;

pub fn setup_http_server(
    stack: Stack<'static>,
    board: &'static SharedBoard,
    port: u16,
    spawner: Spawner,
) {
    for id in 0..MAX_CONNECTIONS {
        spawner.must_spawn(web_task(id, stack, board, port));
    }
}

#[embassy_executor::task(pool_size = MAX_CONNECTIONS)]
async fn web_task(id: usize, stack: Stack<'static>, board: &'static SharedBoard, port: u16) -> ! {
    let mut tcp_rx_buffer = [0; TCP_BUFFER_LEN];
    let mut tcp_tx_buffer = [0; TCP_BUFFER_LEN];
    let mut segment = [0; REQUEST_BUFFER_LEN];

    loop {
        let mut socket = TcpSocket::new(stack, &mut tcp_rx_buffer, &mut tcp_tx_buffer);
        if let Err(e) = socket.accept(port).await {
            log::warn!("Web task {id}: accept failed: {e:?}");
            Timer::after(Duration::from_millis(200)).await;
            continue;
        }
        log::debug!("Web task {id}: connection from {:?}", socket.remote_endpoint());

        serve(id, &mut socket, &mut segment, board).await;
    }
}

async fn serve(id: usize, socket: &mut TcpSocket<'_>, segment: &mut [u8], board: &SharedBoard) {
    let mut connection = Connection::accept();
    let mut transport = SocketTransport::default();

    while !connection.is_closed() {
        let payload = match socket.read(segment).await {
            Ok(0) => None,
            Ok(len) => Some(&segment[..len]),
            Err(e) => {
                log::warn!("Web task {id}: read failed: {e:?}");
                connection.on_error();
                break;
            }
        };

        let now = uptime();
        if board.update(|board| {
            connection
                .on_receive(&mut transport, payload, board, now)
                .is_changed()
        }) {
            log::debug!("Web task {id}: board updated");
        }

        if !transport.outgoing.is_empty() {
            let len = transport.outgoing.len();
            let sent = match socket.write_all(&transport.outgoing).await {
                Ok(()) => socket.flush().await,
                Err(e) => Err(e),
            };
            transport.outgoing.clear();
            match sent {
                Ok(()) => connection.on_sent(&mut transport, len),
                Err(e) => {
                    log::warn!("Web task {id}: send failed: {e:?}");
                    connection.on_error();
                }
            }
        }

        match transport.shutdown.take() {
            Some(Shutdown::Close) => {
                socket.close();
                let _ = socket.flush().await;
            }
            Some(Shutdown::Abort) => {
                socket.abort();
                let _ = socket.flush().await;
            }
            None => {}
        }
    }
}

fn uptime() -> Timestamp {
    Timestamp::from_secs(Instant::now().as_secs())
}

enum Shutdown {
    Close,
    Abort,
}

/// Collects what the connection asks for while the board is held.
#[derive(Default)]
struct SocketTransport {
    outgoing: heapless::Vec<u8, RESPONSE_CAPACITY>,
    shutdown: Option<Shutdown>,
}

#[derive(Debug)]
struct SendBufferFull;

impl Transport for SocketTransport {
    type Error = SendBufferFull;

    fn recved(&mut self, _len: usize) {
        // `read` already took the bytes out of the socket buffer
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.outgoing
            .extend_from_slice(data)
            .map_err(|_| SendBufferFull)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.shutdown = Some(Shutdown::Close);
        Ok(())
    }

    fn abort(&mut self) {
        self.shutdown = Some(Shutdown::Abort);
    }
}
