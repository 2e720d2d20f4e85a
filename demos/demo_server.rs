//! A runnable stand-in for the original source's bundled sample server:
//! binds a `TcpListener`, wires up a tiny route table, and drives
//! `ember::server::Server` one cooperative iteration at a time.
//!
//! `Server` and the rest of the core are transport-agnostic (spec.md §6);
//! this file supplies the one piece the crate deliberately leaves out, a
//! `Socket`/`SocketPool` pair over real TCP connections. Readiness is
//! approximated with `TcpStream::peek` on a short poll interval rather
//! than a real `select`/`epoll`, which keeps this demo free of any extra
//! dependency beyond what the library itself already pulls in.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use ember::client::Client;
use ember::error::{Error, Result};
use ember::header::{Method, Mime, StatusCode, TokenEnum};
use ember::out::Out;
use ember::route::{finish_done, reject_header_loop, resolve_need_more_data, run_header_loop, HeaderLoopOutcome, Route, RouteOutcome};
use ember::server::Server;
use ember::socket::{Socket, SocketPool};
use ember::value::StringValue;

const VAULT_CAPACITY: usize = 4096;
const MAX_CLIENTS: usize = 16;

ember::request_header_set! {
    struct RequestHeaders<'a> {
        host: Host => StringValue<'a>,
    }
}

fn write_text(out: &mut Out<'_>, code: StatusCode, body: &[u8]) -> bool {
    out.write_status_line(ember::header::Version::Http11, code)
        && out.write_raw_header("Content-Type", Mime::TextPlain.token().as_bytes())
        && {
            let mut digits = [0u8; 20];
            let s = decimal(body.len(), &mut digits);
            out.write_raw_header("Content-Length", s)
        }
        && out.write_crlf()
        && out.write_bytes(body)
}

fn decimal(mut n: usize, buf: &mut [u8; 20]) -> &[u8] {
    if n == 0 {
        buf[0] = b'0';
        return &buf[..1];
    }
    let mut tmp = [0u8; 20];
    let mut i = 20;
    while n > 0 {
        i -= 1;
        tmp[i] = b'0' + (n % 10) as u8;
        n /= 10;
    }
    let len = 20 - i;
    buf[..len].copy_from_slice(&tmp[i..]);
    &buf[..len]
}

fn hello(_headers: &RequestHeaders<'_>, client: &mut Client<VAULT_CAPACITY>, out: &mut Out<'_>) -> bool {
    let _ = client.vault_mut().tail_free();
    write_text(out, StatusCode::Ok, b"hello from ember\n")
}

fn health(_headers: &RequestHeaders<'_>, client: &mut Client<VAULT_CAPACITY>, out: &mut Out<'_>) -> bool {
    let _ = client.vault_mut().tail_free();
    write_text(out, StatusCode::Ok, b"ok\n")
}

fn dispatch_with<const N: usize>(
    handler: fn(&RequestHeaders<'_>, &mut Client<N>, &mut Out<'_>) -> bool,
    client: &mut Client<N>,
    out: &mut Out<'_>,
) -> RouteOutcome {
    let mut headers = RequestHeaders::default();
    match run_header_loop(client.vault(), &mut headers) {
        outcome @ (HeaderLoopOutcome::Invalid | HeaderLoopOutcome::Unacceptable) => reject_header_loop(outcome),
        HeaderLoopOutcome::NeedMoreData => resolve_need_more_data(client, &mut headers),
        HeaderLoopOutcome::Done(consumed) => finish_done(&headers, client, out, consumed, handler),
    }
}

fn root_dispatch(client: &mut Client<VAULT_CAPACITY>, out: &mut Out<'_>) -> RouteOutcome {
    dispatch_with(hello, client, out)
}

fn health_dispatch(client: &mut Client<VAULT_CAPACITY>, out: &mut Out<'_>) -> RouteOutcome {
    dispatch_with(health, client, out)
}

/// One accepted TCP connection. Non-blocking so `recv` never stalls the
/// cooperative loop; readiness is established up front by `DemoPool`, so
/// the `WouldBlock` branch below is defensive, not load-bearing.
struct DemoSocket {
    stream: TcpStream,
    valid: bool,
}

impl DemoSocket {
    fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(DemoSocket { stream, valid: true })
    }
}

impl Socket for DemoSocket {
    fn recv(&mut self, buf: &mut [u8], _min: usize, max: usize) -> Result<usize> {
        match self.stream.read(&mut buf[..max]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => {
                self.valid = false;
                Err(Error::SocketError)
            }
        }
    }

    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write_all(buf).map(|_| buf.len()).map_err(|_| {
            self.valid = false;
            Error::SocketError
        })
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn reset(&mut self) {
        self.valid = true;
    }
}

/// A fixed-size slot table plus a readiness bitmap refreshed each
/// iteration by peeking every occupied socket. `peek` never consumes
/// bytes, so a connection that isn't actually readable is left alone for
/// the next poll.
struct DemoPool {
    sockets: [Option<DemoSocket>; MAX_CLIENTS],
    readable: [bool; MAX_CLIENTS],
}

impl DemoPool {
    fn new() -> Self {
        DemoPool { sockets: core::array::from_fn(|_| None), readable: [false; MAX_CLIENTS] }
    }
}

impl SocketPool<DemoSocket> for DemoPool {
    fn append(&mut self, socket: DemoSocket) -> bool {
        for (slot, ready) in self.sockets.iter_mut().zip(self.readable.iter_mut()) {
            if slot.is_none() {
                *slot = Some(socket);
                *ready = false;
                return true;
            }
        }
        false
    }

    fn remove(&mut self, index: usize) {
        self.sockets[index] = None;
        self.readable[index] = false;
    }

    fn socket_mut(&mut self, index: usize) -> &mut DemoSocket {
        self.sockets[index].as_mut().expect("socket_mut called on empty slot")
    }

    fn select_active(&mut self, timeout_ms: u64) -> Result<()> {
        std::thread::sleep(Duration::from_millis(timeout_ms));
        let mut probe = [0u8; 1];
        for (slot, ready) in self.sockets.iter().zip(self.readable.iter_mut()) {
            if let Some(socket) = slot {
                match socket.stream.peek(&mut probe) {
                    Ok(_) => *ready = true,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(_) => *ready = true,
                }
            }
        }
        Ok(())
    }

    fn is_readable(&self, index: usize) -> bool {
        self.readable.get(index).copied().unwrap_or(false)
    }

    fn get_readable_socket(&mut self, start_index: usize) -> Option<usize> {
        for i in start_index..MAX_CLIENTS {
            if self.readable[i] {
                self.readable[i] = false;
                return Some(i);
            }
        }
        None
    }
}

fn main() -> io::Result<()> {
    env_logger::init();

    let addr = "127.0.0.1:8080";
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    log::info!("listening on {addr}");

    let routes: [Route<VAULT_CAPACITY>; 2] = [
        Route::new(Method::Get.mask_bit(), b"/health", health_dispatch),
        Route::new(Method::Get.mask_bit(), b"/", root_dispatch),
    ];
    let mut server: Server<'_, VAULT_CAPACITY, MAX_CLIENTS> = Server::new(&routes);
    let mut pool = DemoPool::new();

    loop {
        match listener.accept() {
            Ok((stream, peer)) => match DemoSocket::new(stream) {
                Ok(socket) => {
                    if !server.accept_into(&mut pool, socket) {
                        log::warn!("dropping connection from {peer}: no free slot");
                    }
                }
                Err(e) => log::warn!("failed to configure socket from {peer}: {e}"),
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => log::warn!("accept failed: {e}"),
        }

        if let Err(e) = server.run_iteration(&mut pool, 20) {
            log::warn!("iteration failed: {e}");
        }
    }
}
