/*!
 * The worker's single control-socket connection: one write half, one
 * buffered read half. Cloned into an `Arc<Mutex<Session>>` for the crack
 * loop, whose threads only ever write (`CHECKPOINT` / `FOUND`) — nothing
 * reads from the socket while a unit is being cracked.
 */
use std::io::Write;
use std::net::TcpStream;

use cracker_core::cracker_error;
use cracker_core::error::CrackerError;
use cracker_core::protocol::{LineReader, Message};

pub struct Session {
    write: TcpStream,
    reader: LineReader<TcpStream>,
}

impl Session {
    pub fn connect(addr: std::net::SocketAddr) -> Result<Self, CrackerError> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| cracker_error!(Socket, "connect to {addr} failed: {e}"))?;
        let read_half = stream
            .try_clone()
            .map_err(|e| cracker_error!(Socket, "failed to clone socket: {e}"))?;
        Ok(Self { write: stream, reader: LineReader::new(read_half) })
    }

    pub fn send(&mut self, msg: &Message) -> Result<(), CrackerError> {
        self.write
            .write_all(msg.encode().as_bytes())
            .map_err(|e| cracker_error!(Io, "send failed: {e}"))
    }

    pub fn recv(&mut self) -> Result<Message, CrackerError> {
        self.reader.read_message()
    }
}
