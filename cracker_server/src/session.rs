/*!
 * One worker's control-socket connection, from the coordinator's side.
 * Mirrors `cracker_worker::session::Session`; kept as its own small type
 * here because the coordinator additionally needs to hand out clones of
 * the write half to the liveness sweep and the dispatcher, which never
 * read from the socket themselves.
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
    pub fn from_stream(stream: TcpStream) -> Result<Self, CrackerError> {
        let read_half = stream
            .try_clone()
            .map_err(|e| cracker_error!(Socket, "failed to clone accepted socket: {e}"))?;
        Ok(Self { write: stream, reader: LineReader::new(read_half) })
    }

    /// A third clone of the socket, independent of both the read half held
    /// by `reader` and the write half held by `write`. Lets a caller shut
    /// the connection down without ever taking the `Mutex<Session>` that
    /// guards `send`/`recv` — the liveness sweep uses this so it never has
    /// to contend with a handler thread parked in a blocking `recv`.
    pub fn shutdown_handle(stream: &TcpStream) -> Result<TcpStream, CrackerError> {
        stream
            .try_clone()
            .map_err(|e| cracker_error!(Socket, "failed to clone accepted socket: {e}"))
    }

    pub fn send(&mut self, msg: &Message) -> Result<(), CrackerError> {
        self.write
            .write_all(msg.encode().as_bytes())
            .map_err(|e| cracker_error!(Io, "send failed: {e}"))
    }

    pub fn recv(&mut self) -> Result<Message, CrackerError> {
        self.reader.read_message()
    }

    pub fn close(&mut self) {
        let _ = self.write.shutdown(std::net::Shutdown::Both);
    }
}
