/*!
 * Buffered line framing over an arbitrary `Read` stream.
 *
 * `try_take_line` is the pure, socket-free half: it looks for a `\n` in an
 * accumulating byte buffer and returns `None` ("need more input") until one
 * shows up, rather than treating a truncated buffer as a parse error. This
 * is what a multi-message buffer split across TCP reads needs, and it is
 * what the S6 round-trip property in the acceptance tests exercises
 * directly without a socket.
 */
use std::io::Read;

use crate::cracker_error;
use crate::error::CrackerError;
use crate::protocol::message::Message;

/// Consumes one complete line from `buf` if present, returning the parsed
/// message and draining the consumed bytes (including the `\n`). Returns
/// `None` if `buf` does not yet contain a full line.
pub fn try_take_line(buf: &mut Vec<u8>) -> Option<Result<Message, CrackerError>> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buf.drain(..=pos).collect();
    let text = match std::str::from_utf8(&line[..line.len() - 1]) {
        Ok(t) => t,
        Err(_) => return Some(Err(cracker_error!(Protocol, "message is not valid utf-8"))),
    };
    Some(Message::parse(text))
}

/// Wraps a `Read` stream with the buffering `try_take_line` needs, blocking
/// on the underlying reader until a full message is available.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buf: Vec::new() }
    }

    /// Blocks until a full message has arrived and parses it. Returns an
    /// `Io` error if the peer closes the connection mid-message.
    pub fn read_message(&mut self) -> Result<Message, CrackerError> {
        loop {
            if let Some(result) = try_take_line(&mut self.buf) {
                return result;
            }
            let mut chunk = [0u8; 4096];
            let n = self
                .inner
                .read(&mut chunk)
                .map_err(|e| cracker_error!(Io, "read failed: {e}"))?;
            if n == 0 {
                return Err(cracker_error!(Io, "connection closed by peer"));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_more_input_on_truncated_buffer() {
        let mut buf = b"REA".to_vec();
        assert!(try_take_line(&mut buf).is_none());
        assert_eq!(buf, b"REA");
    }

    #[test]
    fn parses_once_newline_arrives() {
        let mut buf = b"REA".to_vec();
        buf.extend_from_slice(b"DY\n");
        assert_eq!(try_take_line(&mut buf).unwrap().unwrap(), Message::Ready);
        assert!(buf.is_empty());
    }

    #[test]
    fn splits_two_messages_in_one_buffer() {
        let mut buf = b"DONE\nREADY\n".to_vec();
        assert_eq!(try_take_line(&mut buf).unwrap().unwrap(), Message::Done);
        assert_eq!(try_take_line(&mut buf).unwrap().unwrap(), Message::Ready);
        assert!(try_take_line(&mut buf).is_none());
    }

    #[test]
    fn line_reader_parses_a_message_from_an_underlying_stream() {
        use std::io::Cursor;
        let mut lr = LineReader::new(Cursor::new(b"CHECKPOINT 128\nDONE\n".to_vec()));
        assert_eq!(lr.read_message().unwrap(), Message::Checkpoint(128));
        assert_eq!(lr.read_message().unwrap(), Message::Done);
        assert!(lr.read_message().is_err());
    }
}
