/**
 * The seven message kinds that make up the control protocol, grounded on
 * the reference implementation's `receive_hash` / `wait_for_work` /
 * `send_checkpoint` (`server_config.c`), which parse with `strncmp` prefix
 * checks and `sscanf("%lu %lu %u %u", ...)`.
 *
 * Every message is one `\n`-terminated ASCII line. Integer fields are
 * base-10, unsigned, no leading sign.
 */
use crate::cracker_error;
use crate::error::CrackerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `HASH <value>` — coordinator to worker, sent once at handshake.
    Hash(String),
    /// `READY` — worker to coordinator, acknowledges the hash.
    Ready,
    /// `WORK <start> <len> <checkpoint> <timeout>` — a work assignment.
    Work {
        start: u64,
        len: u64,
        checkpoint: u64,
        timeout: u32,
    },
    /// `STOP` — coordinator to worker, global termination.
    Stop,
    /// `CHECKPOINT <idx>` — worker to coordinator, progress report.
    Checkpoint(u64),
    /// `DONE` — worker to coordinator, unit finished with no match.
    Done,
    /// `FOUND <candidate>` — worker to coordinator, match found.
    Found(String),
}

impl Message {
    /// Renders the message as the exact bytes sent on the wire, including
    /// the trailing `\n`.
    pub fn encode(&self) -> String {
        match self {
            Message::Hash(h) => format!("HASH {h}\n"),
            Message::Ready => "READY\n".to_string(),
            Message::Work { start, len, checkpoint, timeout } => {
                format!("WORK {start} {len} {checkpoint} {timeout}\n")
            }
            Message::Stop => "STOP\n".to_string(),
            Message::Checkpoint(idx) => format!("CHECKPOINT {idx}\n"),
            Message::Done => "DONE\n".to_string(),
            Message::Found(candidate) => format!("FOUND {candidate}\n"),
        }
    }

    /// Parses a single line (no trailing `\n`, already stripped by the
    /// caller). Unrecognized prefixes are a hard `Protocol` error — there is
    /// no silent skipping of malformed input.
    pub fn parse(line: &str) -> Result<Message, CrackerError> {
        if let Some(rest) = line.strip_prefix("HASH ") {
            if rest.is_empty() {
                return Err(cracker_error!(Protocol, "HASH with empty value"));
            }
            return Ok(Message::Hash(rest.to_string()));
        }
        if line == "READY" {
            return Ok(Message::Ready);
        }
        if let Some(rest) = line.strip_prefix("WORK ") {
            let mut parts = rest.split(' ');
            let start = parse_field(&mut parts, "start")?;
            let len = parse_field(&mut parts, "len")?;
            let checkpoint = parse_field(&mut parts, "checkpoint")?;
            let timeout = parse_field(&mut parts, "timeout")?;
            if parts.next().is_some() {
                return Err(cracker_error!(Protocol, "WORK has trailing fields: {rest:?}"));
            }
            return Ok(Message::Work { start, len, checkpoint, timeout });
        }
        if line == "STOP" {
            return Ok(Message::Stop);
        }
        if let Some(rest) = line.strip_prefix("CHECKPOINT ") {
            let idx: u64 = rest
                .parse()
                .map_err(|_| cracker_error!(Protocol, "CHECKPOINT has non-numeric index: {rest:?}"))?;
            return Ok(Message::Checkpoint(idx));
        }
        if line == "DONE" {
            return Ok(Message::Done);
        }
        if let Some(rest) = line.strip_prefix("FOUND ") {
            if rest.is_empty() {
                return Err(cracker_error!(Protocol, "FOUND with empty candidate"));
            }
            return Ok(Message::Found(rest.to_string()));
        }

        Err(cracker_error!(Protocol, "unrecognized message: {line:?}"))
    }
}

fn parse_field<'a, T, I>(parts: &mut I, name: &str) -> Result<T, CrackerError>
where
    T: std::str::FromStr,
    I: Iterator<Item = &'a str>,
{
    let raw = parts
        .next()
        .ok_or_else(|| cracker_error!(Protocol, "missing {name} field"))?;
    raw.parse()
        .map_err(|_| cracker_error!(Protocol, "{name} field is not a valid unsigned integer: {raw:?}"))
}
