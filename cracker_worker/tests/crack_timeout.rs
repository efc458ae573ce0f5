//! S3 — an assignment that outlives its deadline stops without a match and
//! has reported at least one checkpoint along the way.
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cracker_core::candidate::{Base26Enumerator, PlaintextMatcher};
use cracker_worker::crack;
use cracker_worker::session::Session;

fn paired_session() -> (Arc<Mutex<Session>>, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = std::thread::spawn(move || Session::connect(addr).unwrap());
    let (server_side, _) = listener.accept().unwrap();
    let session = client.join().unwrap();
    (Arc::new(Mutex::new(session)), server_side)
}

#[test]
fn deadline_stops_the_loop_without_a_match_after_at_least_one_checkpoint() {
    let (session, mut server_side) = paired_session();
    server_side.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    // A huge range with a single thread and a tight deadline: the scan
    // cannot possibly exhaust it in 150ms, so the loop must stop on the
    // deadline rather than run forever.
    let outcome = crack::run(
        session,
        0,
        u64::MAX / 2,
        1,
        Duration::from_millis(150),
        1,
        Arc::new(Base26Enumerator),
        Arc::new(PlaintextMatcher),
        Arc::new("does-not-exist-anywhere-near-the-start".to_string()),
    );

    assert_eq!(outcome.found, None);
    assert!(outcome.last_checkpoint.is_some(), "at least one checkpoint should have been emitted");

    use std::io::Read;
    let mut buf = [0u8; 4096];
    let n = server_side.read(&mut buf).unwrap();
    let text = String::from_utf8_lossy(&buf[..n]);
    assert!(text.lines().any(|l| l.starts_with("CHECKPOINT ")));
}
