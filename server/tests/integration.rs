//! End-to-end tests driving a real `Engine` over a real TCP socket, in the
//! style of the teacher's own socket-level test harness: spin up the
//! engine on an ephemeral port in a background thread, connect a plain
//! `std::net::TcpStream`, and assert on wire bytes.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use keyd::config::ServerConfig;
use keyd::net::Engine;
use keyd::wire::encode_request;
use rand::seq::SliceRandom;
use rand::thread_rng;

struct Response {
    status: u32,
    data: Vec<u8>,
}

fn read_response(stream: &mut TcpStream) -> Response {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).expect("read total_len");
    let total_len = u32::from_be_bytes(len_buf) as usize;
    let mut rest = vec![0u8; total_len];
    stream.read_exact(&mut rest).expect("read response body");
    let status = u32::from_be_bytes(rest[0..4].try_into().unwrap());
    let data_len = u32::from_be_bytes(rest[4..8].try_into().unwrap()) as usize;
    Response {
        status,
        data: rest[8..8 + data_len].to_vec(),
    }
}

fn decode_multi(data: &[u8]) -> Vec<Vec<u8>> {
    let count = u32::from_be_bytes(data[0..4].try_into().unwrap()) as usize;
    let mut cursor = 4;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let len = u32::from_be_bytes(data[cursor..cursor + 4].try_into().unwrap()) as usize;
        cursor += 4;
        items.push(data[cursor..cursor + len].to_vec());
        cursor += len;
    }
    items
}

fn spawn_server() -> TcpStream {
    let cfg = ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        max_conns: 64,
    };
    let mut engine = Engine::bind(&cfg).expect("bind");
    let addr = engine.local_addr().expect("local_addr");
    thread::spawn(move || {
        let _ = engine.run();
    });
    // give the background thread a moment to enter its poll loop
    thread::sleep(Duration::from_millis(20));
    TcpStream::connect(addr).expect("connect")
}

fn send(stream: &mut TcpStream, args: &[&str]) -> Response {
    let encoded = encode_request(&args.iter().map(|s| s.as_bytes().to_vec()).collect::<Vec<_>>());
    stream.write_all(&encoded).expect("write request");
    read_response(stream)
}

#[test]
fn string_round_trip() {
    let mut conn = spawn_server();
    assert_eq!(send(&mut conn, &["set", "greeting", "hello"]).status, 0);
    let resp = send(&mut conn, &["get", "greeting"]);
    assert_eq!(resp.status, 0);
    assert_eq!(resp.data, b"hello");
    let resp = send(&mut conn, &["get", "missing"]);
    assert_eq!(resp.status, 2, "missing key should come back NX");
}

#[test]
fn type_guard_rejects_cross_type_access() {
    let mut conn = spawn_server();
    send(&mut conn, &["set", "k", "v"]);
    let resp = send(&mut conn, &["zadd", "k", "1", "m"]);
    assert_eq!(resp.status, 1, "zadd on a string key must error");
    let resp = send(&mut conn, &["get", "k"]);
    assert_eq!(resp.status, 0);
    assert_eq!(resp.data, b"v");
}

#[test]
fn sorted_set_preserves_ascending_score_order() {
    let mut conn = spawn_server();
    for (member, score) in [("a", "3"), ("b", "5"), ("c", "1"), ("d", "4")] {
        let resp = send(&mut conn, &["zadd", "leaderboard", score, member]);
        assert_eq!(resp.status, 0);
    }
    let resp = send(&mut conn, &["zrange", "leaderboard", "0", "-1"]);
    assert_eq!(resp.status, 0);
    let members = decode_multi(&resp.data);
    assert_eq!(members, vec![b"c".to_vec(), b"a".to_vec(), b"d".to_vec(), b"b".to_vec()]);

    // negative offsets count from the end: the top two scorers
    let resp = send(&mut conn, &["zrange", "leaderboard", "-2", "-1"]);
    assert_eq!(decode_multi(&resp.data), vec![b"d".to_vec(), b"b".to_vec()]);

    let resp = send(&mut conn, &["zscore", "leaderboard", "b"]);
    assert_eq!(resp.data, b"5");

    let resp = send(&mut conn, &["zcard", "leaderboard"]);
    assert_eq!(resp.data, 4u32.to_be_bytes().to_vec());

    let resp = send(&mut conn, &["zrem", "leaderboard", "b"]);
    assert_eq!(resp.status, 0);
    let resp = send(&mut conn, &["zcard", "leaderboard"]);
    assert_eq!(resp.data, 3u32.to_be_bytes().to_vec());

    let resp = send(&mut conn, &["zrem", "leaderboard", "b"]);
    assert_eq!(resp.status, 2, "removing an already-gone member should be NX");
}

#[test]
fn large_keyspace_survives_progressive_rehash() {
    let mut conn = spawn_server();
    const N: usize = 100_000;
    // random insertion order so the test doesn't depend on keys landing in
    // bucket/rehash order by coincidence of being inserted sequentially
    let mut order: Vec<usize> = (0..N).collect();
    order.shuffle(&mut thread_rng());
    for &i in &order {
        let key = format!("key{i}");
        let value = format!("val{i}");
        let resp = send(&mut conn, &["set", &key, &value]);
        assert_eq!(resp.status, 0, "set failed at key {i}");
    }
    let mut sample: Vec<usize> = (0..N).step_by(997).collect();
    sample.shuffle(&mut thread_rng());
    for i in sample {
        let key = format!("key{i}");
        let expected = format!("val{i}");
        let resp = send(&mut conn, &["get", &key]);
        assert_eq!(resp.status, 0, "lost key {i} during rehash");
        assert_eq!(resp.data, expected.as_bytes());
    }
}

#[test]
fn pipelined_requests_are_answered_in_order() {
    let mut conn = spawn_server();
    let mut batch = Vec::new();
    for i in 0..200 {
        batch.extend(encode_request(&[
            b"set".to_vec(),
            format!("p{i}").into_bytes(),
            format!("v{i}").into_bytes(),
        ]));
    }
    conn.write_all(&batch).expect("write pipelined sets");
    for _ in 0..200 {
        assert_eq!(read_response(&mut conn).status, 0);
    }

    let mut batch = Vec::new();
    for i in 0..200 {
        batch.extend(encode_request(&[b"get".to_vec(), format!("p{i}").into_bytes()]));
    }
    conn.write_all(&batch).expect("write pipelined gets");
    for i in 0..200 {
        let resp = read_response(&mut conn);
        assert_eq!(resp.status, 0);
        assert_eq!(resp.data, format!("v{i}").into_bytes());
    }
}

#[test]
fn large_response_is_delivered_across_multiple_writes() {
    let mut conn = spawn_server();
    const MEMBERS: usize = 5_000;
    for i in 0..MEMBERS {
        let resp = send(&mut conn, &["zadd", "big", &i.to_string(), &format!("m{i}")]);
        assert_eq!(resp.status, 0);
    }
    let resp = send(&mut conn, &["zrange", "big", "0", "-1"]);
    assert_eq!(resp.status, 0);
    let members = decode_multi(&resp.data);
    assert_eq!(members.len(), MEMBERS);
    // ascending score order: m0 has the lowest score, so it comes first
    assert_eq!(members[0], b"m0".to_vec());
    assert_eq!(members[MEMBERS - 1], format!("m{}", MEMBERS - 1).into_bytes());
}
