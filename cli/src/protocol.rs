//! Client side of the length-prefixed wire protocol.
//!
//! Grounded on `examples/original_source/Redis/client.c`'s `send_req` and
//! `read_res`: one blocking round-trip per command, with the response
//! framed exactly as the server writes it (`u32 status | u32 data_len |
//! payload`, preceded by the overall `u32 total_len`).

use std::io::{self, Read, Write};
use std::net::TcpStream;

pub const STATUS_OK: u32 = 0;
pub const STATUS_ERR: u32 = 1;
pub const STATUS_NX: u32 = 2;

pub struct Response {
    pub status: u32,
    pub data: Vec<u8>,
}

pub fn send_request(stream: &mut TcpStream, args: &[String]) -> io::Result<()> {
    let mut body = Vec::new();
    body.extend_from_slice(&(args.len() as u32).to_be_bytes());
    for arg in args {
        let bytes = arg.as_bytes();
        body.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        body.extend_from_slice(bytes);
    }
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    stream.write_all(&frame)
}

pub fn read_response(stream: &mut TcpStream) -> io::Result<Response> {
    let total_len = read_u32(stream)?;
    let mut rest = vec![0u8; total_len as usize];
    stream.read_exact(&mut rest)?;
    if rest.len() < 8 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "truncated response frame"));
    }
    let status = u32::from_be_bytes(rest[0..4].try_into().unwrap());
    let data_len = u32::from_be_bytes(rest[4..8].try_into().unwrap()) as usize;
    let data = rest[8..8 + data_len].to_vec();
    Ok(Response { status, data })
}

fn read_u32(stream: &mut TcpStream) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Best-effort decode of a response payload for display: most replies are a
/// single blob, but `zrange` replies are `count | (len | bytes)*`. There is
/// no out-of-band type tag, so we try the multi-element framing first and
/// fall back to raw bytes if it doesn't account for the whole payload.
pub fn decode_payload_for_display(data: &[u8]) -> Vec<String> {
    if let Some(items) = try_decode_multi(data) {
        return items;
    }
    vec![String::from_utf8_lossy(data).into_owned()]
}

fn try_decode_multi(data: &[u8]) -> Option<Vec<String>> {
    if data.len() < 4 {
        return None;
    }
    let count = u32::from_be_bytes(data[0..4].try_into().ok()?) as usize;
    let mut cursor = 4;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        if data.len() < cursor + 4 {
            return None;
        }
        let len = u32::from_be_bytes(data[cursor..cursor + 4].try_into().ok()?) as usize;
        cursor += 4;
        if data.len() < cursor + len {
            return None;
        }
        items.push(String::from_utf8_lossy(&data[cursor..cursor + len]).into_owned());
        cursor += len;
    }
    if cursor == data.len() {
        Some(items)
    } else {
        None
    }
}
