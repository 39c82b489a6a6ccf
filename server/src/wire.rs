//! Length-prefixed binary wire protocol.
//!
//! Grounded on `examples/original_source/Redis/server.c`'s `parse_req` and
//! `out_*` helpers and mirrored on the client side in `client.c`'s
//! `send_req`/`read_res`. Every frame starts with its own length, so a
//! connection can be fully pipelined: a peer may have several requests
//! in flight before reading any response.
//!
//! Request frame: `u32 total_len | u32 arg_count | (u32 len | bytes)*`
//! Response frame: `u32 total_len | u32 status | u32 data_len | payload`
//! Multi-element payload: `u32 count | (u32 len | bytes)*`

/// Hard cap on a single request's total size, including the arg-count and
/// length-prefix overhead. Matches the reference server's `k_max_msg`.
pub const MAX_MSG: usize = 32 * 1024 * 1024;
/// Hard cap on the number of arguments in one request.
pub const MAX_ARGS: usize = 200_000;

const LEN_PREFIX: usize = 4;

fn read_u32(buf: &[u8]) -> u32 {
    u32::from_be_bytes(buf[..4].try_into().unwrap())
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub struct Request {
    pub args: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    Err = 1,
    Nx = 2,
}

pub enum Payload {
    Empty,
    Single(Vec<u8>),
    Multi(Vec<Vec<u8>>),
}

pub struct Response {
    pub status: Status,
    pub payload: Payload,
}

impl Response {
    pub fn ok(payload: Payload) -> Self {
        Self { status: Status::Ok, payload }
    }

    pub fn nx() -> Self {
        Self { status: Status::Nx, payload: Payload::Empty }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Err,
            payload: Payload::Single(msg.into().into_bytes()),
        }
    }
}

pub enum ParseOutcome {
    /// Not enough bytes buffered yet; wait for more.
    Incomplete,
    /// A complete, well-formed request, and how many bytes it consumed.
    Request(Request, usize),
    /// The frame violates a hard limit; the connection must be closed.
    /// Carries the number of bytes to discard (irrelevant beyond marking
    /// the buffer dirty, since the caller closes the connection).
    Invalid(usize),
}

/// Attempt to parse one request from the front of `buf`. Does not mutate
/// `buf`; the caller drains the consumed prefix once it accepts the result.
pub fn try_parse_request(buf: &[u8]) -> ParseOutcome {
    if buf.len() < LEN_PREFIX {
        return ParseOutcome::Incomplete;
    }
    let total_len = read_u32(&buf[0..4]) as usize;
    if total_len > MAX_MSG {
        return ParseOutcome::Invalid(LEN_PREFIX);
    }
    if buf.len() < LEN_PREFIX + total_len {
        return ParseOutcome::Incomplete;
    }
    let frame = &buf[LEN_PREFIX..LEN_PREFIX + total_len];
    if frame.len() < 4 {
        return ParseOutcome::Invalid(LEN_PREFIX + total_len);
    }
    let arg_count = read_u32(&frame[0..4]) as usize;
    if arg_count > MAX_ARGS {
        return ParseOutcome::Invalid(LEN_PREFIX + total_len);
    }
    let mut args = Vec::with_capacity(arg_count);
    let mut cursor = 4;
    for _ in 0..arg_count {
        if frame.len() < cursor + 4 {
            return ParseOutcome::Invalid(LEN_PREFIX + total_len);
        }
        let arg_len = read_u32(&frame[cursor..cursor + 4]) as usize;
        cursor += 4;
        if frame.len() < cursor + arg_len {
            return ParseOutcome::Invalid(LEN_PREFIX + total_len);
        }
        args.push(frame[cursor..cursor + arg_len].to_vec());
        cursor += arg_len;
    }
    if cursor != frame.len() {
        return ParseOutcome::Invalid(LEN_PREFIX + total_len);
    }
    ParseOutcome::Request(Request { args }, LEN_PREFIX + total_len)
}

fn encode_payload(payload: &Payload, out: &mut Vec<u8>) {
    match payload {
        Payload::Empty => {}
        Payload::Single(bytes) => out.extend_from_slice(bytes),
        Payload::Multi(items) => {
            push_u32(out, items.len() as u32);
            for item in items {
                push_u32(out, item.len() as u32);
                out.extend_from_slice(item);
            }
        }
    }
}

/// Append `response`'s wire encoding to `out`.
pub fn encode_response(response: &Response, out: &mut Vec<u8>) {
    let mut data = Vec::new();
    encode_payload(&response.payload, &mut data);

    // total_len covers everything after itself: status + data_len + data
    push_u32(out, (4 + 4 + data.len()) as u32);
    push_u32(out, response.status as u32);
    push_u32(out, data.len() as u32);
    out.extend_from_slice(&data);
}

/// Encode a request frame. Used by the CLI client, never by the server.
pub fn encode_request(args: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, args.len() as u32);
    for arg in args {
        push_u32(&mut body, arg.len() as u32);
        body.extend_from_slice(arg);
    }
    let mut out = Vec::with_capacity(4 + body.len());
    push_u32(&mut out, body.len() as u32);
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrips_through_parse() {
        let args = vec![b"set".to_vec(), b"k".to_vec(), b"v".to_vec()];
        let encoded = encode_request(&args);
        match try_parse_request(&encoded) {
            ParseOutcome::Request(req, consumed) => {
                assert_eq!(consumed, encoded.len());
                assert_eq!(req.args, args);
            }
            _ => panic!("expected a complete request"),
        }
    }

    #[test]
    fn incomplete_frame_waits_for_more_bytes() {
        let args = vec![b"get".to_vec(), b"k".to_vec()];
        let encoded = encode_request(&args);
        assert!(matches!(
            try_parse_request(&encoded[..encoded.len() - 1]),
            ParseOutcome::Incomplete
        ));
    }

    #[test]
    fn oversized_total_len_is_rejected() {
        let buf = (MAX_MSG as u32 + 1).to_be_bytes();
        assert!(matches!(try_parse_request(&buf), ParseOutcome::Invalid(_)));
    }

    #[test]
    fn oversized_arg_count_is_rejected() {
        let mut frame = Vec::new();
        push_u32(&mut frame, MAX_ARGS as u32 + 1);
        let mut buf = Vec::new();
        push_u32(&mut buf, frame.len() as u32);
        buf.extend_from_slice(&frame);
        assert!(matches!(try_parse_request(&buf), ParseOutcome::Invalid(_)));
    }

    #[test]
    fn multi_payload_encodes_count_and_items() {
        let resp = Response::ok(Payload::Multi(vec![b"a".to_vec(), b"bb".to_vec()]));
        let mut out = Vec::new();
        encode_response(&resp, &mut out);
        let data_len = read_u32(&out[8..12]) as usize;
        let data = &out[12..12 + data_len];
        let count = read_u32(&data[0..4]);
        assert_eq!(count, 2);
    }

    #[test]
    fn pipelined_requests_parse_one_at_a_time() {
        let mut buf = encode_request(&[b"get".to_vec(), b"a".to_vec()]);
        buf.extend(encode_request(&[b"get".to_vec(), b"b".to_vec()]));
        let ParseOutcome::Request(first, consumed) = try_parse_request(&buf) else {
            panic!("expected request");
        };
        assert_eq!(first.args[1], b"a");
        let ParseOutcome::Request(second, _) = try_parse_request(&buf[consumed..]) else {
            panic!("expected second request");
        };
        assert_eq!(second.args[1], b"b");
    }
}
