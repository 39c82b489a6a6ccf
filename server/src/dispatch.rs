//! Command dispatch: look up the handler for a request's first argument and
//! run it against the keyspace.
//!
//! Grounded on `examples/original_source/Redis/server.c`'s `do_request`,
//! which switches on the command name and has a hand-written handler per
//! command; the static table here is the same idea with Rust's type system
//! doing the argument-count checking instead of ad-hoc `if` chains.

use crate::keyspace::{Keyspace, Value};
use crate::wire::{Payload, Request, Response};

type Handler = fn(&mut Keyspace, &[Vec<u8>]) -> Response;

const COMMANDS: &[(&str, Handler)] = &[
    ("get", cmd_get),
    ("set", cmd_set),
    ("del", cmd_del),
    ("zadd", cmd_zadd),
    ("zrem", cmd_zrem),
    ("zscore", cmd_zscore),
    ("zcard", cmd_zcard),
    ("zrange", cmd_zrange),
];

pub fn dispatch(keyspace: &mut Keyspace, req: &Request) -> Response {
    let Some(cmd_bytes) = req.args.first() else {
        return Response::err("empty request");
    };
    let Ok(cmd) = std::str::from_utf8(cmd_bytes) else {
        return Response::err("command name must be valid UTF-8");
    };
    let cmd_lower = cmd.to_ascii_lowercase();
    match COMMANDS.iter().find(|(name, _)| *name == cmd_lower) {
        Some((_, handler)) => handler(keyspace, &req.args[1..]),
        None => Response::err(format!("unknown command '{cmd}'")),
    }
}

/// Error for a zset command aimed at a key that already holds a string.
fn wrong_type() -> Response {
    Response::err("key exists and is not a sorted set")
}

/// Error for a string command (`get`/`set`) aimed at a key that already
/// holds a sorted set.
fn not_a_string() -> Response {
    Response::err("key exists and is not a string")
}

fn parse_f64(bytes: &[u8], what: &str) -> Result<f64, Response> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Response::err(format!("{what} is not a valid float")))
}

fn parse_i64(bytes: &[u8], what: &str) -> Result<i64, Response> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Response::err(format!("{what} is not a valid integer")))
}

fn u32_be(v: u32) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

fn cmd_get(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key] = args else {
        return Response::err("wrong number of arguments for 'get'");
    };
    match keyspace.get(key) {
        Some(Value::Str(v)) => Response::ok(Payload::Single(v.clone())),
        Some(Value::ZSet(_)) => not_a_string(),
        None => Response::nx(),
    }
}

fn cmd_set(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key, value] = args else {
        return Response::err("wrong number of arguments for 'set'");
    };
    keyspace.set(key, Value::Str(value.clone()));
    Response::ok(Payload::Empty)
}

fn cmd_del(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key] = args else {
        return Response::err("wrong number of arguments for 'del'");
    };
    if keyspace.delete(key) {
        Response::ok(Payload::Empty)
    } else {
        Response::nx()
    }
}

fn cmd_zadd(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key, score, member] = args else {
        return Response::err("wrong number of arguments for 'zadd'");
    };
    let score = match parse_f64(score, "score") {
        Ok(s) => s,
        Err(e) => return e,
    };
    match keyspace.zset_entry_or_insert(key) {
        Ok(zset) => {
            let added = zset.insert(member, score);
            Response::ok(Payload::Single(vec![added as u8]))
        }
        Err(_) => wrong_type(),
    }
}

fn cmd_zrem(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key, member] = args else {
        return Response::err("wrong number of arguments for 'zrem'");
    };
    match keyspace.zset_entry(key) {
        Ok(Some(zset)) => {
            if zset.delete(member) {
                Response::ok(Payload::Empty)
            } else {
                Response::nx()
            }
        }
        Ok(None) => Response::nx(),
        Err(_) => wrong_type(),
    }
}

fn cmd_zscore(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key, member] = args else {
        return Response::err("wrong number of arguments for 'zscore'");
    };
    match keyspace.zset_entry(key) {
        Ok(Some(zset)) => match zset.lookup(member) {
            Some(score) => Response::ok(Payload::Single(format_score(score))),
            None => Response::nx(),
        },
        Ok(None) => Response::nx(),
        Err(_) => wrong_type(),
    }
}

fn cmd_zcard(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key] = args else {
        return Response::err("wrong number of arguments for 'zcard'");
    };
    match keyspace.zset_entry(key) {
        Ok(Some(zset)) => Response::ok(Payload::Single(u32_be(zset.cardinality() as u32))),
        Ok(None) => Response::ok(Payload::Single(u32_be(0))),
        Err(_) => wrong_type(),
    }
}

fn cmd_zrange(keyspace: &mut Keyspace, args: &[Vec<u8>]) -> Response {
    let [key, lo, hi] = args else {
        return Response::err("wrong number of arguments for 'zrange'");
    };
    let lo = match parse_i64(lo, "lo") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let hi = match parse_i64(hi, "hi") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match keyspace.zset_entry(key) {
        Ok(Some(zset)) => {
            let members = zset.range(lo, hi).into_iter().map(|(member, _)| member).collect();
            Response::ok(Payload::Multi(members))
        }
        Ok(None) => Response::ok(Payload::Multi(Vec::new())),
        Err(_) => wrong_type(),
    }
}

/// Formats `score` the way the C reference's `%.17g` would: the shorter of
/// fixed or scientific notation at 17 significant digits, trailing zeros
/// stripped.
fn format_score(score: f64) -> Vec<u8> {
    format_g(score, 17).into_bytes()
}

fn format_g(value: f64, precision: i32) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".to_owned() } else { "0".to_owned() };
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let sci = format!("{:.*e}", (precision - 1).max(0) as usize, value);
    let epos = sci.find('e').expect("scientific format always has an exponent");
    let mantissa = &sci[..epos];
    let exponent: i32 = sci[epos + 1..].parse().expect("exponent is always an integer");

    if exponent < -4 || exponent >= precision {
        format!("{}e{:+03}", trim_trailing_zeros(mantissa), exponent)
    } else {
        let frac_digits = (precision - 1 - exponent).max(0) as usize;
        trim_trailing_zeros(&format!("{value:.frac_digits$}"))
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_owned();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_owned()
}
