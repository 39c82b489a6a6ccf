//! Interactive REPL, styled after the reference `cli/src/repl.rs`: a
//! `rustyline` editor for history and line-editing, each line tokenized and
//! sent as one request.

use std::net::TcpStream;

use libsky::util::terminal;
use rustyline::error::ReadlineError;
use rustyline::Editor;

use crate::protocol::{self, STATUS_ERR, STATUS_NX, STATUS_OK};

pub fn run(mut stream: TcpStream) {
    let mut editor = Editor::<()>::new();
    loop {
        match editor.readline("keyd> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line);
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                let args = libsky::split_into_args(line);
                run_one(&mut stream, &args);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                let _ = terminal::write_error(format!("readline error: {e}\n"));
                break;
            }
        }
    }
}

fn run_one(stream: &mut TcpStream, args: &[String]) {
    if let Err(e) = protocol::send_request(stream, args) {
        let _ = terminal::write_error(format!("write error: {e}\n"));
        return;
    }
    match protocol::read_response(stream) {
        Ok(resp) => print_response(&resp),
        Err(e) => {
            let _ = terminal::write_error(format!("read error: {e}\n"));
        }
    }
}

fn print_response(resp: &protocol::Response) {
    match resp.status {
        STATUS_OK => {
            let items = protocol::decode_payload_for_display(&resp.data);
            if items.is_empty() || (items.len() == 1 && items[0].is_empty()) {
                let _ = terminal::write_success("OK\n");
            } else {
                let _ = terminal::write_success(format!("{}\n", items.join(" ")));
            }
        }
        STATUS_NX => {
            let _ = terminal::write_warning("(nil)\n");
        }
        STATUS_ERR => {
            let msg = String::from_utf8_lossy(&resp.data);
            let _ = terminal::write_error(format!("(error) {msg}\n"));
        }
        other => {
            let _ = terminal::write_error(format!("unknown status code {other}\n"));
        }
    }
}
