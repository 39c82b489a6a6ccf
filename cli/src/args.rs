//! Command-line argument parsing for the client.
//!
//! Mirrors `examples/original_source/Redis/client.c`'s argv handling: a host
//! and port, then either nothing (drop into the REPL) or a single command
//! to run once and exit.

pub struct Args {
    pub host: String,
    pub port: u16,
    pub one_shot: Option<Vec<String>>,
}

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 1234;

impl Args {
    pub fn parse() -> Self {
        let mut host = DEFAULT_HOST.to_owned();
        let mut port = DEFAULT_PORT;
        let mut rest = Vec::new();

        let mut args = std::env::args().skip(1).peekable();
        while let Some(arg) = args.peek() {
            match arg.as_str() {
                "--host" => {
                    args.next();
                    if let Some(v) = args.next() {
                        host = v;
                    }
                }
                "--port" => {
                    args.next();
                    if let Some(v) = args.next() {
                        if let Ok(p) = v.parse() {
                            port = p;
                        }
                    }
                }
                _ => break,
            }
        }
        rest.extend(args);

        Self {
            host,
            port,
            one_shot: if rest.is_empty() { None } else { Some(rest) },
        }
    }
}
