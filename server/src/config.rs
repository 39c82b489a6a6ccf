//! Server configuration.
//!
//! Layered the way the reference server's CLI/env configuration is layered:
//! command-line flags win, then environment variables, then the hardcoded
//! defaults from the wire spec. There is no config file here -- the sections
//! a file would carry (TLS, BGSAVE, snapshots) belong to subsystems this
//! server doesn't have.

use std::env;

use crate::error::{Error, SkyResult};
use crate::net::MAX_CONNS;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 1234;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_conns: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            max_conns: MAX_CONNS,
        }
    }
}

impl ServerConfig {
    /// Parse `--host`, `--port` and `--max-conns` from the process arguments,
    /// falling back to `SKY_HOST`, `SKY_PORT` and `SKY_MAX_CONNS`, and finally
    /// to the compiled-in defaults.
    pub fn load() -> SkyResult<Self> {
        let mut cfg = Self::default();
        if let Ok(host) = env::var("SKY_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = env::var("SKY_PORT") {
            cfg.port = parse_port(&port)?;
        }
        if let Ok(maxconn) = env::var("SKY_MAX_CONNS") {
            cfg.max_conns = parse_maxconn(&maxconn)?;
        }

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" => {
                    cfg.host = next_value(&mut args, "--host")?;
                }
                "--port" => {
                    cfg.port = parse_port(&next_value(&mut args, "--port")?)?;
                }
                "--max-conns" => {
                    cfg.max_conns = parse_maxconn(&next_value(&mut args, "--max-conns")?)?;
                }
                other => {
                    return Err(Error::fatal(format!("unrecognized argument '{other}'")));
                }
            }
        }
        Ok(cfg)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> SkyResult<String> {
    args.next()
        .ok_or_else(|| Error::fatal(format!("missing value for '{flag}'")))
}

fn parse_port(s: &str) -> SkyResult<u16> {
    s.parse()
        .map_err(|_| Error::fatal(format!("invalid port '{s}'")))
}

fn parse_maxconn(s: &str) -> SkyResult<usize> {
    s.parse()
        .map_err(|_| Error::fatal(format!("invalid max-conns '{s}'")))
}
