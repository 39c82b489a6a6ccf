//! Library surface for the `keyd` binary, split out so integration tests
//! can drive a real [`Engine`] over a real socket instead of shelling out to
//! the compiled binary.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod keyspace;
pub mod net;
pub mod rehash;
pub mod wire;
pub mod zset;

use config::ServerConfig;
use error::SkyResult;
use net::Engine;

/// Reads `SKY_LOG` the same way the reference CLI does; defaults to `info`.
pub fn init_logger() {
    let mut builder = env_logger::Builder::new();
    match std::env::var("SKY_LOG") {
        Ok(spec) => builder.parse_filters(&spec),
        Err(_) => builder.filter_level(log::LevelFilter::Info),
    };
    let _ = builder.try_init();
}

/// Load configuration, bind the listener and run the connection engine
/// until a fatal error tears it down.
pub fn run() -> SkyResult<()> {
    let cfg = ServerConfig::load()?;
    let mut engine = Engine::bind(&cfg)?;
    engine.run()
}
