//! Entry point: read configuration, bind the listener, run the connection
//! engine until a fatal error or signal tears it down.

#[cfg(all(not(target_env = "msvc"), not(miri)))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

use std::process;

fn main() {
    keyd::init_logger();
    if let Err(e) = keyd::run() {
        log::error!("fatal: {e}");
        process::exit(1);
    }
}
