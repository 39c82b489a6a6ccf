mod args;
mod protocol;
mod repl;

use std::net::TcpStream;
use std::process;

use libsky::util::terminal;

use args::Args;

fn main() {
    let args = Args::parse();

    let mut stream = match TcpStream::connect((args.host.as_str(), args.port)) {
        Ok(s) => s,
        Err(e) => {
            let _ = terminal::write_error(format!(
                "could not connect to {}:{}: {e}\n",
                args.host, args.port
            ));
            process::exit(1);
        }
    };

    match args.one_shot {
        Some(cmd_args) => run_one_shot(&mut stream, &cmd_args),
        None => repl::run(stream),
    }
}

fn run_one_shot(stream: &mut TcpStream, cmd_args: &[String]) {
    if let Err(e) = protocol::send_request(stream, cmd_args) {
        let _ = terminal::write_error(format!("write error: {e}\n"));
        process::exit(1);
    }
    match protocol::read_response(stream) {
        Ok(resp) => {
            if resp.status == protocol::STATUS_ERR {
                let _ = terminal::write_error(format!(
                    "(error) {}\n",
                    String::from_utf8_lossy(&resp.data)
                ));
                process::exit(1);
            }
            let items = protocol::decode_payload_for_display(&resp.data);
            println!("{}", items.join(" "));
        }
        Err(e) => {
            let _ = terminal::write_error(format!("read error: {e}\n"));
            process::exit(1);
        }
    }
}
