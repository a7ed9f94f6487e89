use minimta::{Domain, compose, submit_all};
use std::env;
use std::fs::File;
use std::io::BufReader;
use tracing::{error, info};

fn main() {
    minimta::trace::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: submit <message-file> [addr] [helo-domain]");
        std::process::exit(2);
    }

    let path = args[1].as_str();

    let addr = if args.len() > 2 {
        args[2].as_str()
    } else {
        "127.0.0.1:2525"
    };

    let helo_domain: Domain = args
        .get(3)
        .map(String::as_str)
        .unwrap_or("minimta.local")
        .parse()
        .unwrap_or_else(|e| {
            error!(error = %e, "invalid HELO domain");
            std::process::exit(2);
        });

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!(path, error = %e, "cannot open message file");
            std::process::exit(1);
        }
    };

    let messages = match compose::read_messages(BufReader::new(file)) {
        Ok(messages) => messages,
        Err(e) => {
            error!(path, error = %e, "cannot read composed messages");
            std::process::exit(1);
        }
    };

    if messages.is_empty() {
        info!(path, "nothing to submit");
        return;
    }

    info!(count = messages.len(), addr, "submitting");
    if let Err(e) = submit_all(addr, &helo_domain, &messages) {
        error!(error = %e, "submission failed");
        std::process::exit(1);
    }

    info!("all messages accepted");
}
