use minimta::{FileSink, SmtpServer};
use std::env;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    minimta::trace::init();

    let args: Vec<String> = env::args().collect();

    let addr = if args.len() > 1 {
        args[1].as_str()
    } else {
        "127.0.0.1:2525"
    };

    let hostname = if args.len() > 2 {
        args[2].as_str()
    } else {
        "minimta.local"
    };

    let mailbox_dir = if args.len() > 3 {
        args[3].as_str()
    } else {
        "forward"
    };

    info!(addr, hostname, mailbox_dir, "starting minimta");

    let sink = match FileSink::new(mailbox_dir) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            error!(error = %e, "failed to open mailbox directory");
            std::process::exit(1);
        }
    };

    let server = SmtpServer::new(hostname);
    if let Err(e) = server.start(addr, sink) {
        error!(error = %e, "failed to start server");
        std::process::exit(1);
    }
}
