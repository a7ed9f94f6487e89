//! Server-role session driver
//!
//! Accepts connections and drives the dialog state machine against each
//! inbound line stream: greeting, reply per command, data-phase
//! accumulation, delivery of completed messages to the sink. One worker
//! thread per connection; a session owns its dialog exclusively. All I/O
//! is line-sequential with no pipelining, and there are no read or write
//! deadlines (peer-initiated cancellation only).

use crate::smtp::deliver::MailSink;
use crate::smtp::error::SmtpError;
use crate::smtp::response::Reply;
use crate::smtp::session::Dialog;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// The SMTP listener: accepts connections and forwards accepted messages
/// to the delivery sink
#[derive(Debug, Clone)]
pub struct SmtpServer {
    hostname: String,
}

impl SmtpServer {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_owned(),
        }
    }

    /// Bind the address and serve until the listener fails (blocking)
    pub fn start(&self, addr: &str, sink: Arc<dyn MailSink>) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener, sink)
    }

    /// Serve on an existing listener (blocking)
    pub fn start_with_listener(
        &self,
        listener: TcpListener,
        sink: Arc<dyn MailSink>,
    ) -> Result<(), SmtpError> {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let hostname = self.hostname.clone();
                    let sink = Arc::clone(&sink);
                    thread::spawn(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        debug!(%peer, "connection accepted");
                        if let Err(e) = handle_client(&hostname, stream, sink.as_ref()) {
                            warn!(%peer, error = %e, "session ended with error");
                        } else {
                            debug!(%peer, "session closed");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "error accepting connection");
                }
            }
        }

        Ok(())
    }
}

/// Drive one session to completion
fn handle_client(hostname: &str, mut stream: TcpStream, sink: &dyn MailSink) -> Result<(), SmtpError> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut dialog = Dialog::new(hostname);

    send_reply(&mut stream, &Reply::greeting(hostname))?;

    let mut line_buffer = Vec::new();
    loop {
        line_buffer.clear();
        if reader.read_until(b'\n', &mut line_buffer)? == 0 {
            // Peer closed without QUIT
            debug!("connection closed by peer");
            return Ok(());
        }
        // Invalid UTF-8 degrades to replacement characters, which the
        // scanner classifies as unrecognized tokens
        let line = String::from_utf8_lossy(&line_buffer).into_owned();

        if dialog.in_data() {
            if let Some(email) = dialog.data_line(&line)? {
                debug!(
                    from = %email.from,
                    recipients = email.to.len(),
                    bytes = email.body_size(),
                    "message completed"
                );
                // Sink failures are session-fatal, never a protocol reply
                sink.deliver(&email)?;
                send_reply(&mut stream, &Reply::ok())?;
            }
            continue;
        }

        match dialog.apply(&line) {
            Ok(reply) => {
                send_reply(&mut stream, &reply)?;
                if dialog.terminated() {
                    return Ok(());
                }
            }
            Err(e) => match e.reply() {
                Some(reply) => {
                    debug!(error = %e, "recoverable protocol failure");
                    send_reply(&mut stream, &reply)?;
                }
                None => return Err(e),
            },
        }
    }
}

/// Write one reply line and flush before the next read
fn send_reply(stream: &mut TcpStream, reply: &Reply) -> Result<(), SmtpError> {
    stream.write_all(reply.format().as_bytes())?;
    stream.flush()?;
    Ok(())
}
