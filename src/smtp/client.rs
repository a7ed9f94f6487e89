//! Client-role session driver
//!
//! Mirror image of the server dialog: composes command lines, transmits
//! them, and validates the numeric reply code returned for each step. Any
//! mismatch aborts the remaining sequence; the termination handshake is
//! still attempted best-effort, and its failure is reported in its own
//! right rather than silently ignored.

use crate::smtp::email::Email;
use crate::smtp::error::SmtpError;
use crate::smtp::grammar::Domain;
use crate::smtp::response::Reply;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, error};

/// How long the best-effort closing handshake may wait for its reply
const QUIT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client session
#[derive(Debug)]
pub struct SmtpClient {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl SmtpClient {
    /// Connect and validate the 220 greeting
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, SmtpError> {
        let stream = TcpStream::connect(addr)?;
        let reader = BufReader::new(stream.try_clone()?);
        let mut client = Self { stream, reader };
        client.expect(220)?;
        Ok(client)
    }

    /// Read and validate one reply line from the server
    fn read_reply(&mut self) -> Result<Reply, SmtpError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(SmtpError::ConnectionClosed);
        }
        let reply = Reply::parse(&line)?;
        debug!(code = reply.code, "reply received");
        Ok(reply)
    }

    fn expect(&mut self, code: u16) -> Result<(), SmtpError> {
        let reply = self.read_reply()?;
        if reply.code != code {
            return Err(SmtpError::UnexpectedReply {
                expected: code,
                line: format!("{} {}", reply.code, reply.message),
            });
        }
        Ok(())
    }

    /// Send one command line and validate the expected reply code
    fn command(&mut self, line: &str, expected: u16) -> Result<(), SmtpError> {
        debug!(command = line, "sending");
        write!(self.stream, "{line}\r\n")?;
        self.stream.flush()?;
        self.expect(expected)
    }

    /// Identify ourselves; must precede the first message
    pub fn hello(&mut self, domain: &Domain) -> Result<(), SmtpError> {
        self.command(&format!("HELO {domain}"), 250)
    }

    /// Transmit one complete message over the established session
    pub fn send(&mut self, email: &Email) -> Result<(), SmtpError> {
        self.command(&format!("MAIL FROM:<{}>", email.from), 250)?;
        for rcpt in &email.to {
            self.command(&format!("RCPT TO:<{rcpt}>"), 250)?;
        }
        self.command("DATA", 354)?;

        self.stream.write_all(email.body.as_bytes())?;
        // The terminator must sit on its own line
        if !email.body.is_empty() && !email.body.ends_with('\n') {
            self.stream.write_all(b"\r\n")?;
        }
        self.stream.write_all(b".\r\n")?;
        self.stream.flush()?;
        self.expect(250)
    }

    /// Terminate the session and validate the closing acknowledgement
    pub fn quit(mut self) -> Result<(), SmtpError> {
        self.command("QUIT", 221)
    }

    /// Bound further reply reads, for the best-effort closing handshake
    fn bound_reads(&self, timeout: Duration) {
        let _ = self.stream.set_read_timeout(Some(timeout));
    }
}

/// Submit a batch of composed messages over one session
///
/// On any step failure the remaining messages are abandoned and the
/// termination handshake is attempted; when that handshake also fails the
/// session ended unclean, which is reported as its own failure.
pub fn submit_all(
    addr: impl ToSocketAddrs,
    helo_domain: &Domain,
    emails: &[Email],
) -> Result<(), SmtpError> {
    let mut client = SmtpClient::connect(addr)?;

    let outcome: Result<(), SmtpError> = (|| {
        client.hello(helo_domain)?;
        for email in emails {
            client.send(email)?;
            debug!(from = %email.from, "message accepted");
        }
        Ok(())
    })();

    match outcome {
        Ok(()) => client.quit(),
        Err(e) => {
            error!(error = %e, "aborting session");
            // Attempt the closing handshake, but never hang on it
            client.bound_reads(QUIT_TIMEOUT);
            if client.quit().is_err() {
                return Err(SmtpError::UncleanTermination {
                    source: Box::new(e),
                });
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::deliver::ChannelSink;
    use crate::smtp::server::SmtpServer;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn start_test_server() -> (String, mpsc::Receiver<Email>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let server = SmtpServer::new("test.local");
            let sink = Arc::new(ChannelSink::new(tx));
            let _ = server.start_with_listener(listener, sink);
        });
        (addr, rx)
    }

    fn email(from: &str, to: &[&str], body: &str) -> Email {
        Email::new(
            from.parse().unwrap(),
            to.iter().map(|t| t.parse().unwrap()).collect(),
            body.to_string(),
        )
    }

    #[test]
    fn test_submit_round_trip() {
        let (addr, rx) = start_test_server();
        let domain: Domain = "client.local".parse().unwrap();

        let sent = email("a@b.com", &["c@d.com"], "hello\n");
        submit_all(&addr, &domain, std::slice::from_ref(&sent)).unwrap();

        let received = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(received, sent);
    }

    #[test]
    fn test_submit_body_without_trailing_newline() {
        let (addr, rx) = start_test_server();
        let domain: Domain = "client.local".parse().unwrap();

        let sent = email("a@b.com", &["c@d.com"], "no newline");
        submit_all(&addr, &domain, &[sent]).unwrap();

        let received = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(received.body, "no newline\n");
    }

    #[test]
    fn test_submit_multiple_messages_one_session() {
        let (addr, rx) = start_test_server();
        let domain: Domain = "client.local".parse().unwrap();

        let first = email("a@b.com", &["one@d.com"], "first\n");
        let second = email("a@b.com", &["two@e.org", "three@e.org"], "second\n");
        submit_all(&addr, &domain, &[first.clone(), second.clone()]).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_millis(500)).unwrap(), first);
        assert_eq!(rx.recv_timeout(Duration::from_millis(500)).unwrap(), second);
    }

    #[test]
    fn test_malformed_reply_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"not a reply\r\n").unwrap();
        });

        let result = SmtpClient::connect(&addr);
        assert!(matches!(result, Err(SmtpError::MalformedReply(_))));
    }

    #[test]
    fn test_unexpected_code_aborts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"220 fake ready\r\n").unwrap();
            // Reject the HELO
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            stream.write_all(b"500 nope\r\n").unwrap();
        });

        let mut client = SmtpClient::connect(&addr).unwrap();
        let domain: Domain = "client.local".parse().unwrap();
        let result = client.hello(&domain);
        assert!(matches!(
            result,
            Err(SmtpError::UnexpectedReply { expected: 250, .. })
        ));
    }

    #[test]
    fn test_unclean_termination_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"220 fake ready\r\n").unwrap();
            // Hang up before acknowledging anything else
        });

        let domain: Domain = "client.local".parse().unwrap();
        let sent = email("a@b.com", &["c@d.com"], "body\n");
        match submit_all(&addr, &domain, &[sent]) {
            Err(SmtpError::UncleanTermination { source }) => {
                // The failure that aborted the session rides along
                assert!(matches!(
                    *source,
                    SmtpError::ConnectionClosed | SmtpError::Io(_)
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
