//! # minimta
//!
//! A minimal mail transfer agent implementing a simplified SMTP subset,
//! end to end: a grammar-driven command parser over a single-character
//! token scanner, a dialog state machine enforcing command ordering, a
//! server delivering accepted messages to per-domain mailboxes, and a
//! submission client transmitting locally composed messages over the
//! same protocol.
//!
//! ## Quick start (server)
//!
//! ```no_run
//! use minimta::{FileSink, SmtpServer};
//! use std::sync::Arc;
//!
//! let server = SmtpServer::new("mta.local");
//! let sink = Arc::new(FileSink::new("forward").unwrap());
//! server.start("127.0.0.1:2525", sink).unwrap();
//! ```
//!
//! ## Quick start (client)
//!
//! ```no_run
//! use minimta::{Domain, Email, submit_all};
//!
//! let domain: Domain = "client.local".parse().unwrap();
//! let email = Email::new(
//!     "alice@example.com".parse().unwrap(),
//!     vec!["bob@other.org".parse().unwrap()],
//!     "Subject: hi\n\nhello\n".to_string(),
//! );
//! submit_all("127.0.0.1:2525", &domain, &[email]).unwrap();
//! ```
//!
//! ## Supported commands
//!
//! - `HELO <domain>` - identify the peer, exactly once per session
//! - `MAIL FROM:<user@domain>` - open a message with its sender
//! - `RCPT TO:<user@domain>` - add a recipient (repeatable)
//! - `DATA` - body lines follow, terminated by a lone `.`
//! - `QUIT` - close the session
//!
//! ## Notes
//!
//! - Only a minimal command subset is implemented: no extensions,
//!   pipelining, TLS, or authentication.
//! - Body lines are taken verbatim; there is no dot-stuffing, so a body
//!   line of exactly `.` terminates the data phase.
//! - Messages are persisted per distinct recipient domain; recipients
//!   sharing a domain share one mailbox file.
//! - Sessions have no read or write deadlines; cancellation is
//!   peer-initiated only.

mod smtp;
pub mod trace;

pub use smtp::{
    ChannelSink, Command, CommandKind, Dialog, DialogState, Domain, Email, FileSink, Mailbox,
    MailSink, Reply, SmtpClient, SmtpError, SmtpLimits, SmtpServer, submit_all,
};
pub use smtp::{client, compose, deliver, email, error, grammar, response, scanner, server, session};
