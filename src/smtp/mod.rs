//! Mail transfer protocol implementation

pub mod client;
pub mod compose;
pub mod deliver;
pub mod email;
pub mod error;
pub mod grammar;
pub mod response;
pub mod scanner;
pub mod server;
pub mod session;

pub use client::{SmtpClient, submit_all};
pub use deliver::{ChannelSink, FileSink, MailSink};
pub use email::Email;
pub use error::{SmtpError, SmtpLimits};
pub use grammar::{Command, CommandKind, Domain, Mailbox};
pub use response::Reply;
pub use server::SmtpServer;
pub use session::{Dialog, DialogState};
