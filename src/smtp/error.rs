//! Error types for the mail protocol core

use crate::smtp::response::Reply;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Command keyword not matched.
    #[error("Syntax error, command unrecognized")]
    Unrecognized,

    /// Keyword matched, parameters malformed.
    #[error("Syntax error in parameters or arguments")]
    ParamError,

    /// Well-formed command illegal in the current dialog state.
    #[error("Bad sequence of commands")]
    OutOfOrder,

    #[error("Line too long (max {max} characters)")]
    LineTooLong { max: usize },

    /// Accumulating message body exceeded the size cap; session-fatal.
    #[error("Message body too large (max {max} bytes)")]
    BodyTooLarge { max: usize },

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// The peer sent a reply line that does not match the reply shape.
    #[error("Malformed reply line: {0:?}")]
    MalformedReply(String),

    /// The peer replied with a different code than the step expects.
    #[error("Expected reply code {expected}, got {line:?}")]
    UnexpectedReply { expected: u16, line: String },

    /// The closing handshake itself failed after an aborted session. The
    /// failure that triggered the abort rides along as the source.
    #[error("Session ended without a valid closing acknowledgement")]
    UncleanTermination { source: Box<SmtpError> },

    #[error("Malformed message source: {0}")]
    Compose(String),
}

impl SmtpError {
    /// Reply emitted to the peer for session-recoverable failures.
    ///
    /// Anything else is session-fatal and produces no reply.
    pub fn reply(&self) -> Option<Reply> {
        match self {
            SmtpError::Unrecognized => Some(Reply::unrecognized()),
            SmtpError::ParamError => Some(Reply::param_error()),
            SmtpError::OutOfOrder => Some(Reply::out_of_order()),
            SmtpError::LineTooLong { max } => Some(Reply::new(
                500,
                &format!("Line too long (max {max} characters)"),
            )),
            _ => None,
        }
    }
}

/// Protocol size limits
pub struct SmtpLimits;

impl SmtpLimits {
    /// Maximum length of a command line including the newline
    pub const COMMAND_LINE_MAX_LENGTH: usize = 512;

    /// Maximum length of a mailbox local part
    pub const LOCAL_MAX_LENGTH: usize = 64;

    /// Maximum number of dot-separated elements in a domain
    pub const DOMAIN_MAX_ELEMENTS: usize = 32;

    /// Maximum total size of an accumulating message body
    pub const MAX_DATA_SIZE: usize = 10 * 1024 * 1024; // 10MB
}
