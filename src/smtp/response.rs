//! Protocol reply handling
//!
//! A reply line is three ASCII digits, a space or tab separator, and a
//! non-empty ASCII message, newline-terminated. [`Reply::parse`] is the
//! client-side validator and rejects anything not of that exact shape.

use crate::smtp::error::SmtpError;

/// A numeric reply with its human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

impl Reply {
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }

    /// Session-start greeting (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new(220, &format!("{hostname} Service ready"))
    }

    /// Successfully sequenced command (250)
    pub fn ok() -> Self {
        Self::new(250, "OK")
    }

    /// HELO acknowledgement (250)
    pub fn helo(hostname: &str, client_domain: &str) -> Self {
        Self::new(250, &format!("{hostname} Hello {client_domain}"))
    }

    /// DATA accepted, ready for message input (354)
    pub fn data_start() -> Self {
        Self::new(354, "Start mail input; end with <CRLF>.<CRLF>")
    }

    /// Termination acknowledged (221)
    pub fn closing() -> Self {
        Self::new(221, "Service closing transmission channel")
    }

    /// Command keyword not matched (500)
    pub fn unrecognized() -> Self {
        Self::new(500, "Syntax error, command unrecognized")
    }

    /// Recognized command with malformed parameters (501)
    pub fn param_error() -> Self {
        Self::new(501, "Syntax error in parameters or arguments")
    }

    /// Grammatically valid command illegal in the current state (503)
    pub fn out_of_order() -> Self {
        Self::new(503, "Bad sequence of commands")
    }

    /// Format the reply for the wire
    pub fn format(&self) -> String {
        format!("{} {}\r\n", self.code, self.message)
    }

    /// Validate and parse a reply line received from the peer
    pub fn parse(line: &str) -> Result<Self, SmtpError> {
        let body = line.trim_end_matches(['\r', '\n']);
        let malformed = || SmtpError::MalformedReply(line.to_string());

        let mut chars = body.chars();
        let digits: String = chars.by_ref().take(3).collect();
        if digits.len() != 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        match chars.next() {
            Some(' ') | Some('\t') => {}
            _ => return Err(malformed()),
        }
        let message = chars.as_str();
        if message.is_empty() || !message.is_ascii() {
            return Err(malformed());
        }

        // The prefix is digits-only by construction above
        let code: u16 = digits.parse().map_err(|_| malformed())?;
        Ok(Self::new(code, message))
    }

    /// Check if this is a success reply (2xx or 3xx)
    pub fn is_positive(&self) -> bool {
        self.code < 400
    }
}
