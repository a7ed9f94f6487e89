//! The message envelope passed between parser, dialog, and delivery

use crate::smtp::grammar::Mailbox;

/// A completed message: sender, at least one recipient, raw body text
///
/// Built incrementally across the dialog phases and immutable once the
/// data phase closes; handed by value to the delivery sink or transmitted
/// line by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// The sender's mailbox from MAIL FROM
    pub from: Mailbox,

    /// Recipient mailboxes from RCPT TO, in arrival order
    pub to: Vec<Mailbox>,

    /// Raw body text, each line newline-terminated
    pub body: String,
}

impl Email {
    pub fn new(from: Mailbox, to: Vec<Mailbox>, body: String) -> Self {
        Self { from, to, body }
    }

    /// Render the envelope plus body for persistence
    ///
    /// One `From:` line, one `To:` line per recipient, then the raw body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("From: <{}>\n", self.from));
        for rcpt in &self.to {
            out.push_str(&format!("To: <{}>\n", rcpt));
        }
        out.push_str(&self.body);
        out
    }

    /// Distinct recipient domains in first-seen order
    ///
    /// Recipients sharing a domain share one delivery destination.
    pub fn domains(&self) -> Vec<String> {
        let mut domains = Vec::new();
        for rcpt in &self.to {
            let name = rcpt.domain.to_string();
            if !domains.contains(&name) {
                domains.push(name);
            }
        }
        domains
    }

    /// Check if this email is addressed to a specific recipient
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.to.iter().any(|addr| addr.to_string() == recipient)
    }

    /// Get the size of the body in bytes
    pub fn body_size(&self) -> usize {
        self.body.len()
    }
}
