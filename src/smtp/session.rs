//! Dialog state machine
//!
//! Sequences the legal command order for one session and maps parser
//! failures plus out-of-sequence commands to reply codes. Failure
//! precedence is externally observable protocol behavior and is fixed:
//! keyword-unrecognized first, then state legality, then parameter
//! well-formedness. Gibberish always reports 500, even in a state where
//! no command would be legal.

use crate::smtp::email::Email;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::grammar::{Command, CommandKind, Domain, Mailbox};
use crate::smtp::response::Reply;
use crate::smtp::scanner::TokenScanner;

/// Position in the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// Session start, exactly one successful HELO required
    AwaitingGreeting,
    /// Ready for MAIL FROM (also the state after each completed message)
    AwaitingSender,
    /// Sender accepted, first RCPT TO required
    AwaitingRecipient,
    /// At least one recipient accepted; more RCPT TO or DATA
    RecipientsOrData,
    /// Data phase: lines accumulate verbatim until a lone `.`
    InData,
    /// Explicit quit acknowledged; no further commands
    Terminated,
}

/// State and in-progress envelope for a single session
///
/// Exclusively owned by its session worker; never shared across
/// connections.
#[derive(Debug)]
pub struct Dialog {
    hostname: String,
    state: DialogState,
    client_domain: Option<Domain>,
    sender: Option<Mailbox>,
    recipients: Vec<Mailbox>,
    body: String,
}

impl Dialog {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            state: DialogState::AwaitingGreeting,
            client_domain: None,
            sender: None,
            recipients: Vec::new(),
            body: String::new(),
        }
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    /// Whether the session is in the data sub-mode
    pub fn in_data(&self) -> bool {
        self.state == DialogState::InData
    }

    pub fn terminated(&self) -> bool {
        self.state == DialogState::Terminated
    }

    /// Domain announced by the peer's HELO, once greeted
    pub fn client_domain(&self) -> Option<&Domain> {
        self.client_domain.as_ref()
    }

    /// Which routines are legal in the current state
    fn legal(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Helo => self.state == DialogState::AwaitingGreeting,
            CommandKind::MailFrom => self.state == DialogState::AwaitingSender,
            CommandKind::RcptTo => matches!(
                self.state,
                DialogState::AwaitingRecipient | DialogState::RecipientsOrData
            ),
            CommandKind::Data => self.state == DialogState::RecipientsOrData,
        }
    }

    /// Process one command line and produce the reply to emit
    ///
    /// Protocol failures come back as `Err` carrying one of the three
    /// outcome tags; the session stays in its current state and the driver
    /// maps the tag to a 500/501/503 reply. Not for data-phase lines,
    /// which go through [`Dialog::data_line`].
    pub fn apply(&mut self, raw: &str) -> Result<Reply, SmtpError> {
        debug_assert!(!self.in_data() && !self.terminated());

        if raw.len() > SmtpLimits::COMMAND_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
            });
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SmtpError::Unrecognized);
        }

        // The termination keyword is recognized ahead of the grammar, from
        // any state.
        if trimmed.eq_ignore_ascii_case("QUIT") {
            self.state = DialogState::Terminated;
            return Ok(Reply::closing());
        }

        let leading = trimmed.chars().next().unwrap_or('\0');
        let Some(kind) = CommandKind::for_leading(leading) else {
            return Err(SmtpError::Unrecognized);
        };

        let line = format!("{trimmed}\n");
        let mut scanner = TokenScanner::new(&line);
        match kind.parse(&mut scanner) {
            Ok(_) if !self.legal(kind) => Err(SmtpError::OutOfOrder),
            Ok(command) => Ok(self.advance(command)),
            // Keyword recognition failed before legality could be evaluated
            Err(SmtpError::Unrecognized) => Err(SmtpError::Unrecognized),
            Err(_) if !self.legal(kind) => Err(SmtpError::OutOfOrder),
            Err(e) => Err(e),
        }
    }

    /// Apply a successfully parsed, in-sequence command
    fn advance(&mut self, command: Command) -> Reply {
        match command {
            Command::Helo(domain) => {
                let reply = Reply::helo(&self.hostname, &domain.to_string());
                self.client_domain = Some(domain);
                self.state = DialogState::AwaitingSender;
                reply
            }
            Command::MailFrom(mailbox) => {
                self.sender = Some(mailbox);
                self.recipients.clear();
                self.body.clear();
                self.state = DialogState::AwaitingRecipient;
                Reply::ok()
            }
            Command::RcptTo(mailbox) => {
                self.recipients.push(mailbox);
                self.state = DialogState::RecipientsOrData;
                Reply::ok()
            }
            Command::Data => {
                self.body.clear();
                self.state = DialogState::InData;
                Reply::data_start()
            }
        }
    }

    /// Process one line of the data phase
    ///
    /// Returns the completed message when the terminating `.` line is
    /// read; the dialog then loops back to awaiting the next sender. Body
    /// lines are appended verbatim: there is no dot-stuffing, so a body
    /// line of exactly `.` is indistinguishable from the terminator.
    pub fn data_line(&mut self, raw: &str) -> Result<Option<Email>, SmtpError> {
        debug_assert!(self.in_data());

        let line = raw.trim_end_matches(['\r', '\n']);
        if line == "." {
            let from = self.sender.take().ok_or(SmtpError::OutOfOrder)?;
            let to = std::mem::take(&mut self.recipients);
            let body = std::mem::take(&mut self.body);
            self.state = DialogState::AwaitingSender;
            return Ok(Some(Email::new(from, to, body)));
        }

        if self.body.len() + line.len() + 1 > SmtpLimits::MAX_DATA_SIZE {
            return Err(SmtpError::BodyTooLarge {
                max: SmtpLimits::MAX_DATA_SIZE,
            });
        }
        self.body.push_str(line);
        self.body.push('\n');
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greeted() -> Dialog {
        let mut dialog = Dialog::new("mta.local");
        dialog.apply("HELO client.local\n").unwrap();
        dialog
    }

    fn err_code(result: Result<Reply, SmtpError>) -> u16 {
        result.unwrap_err().reply().unwrap().code
    }

    #[test]
    fn test_full_transaction() {
        let mut dialog = Dialog::new("mta.local");

        let reply = dialog.apply("HELO example.com\n").unwrap();
        assert_eq!(reply.code, 250);
        assert_eq!(dialog.client_domain().unwrap().to_string(), "example.com");

        assert_eq!(dialog.apply("MAIL FROM:<a@b.com>\n").unwrap().code, 250);
        assert_eq!(dialog.apply("RCPT TO:<c@d.com>\n").unwrap().code, 250);
        assert_eq!(dialog.apply("DATA\n").unwrap().code, 354);
        assert!(dialog.in_data());

        assert!(dialog.data_line("hello\n").unwrap().is_none());
        let email = dialog.data_line(".\n").unwrap().unwrap();
        assert_eq!(email.from.to_string(), "a@b.com");
        assert_eq!(email.to.len(), 1);
        assert_eq!(email.body, "hello\n");

        // Loops back for the next message on the same connection
        assert_eq!(dialog.state(), DialogState::AwaitingSender);
        assert_eq!(dialog.apply("MAIL FROM:<x@y.com>\n").unwrap().code, 250);
    }

    #[test]
    fn test_rcpt_before_mail_is_out_of_order() {
        let mut dialog = greeted();
        // Well-formed, but illegal in this state
        assert_eq!(err_code(dialog.apply("RCPT TO:<x@y.com>\n")), 503);
        assert_eq!(dialog.state(), DialogState::AwaitingSender);
    }

    #[test]
    fn test_rcpt_as_first_line_is_out_of_order() {
        let mut dialog = Dialog::new("mta.local");
        assert_eq!(err_code(dialog.apply("RCPT TO:<x@y.com>\n")), 503);
    }

    #[test]
    fn test_data_with_zero_recipients_is_out_of_order() {
        let mut dialog = greeted();
        dialog.apply("MAIL FROM:<a@b.com>\n").unwrap();
        assert_eq!(err_code(dialog.apply("DATA\n")), 503);
    }

    #[test]
    fn test_unrecognized_wins_over_out_of_order() {
        // Gibberish reports 500 even where no command at all is legal
        let mut dialog = Dialog::new("mta.local");
        assert_eq!(err_code(dialog.apply("XYZZY\n")), 500);
        // A keyword typo dispatched to a routine illegal here still
        // fails at recognition, before legality is evaluated
        assert_eq!(err_code(dialog.apply("MAID FROM:<a@b.com>\n")), 500);
    }

    #[test]
    fn test_out_of_order_wins_over_param_error() {
        let mut dialog = Dialog::new("mta.local");
        // Recognized keyword, malformed parameters, illegal state
        assert_eq!(err_code(dialog.apply("MAIL FROM:<bad address>\n")), 503);
    }

    #[test]
    fn test_param_error_in_legal_state() {
        let mut dialog = greeted();
        assert_eq!(err_code(dialog.apply("MAIL FROM:<bad address>\n")), 501);
        // State does not advance on failure
        assert_eq!(err_code(dialog.apply("RCPT TO:<x@y.com>\n")), 503);
        assert_eq!(dialog.apply("MAIL FROM:<a@b.com>\n").unwrap().code, 250);
    }

    #[test]
    fn test_empty_line_is_unrecognized() {
        let mut dialog = greeted();
        assert_eq!(err_code(dialog.apply("\n")), 500);
        assert_eq!(err_code(dialog.apply("   \n")), 500);
    }

    #[test]
    fn test_helo_twice_is_out_of_order() {
        let mut dialog = greeted();
        assert_eq!(err_code(dialog.apply("HELO again.local\n")), 503);
    }

    #[test]
    fn test_quit_from_any_state() {
        let mut dialog = Dialog::new("mta.local");
        assert_eq!(dialog.apply("QUIT\n").unwrap().code, 221);
        assert!(dialog.terminated());

        let mut dialog = greeted();
        dialog.apply("MAIL FROM:<a@b.com>\n").unwrap();
        assert_eq!(dialog.apply("quit\r\n").unwrap().code, 221);
        assert!(dialog.terminated());
    }

    #[test]
    fn test_line_too_long() {
        let mut dialog = greeted();
        let long = "MAIL FROM:<".to_string()
            + &"a".repeat(SmtpLimits::COMMAND_LINE_MAX_LENGTH)
            + "@b.com>\n";
        let err = dialog.apply(&long).unwrap_err();
        assert!(matches!(err, SmtpError::LineTooLong { .. }));
        assert_eq!(err.reply().unwrap().code, 500);
    }

    #[test]
    fn test_dot_line_always_terminates_data() {
        let mut dialog = greeted();
        dialog.apply("MAIL FROM:<a@b.com>\n").unwrap();
        dialog.apply("RCPT TO:<c@d.com>\n").unwrap();
        dialog.apply("DATA\n").unwrap();

        dialog.data_line("before\r\n").unwrap();
        // A body line of exactly `.` is the terminator, regardless of
        // surrounding content
        let email = dialog.data_line(".\r\n").unwrap().unwrap();
        assert_eq!(email.body, "before\n");
    }

    #[test]
    fn test_body_size_cap_is_fatal() {
        let mut dialog = greeted();
        dialog.apply("MAIL FROM:<a@b.com>\n").unwrap();
        dialog.apply("RCPT TO:<c@d.com>\n").unwrap();
        dialog.apply("DATA\n").unwrap();

        let half = "a".repeat(SmtpLimits::MAX_DATA_SIZE / 2);
        assert!(dialog.data_line(&half).unwrap().is_none());
        let err = dialog.data_line(&half).unwrap_err();
        assert!(matches!(err, SmtpError::BodyTooLarge { .. }));
        // Session-fatal: no protocol reply maps to this failure
        assert!(err.reply().is_none());
    }

    #[test]
    fn test_multiple_recipients_accumulate() {
        let mut dialog = greeted();
        dialog.apply("MAIL FROM:<a@b.com>\n").unwrap();
        dialog.apply("RCPT TO:<one@d.com>\n").unwrap();
        dialog.apply("RCPT TO:<two@e.org>\n").unwrap();
        dialog.apply("DATA\n").unwrap();
        let email = dialog.data_line(".\n").unwrap().unwrap();
        assert_eq!(email.to.len(), 2);
        assert_eq!(email.body, "");
    }

    #[test]
    fn test_mail_from_mid_transaction_is_out_of_order() {
        let mut dialog = greeted();
        dialog.apply("MAIL FROM:<a@b.com>\n").unwrap();
        dialog.apply("RCPT TO:<c@d.com>\n").unwrap();
        assert!(matches!(
            dialog.apply("MAIL FROM:<x@y.com>\n"),
            Err(SmtpError::OutOfOrder)
        ));
    }
}
