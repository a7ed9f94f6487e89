//! Recursive-descent command grammar
//!
//! One routine per grammar rule, each consuming the token scanner and
//! returning a value or one of two failure tags. A mismatch while matching
//! the command keyword and its required separator is [`SmtpError::Unrecognized`];
//! any structural defect after that point is [`SmtpError::ParamError`]. The
//! two classes are never mixed: `"MAID"` dispatches to the MAIL routine and
//! still surfaces as unrecognized.
//!
//! ```text
//! command   := "MAIL" whitespace "FROM:" nullspace path nullspace NEWLINE
//!            | "RCPT" whitespace "TO:"   nullspace path nullspace NEWLINE
//!            | "DATA"  nullspace NEWLINE
//!            | "HELO" whitespace domain  nullspace NEWLINE
//! path      := "<" mailbox ">"
//! mailbox   := localpart "@" domain
//! localpart := CHAR+
//! domain    := element ("." element)*
//! element   := letter (letter | digit)*
//! ```
//!
//! The domain rule is parsed with an explicit loop and an element-count
//! cap rather than recursion, so a pathological line of thousands of
//! dot-separated elements cannot grow the stack.

use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::scanner::{TokenKind, TokenScanner};
use std::fmt;
use std::str::FromStr;

/// A dot-separated domain name, kept as its parsed elements
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Domain {
    elements: Vec<String>,
}

impl Domain {
    /// The dot-separated elements, always at least one
    pub fn elements(&self) -> &[String] {
        &self.elements
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elements.join("."))
    }
}

impl FromStr for Domain {
    type Err = SmtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scanner = TokenScanner::new(s);
        let domain = parse_domain(&mut scanner)?;
        if scanner.peek().kind != TokenKind::EndOfInput {
            return Err(SmtpError::ParamError);
        }
        Ok(domain)
    }
}

/// A mailbox address, `local@domain`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox {
    pub local: String,
    pub domain: Domain,
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

impl FromStr for Mailbox {
    type Err = SmtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scanner = TokenScanner::new(s);
        let mailbox = parse_mailbox(&mut scanner)?;
        if scanner.peek().kind != TokenKind::EndOfInput {
            return Err(SmtpError::ParamError);
        }
        Ok(mailbox)
    }
}

/// A fully parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Helo(Domain),
    MailFrom(Mailbox),
    RcptTo(Mailbox),
    Data,
}

/// The command registry: leading character to parse routine
///
/// The command set is closed, so dispatch is an enumerated match rather
/// than a runtime lookup table. Registered routines run in full even when
/// the command turns out to be unrecognized past the first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Helo,
    MailFrom,
    RcptTo,
    Data,
}

impl CommandKind {
    /// Look up the routine for a leading character, if one is registered
    pub fn for_leading(c: char) -> Option<Self> {
        match c {
            'H' => Some(CommandKind::Helo),
            'M' => Some(CommandKind::MailFrom),
            'R' => Some(CommandKind::RcptTo),
            'D' => Some(CommandKind::Data),
            _ => None,
        }
    }

    /// Run the routine against a scanner positioned at line start
    pub fn parse(self, scanner: &mut TokenScanner) -> Result<Command, SmtpError> {
        match self {
            CommandKind::Helo => parse_helo(scanner),
            CommandKind::MailFrom => parse_mail_from(scanner),
            CommandKind::RcptTo => parse_rcpt_to(scanner),
            CommandKind::Data => parse_data(scanner),
        }
    }
}

/// Match a literal character-by-character; does not restore consumed input
fn accept_literal(scanner: &mut TokenScanner, literal: &str) -> bool {
    literal.chars().all(|c| scanner.accept_spelling(c))
}

/// whitespace := SPACE+
fn parse_whitespace(scanner: &mut TokenScanner) -> Result<(), SmtpError> {
    if !scanner.accept_kind(TokenKind::Space) {
        return Err(SmtpError::ParamError);
    }
    while scanner.accept_kind(TokenKind::Space) {}
    Ok(())
}

/// nullspace := SPACE*
fn parse_nullspace(scanner: &mut TokenScanner) {
    while scanner.accept_kind(TokenKind::Space) {}
}

fn parse_newline(scanner: &mut TokenScanner) -> Result<(), SmtpError> {
    if !scanner.accept_kind(TokenKind::Newline) {
        return Err(SmtpError::ParamError);
    }
    Ok(())
}

/// path := "<" mailbox ">"
fn parse_path(scanner: &mut TokenScanner) -> Result<Mailbox, SmtpError> {
    if !scanner.accept(TokenKind::Special, '<') {
        return Err(SmtpError::ParamError);
    }
    let mailbox = parse_mailbox(scanner)?;
    if !scanner.accept(TokenKind::Special, '>') {
        return Err(SmtpError::ParamError);
    }
    Ok(mailbox)
}

/// mailbox := localpart "@" domain
pub(crate) fn parse_mailbox(scanner: &mut TokenScanner) -> Result<Mailbox, SmtpError> {
    let local = parse_localpart(scanner)?;
    if !scanner.accept(TokenKind::Special, '@') {
        return Err(SmtpError::ParamError);
    }
    let domain = parse_domain(scanner)?;
    Ok(Mailbox { local, domain })
}

/// localpart := CHAR+
fn parse_localpart(scanner: &mut TokenScanner) -> Result<String, SmtpError> {
    let mut local = String::new();
    if scanner.peek().kind != TokenKind::Char {
        return Err(SmtpError::ParamError);
    }
    while scanner.peek().kind == TokenKind::Char {
        local.push(scanner.peek().spelling);
        scanner.accept_kind(TokenKind::Char);
        if local.len() > SmtpLimits::LOCAL_MAX_LENGTH {
            return Err(SmtpError::ParamError);
        }
    }
    Ok(local)
}

/// domain := element ("." element)*
fn parse_domain(scanner: &mut TokenScanner) -> Result<Domain, SmtpError> {
    let mut elements = vec![parse_element(scanner)?];
    while scanner.accept(TokenKind::Special, '.') {
        elements.push(parse_element(scanner)?);
        if elements.len() > SmtpLimits::DOMAIN_MAX_ELEMENTS {
            return Err(SmtpError::ParamError);
        }
    }
    Ok(Domain { elements })
}

/// element := letter (letter | digit)*
fn parse_element(scanner: &mut TokenScanner) -> Result<String, SmtpError> {
    let first = scanner.peek();
    if first.kind != TokenKind::Char || !first.spelling.is_ascii_alphabetic() {
        return Err(SmtpError::ParamError);
    }
    let mut element = String::new();
    element.push(first.spelling);
    scanner.accept_kind(TokenKind::Char);

    loop {
        let next = scanner.peek();
        if next.kind == TokenKind::Char && next.spelling.is_ascii_alphanumeric() {
            element.push(next.spelling);
            scanner.accept_kind(TokenKind::Char);
        } else {
            return Ok(element);
        }
    }
}

fn parse_helo(scanner: &mut TokenScanner) -> Result<Command, SmtpError> {
    if !accept_literal(scanner, "HELO") || parse_whitespace(scanner).is_err() {
        return Err(SmtpError::Unrecognized);
    }
    let domain = parse_domain(scanner)?;
    parse_nullspace(scanner);
    parse_newline(scanner)?;
    Ok(Command::Helo(domain))
}

fn parse_mail_from(scanner: &mut TokenScanner) -> Result<Command, SmtpError> {
    if !accept_literal(scanner, "MAIL")
        || parse_whitespace(scanner).is_err()
        || !accept_literal(scanner, "FROM:")
    {
        return Err(SmtpError::Unrecognized);
    }
    parse_nullspace(scanner);
    let path = parse_path(scanner)?;
    parse_nullspace(scanner);
    parse_newline(scanner)?;
    Ok(Command::MailFrom(path))
}

fn parse_rcpt_to(scanner: &mut TokenScanner) -> Result<Command, SmtpError> {
    if !accept_literal(scanner, "RCPT")
        || parse_whitespace(scanner).is_err()
        || !accept_literal(scanner, "TO:")
    {
        return Err(SmtpError::Unrecognized);
    }
    parse_nullspace(scanner);
    let path = parse_path(scanner)?;
    parse_nullspace(scanner);
    parse_newline(scanner)?;
    Ok(Command::RcptTo(path))
}

fn parse_data(scanner: &mut TokenScanner) -> Result<Command, SmtpError> {
    if !accept_literal(scanner, "DATA") {
        return Err(SmtpError::Unrecognized);
    }
    parse_nullspace(scanner);
    parse_newline(scanner)?;
    Ok(Command::Data)
}

fn at_line_end(scanner: &mut TokenScanner) -> bool {
    scanner.accept_kind(TokenKind::Newline) || scanner.peek().kind == TokenKind::EndOfInput
}

/// Parse a bare address line from a composition source
pub fn parse_address_line(line: &str) -> Result<Mailbox, SmtpError> {
    let mut scanner = TokenScanner::new(line);
    parse_nullspace(&mut scanner);
    let mailbox = parse_mailbox(&mut scanner)?;
    parse_nullspace(&mut scanner);
    if !at_line_end(&mut scanner) {
        return Err(SmtpError::ParamError);
    }
    Ok(mailbox)
}

/// Parse a comma-separated address list line from a composition source
pub fn parse_address_list(line: &str) -> Result<Vec<Mailbox>, SmtpError> {
    let mut scanner = TokenScanner::new(line);
    parse_nullspace(&mut scanner);
    let mut mailboxes = vec![parse_mailbox(&mut scanner)?];
    loop {
        parse_nullspace(&mut scanner);
        if scanner.accept(TokenKind::Special, ',') {
            parse_nullspace(&mut scanner);
            mailboxes.push(parse_mailbox(&mut scanner)?);
        } else if at_line_end(&mut scanner) {
            return Ok(mailboxes);
        } else {
            return Err(SmtpError::ParamError);
        }
    }
}
