//! Composition source: locally composed messages for the client role
//!
//! A composed message is one sender address line, one or more recipient
//! lines (each a comma-separated address list), a subject line, and body
//! lines up to a lone `.` (or end of input). Recipient lines are consumed
//! for as long as they parse as address lists; the first line that does
//! not is the subject. A subject that happens to parse as an address list
//! is therefore consumed as recipients; the format accepts this
//! ambiguity. Several messages may follow one another in the same source.

use crate::smtp::email::Email;
use crate::smtp::error::SmtpError;
use crate::smtp::grammar::{parse_address_line, parse_address_list};
use std::io::BufRead;

/// Read every composed message from a source
pub fn read_messages<R: BufRead>(reader: R) -> Result<Vec<Email>, SmtpError> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }

    let mut messages = Vec::new();
    let mut pos = 0;

    loop {
        // Blank lines may separate messages
        while pos < lines.len() && lines[pos].trim().is_empty() {
            pos += 1;
        }
        if pos >= lines.len() {
            return Ok(messages);
        }
        let (email, next) = read_one(&lines, pos)?;
        messages.push(email);
        pos = next;
    }
}

fn read_one(lines: &[String], mut pos: usize) -> Result<(Email, usize), SmtpError> {
    let from = parse_address_line(&lines[pos])
        .map_err(|_| SmtpError::Compose(format!("invalid sender address: {:?}", lines[pos])))?;
    pos += 1;

    let first_rcpts = lines
        .get(pos)
        .ok_or_else(|| SmtpError::Compose("missing recipient line".to_string()))
        .and_then(|line| {
            parse_address_list(line)
                .map_err(|_| SmtpError::Compose(format!("invalid recipient line: {line:?}")))
        })?;
    pos += 1;

    let mut to = first_rcpts;
    // Further lines are recipients for as long as they parse as lists
    while let Some(line) = lines.get(pos) {
        match parse_address_list(line) {
            Ok(more) => {
                to.extend(more);
                pos += 1;
            }
            Err(_) => break,
        }
    }

    let subject = lines
        .get(pos)
        .ok_or_else(|| SmtpError::Compose("missing subject line".to_string()))?
        .clone();
    pos += 1;

    let mut body = format!("Subject: {subject}\n\n");
    while let Some(line) = lines.get(pos) {
        pos += 1;
        if line == "." {
            break;
        }
        body.push_str(line);
        body.push('\n');
    }

    Ok((Email::new(from, to, body), pos))
}
