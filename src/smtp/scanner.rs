//! Character-classifying token scanner
//!
//! The grammar operates on single-character tokens. The scanner keeps a
//! one-token lookahead and never retains tokens past the next read; the
//! `accept` family advances only on a match, which is what lets the parser
//! test a token before committing to a rule.

use std::str::Chars;

/// Classification of a single input character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain 7-bit ASCII character (not special, space, or newline)
    Char,
    /// One of the fixed punctuation set `< > ( ) [ ] \ . , ; : @ "`
    Special,
    /// Space or horizontal tab
    Space,
    /// Line feed
    Newline,
    /// The input is exhausted
    EndOfInput,
    /// Anything outside the 7-bit ASCII range
    Unrecognized,
}

/// A single scanned character with its classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: char,
}

const SPECIAL: &[char] = &[
    '<', '>', '(', ')', '[', ']', '\\', '.', ',', ';', ':', '@', '"',
];

fn classify(c: char) -> Token {
    let kind = if c == ' ' || c == '\t' {
        TokenKind::Space
    } else if c == '\n' {
        TokenKind::Newline
    } else if SPECIAL.contains(&c) {
        TokenKind::Special
    } else if c.is_ascii() {
        TokenKind::Char
    } else {
        TokenKind::Unrecognized
    };
    Token { kind, spelling: c }
}

/// Scanner over one input line
#[derive(Debug)]
pub struct TokenScanner<'a> {
    chars: Chars<'a>,
    current: Token,
}

impl<'a> TokenScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars();
        let current = Self::read_token(&mut chars);
        Self { chars, current }
    }

    fn read_token(chars: &mut Chars<'a>) -> Token {
        match chars.next() {
            Some(c) => classify(c),
            None => Token {
                kind: TokenKind::EndOfInput,
                spelling: '\0',
            },
        }
    }

    /// The current lookahead token, without consuming it
    pub fn peek(&self) -> Token {
        self.current
    }

    fn advance(&mut self) {
        self.current = Self::read_token(&mut self.chars);
    }

    /// Consume the lookahead if its kind matches
    pub fn accept_kind(&mut self, kind: TokenKind) -> bool {
        if self.current.kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the lookahead if its spelling matches, whatever its kind
    pub fn accept_spelling(&mut self, spelling: char) -> bool {
        if self.current.spelling == spelling && self.current.kind != TokenKind::EndOfInput {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the lookahead if both kind and spelling match
    pub fn accept(&mut self, kind: TokenKind, spelling: char) -> bool {
        if self.current.kind == kind && self.current.spelling == spelling {
            self.advance();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let mut scanner = TokenScanner::new("a@. \n");
        assert_eq!(scanner.peek().kind, TokenKind::Char);
        assert!(scanner.accept_kind(TokenKind::Char));
        assert_eq!(scanner.peek(), Token {
            kind: TokenKind::Special,
            spelling: '@'
        });
        assert!(scanner.accept(TokenKind::Special, '@'));
        assert!(scanner.accept(TokenKind::Special, '.'));
        assert!(scanner.accept_kind(TokenKind::Space));
        assert!(scanner.accept_kind(TokenKind::Newline));
        assert_eq!(scanner.peek().kind, TokenKind::EndOfInput);
    }

    #[test]
    fn test_non_ascii_is_unrecognized() {
        let scanner = TokenScanner::new("é");
        assert_eq!(scanner.peek().kind, TokenKind::Unrecognized);
    }

    #[test]
    fn test_tab_is_space() {
        let scanner = TokenScanner::new("\t");
        assert_eq!(scanner.peek().kind, TokenKind::Space);
    }

    #[test]
    fn test_mismatch_does_not_consume() {
        let mut scanner = TokenScanner::new("x");
        assert!(!scanner.accept_kind(TokenKind::Special));
        assert!(!scanner.accept_spelling('y'));
        assert!(!scanner.accept(TokenKind::Char, 'z'));
        // Still sitting on the same token
        assert!(scanner.accept(TokenKind::Char, 'x'));
    }

    #[test]
    fn test_end_of_input_is_sticky() {
        let mut scanner = TokenScanner::new("");
        assert_eq!(scanner.peek().kind, TokenKind::EndOfInput);
        assert!(!scanner.accept_spelling('\0'));
        assert_eq!(scanner.peek().kind, TokenKind::EndOfInput);
    }

    #[test]
    fn test_all_specials() {
        for c in ['<', '>', '(', ')', '[', ']', '\\', '.', ',', ';', ':', '@', '"'] {
            let s = c.to_string();
            let mut scanner = TokenScanner::new(&s);
            assert!(scanner.accept_kind(TokenKind::Special), "{c} not special");
        }
    }
}
