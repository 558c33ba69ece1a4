//! SQL tokenizer for literal redaction.

/// Token types recognized by the tokenizer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TokenKind {
    Identifier,
    QuotedIdentifier,
    StringLiteral,
    NumberLiteral,
    Operator,
    Punctuation,
}

/// A token, as a byte range into the scanned input.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// A byte-cursor scanner over a SQL string.
///
/// Comments and whitespace are skipped; everything else is reported with its exact byte range so
/// the caller can splice replacements without disturbing surrounding structure.
pub(crate) struct SqlTokenizer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SqlTokenizer<'a> {
    pub fn new(sql: &'a str) -> Self {
        Self {
            buf: sql.as_bytes(),
            pos: 0,
        }
    }

    /// Scans the next token.
    ///
    /// Returns `Ok(None)` at end of input, or an error describing the first lexical problem
    /// encountered (unterminated string or comment).
    pub fn scan(&mut self) -> Result<Option<Token>, String> {
        self.skip_blank_and_comments()?;
        if self.pos >= self.buf.len() {
            return Ok(None);
        }

        let start = self.pos;
        let ch = self.buf[self.pos];

        if is_leading_identifier_char(ch) {
            self.pos += 1;
            while self.pos < self.buf.len() && is_identifier_char(self.buf[self.pos]) {
                self.pos += 1;
            }
            return Ok(Some(Token {
                kind: TokenKind::Identifier,
                start,
                end: self.pos,
            }));
        }

        if ch.is_ascii_digit() {
            return Ok(Some(self.scan_number(start)));
        }

        match ch {
            b'\'' => self.scan_quoted(start, b'\'', TokenKind::StringLiteral).map(Some),
            b'"' => self.scan_quoted(start, b'"', TokenKind::QuotedIdentifier).map(Some),
            b'`' => self.scan_quoted(start, b'`', TokenKind::QuotedIdentifier).map(Some),
            b'=' | b'<' | b'>' | b'!' | b'+' | b'-' | b'*' | b'/' | b'%' => {
                self.pos += 1;
                Ok(Some(Token {
                    kind: TokenKind::Operator,
                    start,
                    end: self.pos,
                }))
            }
            _ => {
                self.advance_char();
                Ok(Some(Token {
                    kind: TokenKind::Punctuation,
                    start,
                    end: self.pos,
                }))
            }
        }
    }

    fn scan_number(&mut self, start: usize) -> Token {
        // Hex literals.
        if self.buf[self.pos] == b'0'
            && self.pos + 1 < self.buf.len()
            && (self.buf[self.pos + 1] | 0x20) == b'x'
        {
            self.pos += 2;
            while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_hexdigit() {
                self.pos += 1;
            }
            return Token {
                kind: TokenKind::NumberLiteral,
                start,
                end: self.pos,
            };
        }

        while self.pos < self.buf.len() && (self.buf[self.pos].is_ascii_digit() || self.buf[self.pos] == b'.') {
            self.pos += 1;
        }

        // Exponent part.
        if self.pos < self.buf.len() && (self.buf[self.pos] | 0x20) == b'e' {
            let mut lookahead = self.pos + 1;
            if lookahead < self.buf.len() && (self.buf[lookahead] == b'+' || self.buf[lookahead] == b'-') {
                lookahead += 1;
            }
            if lookahead < self.buf.len() && self.buf[lookahead].is_ascii_digit() {
                self.pos = lookahead;
                while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }

        Token {
            kind: TokenKind::NumberLiteral,
            start,
            end: self.pos,
        }
    }

    fn scan_quoted(&mut self, start: usize, quote: u8, kind: TokenKind) -> Result<Token, String> {
        self.pos += 1;
        while self.pos < self.buf.len() {
            let ch = self.buf[self.pos];
            if ch == b'\\' && quote == b'\'' {
                // Backslash escape inside a string literal.
                if self.pos + 1 >= self.buf.len() {
                    return Err("unterminated string literal".to_string());
                }
                self.pos += 2;
            } else if ch == quote {
                // Doubled quote escape.
                if self.pos + 1 < self.buf.len() && self.buf[self.pos + 1] == quote {
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    return Ok(Token {
                        kind,
                        start,
                        end: self.pos,
                    });
                }
            } else {
                self.pos += 1;
            }
        }

        Err(match kind {
            TokenKind::StringLiteral => "unterminated string literal".to_string(),
            _ => "unterminated quoted identifier".to_string(),
        })
    }

    fn skip_blank_and_comments(&mut self) -> Result<(), String> {
        loop {
            while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.buf[self.pos..].starts_with(b"--") {
                while self.pos < self.buf.len() && self.buf[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else if self.buf[self.pos..].starts_with(b"/*") {
                match find_subslice(&self.buf[self.pos + 2..], b"*/") {
                    Some(offset) => self.pos += 2 + offset + 2,
                    None => return Err("unterminated block comment".to_string()),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn advance_char(&mut self) {
        self.pos += 1;
        // Skip over UTF-8 continuation bytes so ranges stay on character boundaries.
        while self.pos < self.buf.len() && self.buf[self.pos] & 0xc0 == 0x80 {
            self.pos += 1;
        }
    }
}

fn is_leading_identifier_char(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'@'
}

fn is_identifier_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$'
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
