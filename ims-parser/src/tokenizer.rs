//! Hand-rolled lexer over an in-memory buffer.
//!
//! Unlike the reference lexer, which wraps a seekable file-like object and
//! reads it line by line, this tokenizer holds the whole message in memory
//! (these messages are always small, bounded archive requests, never an
//! unbounded stream) and tracks a single byte cursor into it. Line/column
//! bookkeeping is maintained incrementally so diagnostics still read
//! `Error[line=<n>,pos=<col>]` the way the reference implementation's did.

use once_cell::sync::Lazy;
use regex::Regex;

use ims_types::error::{LexError, Position, SyntaxError};

use crate::lexicon::{self, Family, Matcher, TokenKind, CATALOG};
use crate::token::Token;

/// Folds a matched `BOOLEAN` literal the way the reference lexer's
/// `_toBoolean` did: only `false`/`no`/`0` (case-insensitive, trimmed) fold to
/// `false`; anything else, including `TRUE`, folds to `true`.
pub fn fold_boolean(text: &str) -> bool {
    !matches!(text.trim().to_ascii_lowercase().as_str(), "false" | "no" | "0")
}

fn classify_id(text: &str) -> TokenKind {
    if text.len() > 50 || text.contains([':', '/', '=', '+', '<', '>', '(', ')']) {
        TokenKind::Data
    } else if text.contains('*') {
        TokenKind::WcId
    } else {
        TokenKind::Id
    }
}

/// Finds the byte length of a match for `matcher` anchored at the start of
/// `rest`, or `None` if it does not match there.
fn try_match(matcher: &Matcher, rest: &str) -> Option<usize> {
    match matcher {
        Matcher::Literal(lit) => {
            if rest.len() >= lit.len() && rest.is_char_boundary(lit.len()) {
                rest[..lit.len()].eq_ignore_ascii_case(lit).then_some(lit.len())
            } else {
                None
            }
        }
        Matcher::Regex(re) => re.find(rest).filter(|m| m.start() == 0).map(|m| m.end()),
    }
}

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    line_start: usize,
    current: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            pos: 0,
            line: 1,
            line_start: 0,
            current: None,
        }
    }

    /// The last token returned by [`Tokenizer::next`], or `None` before the
    /// first call.
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Convenience for a fixed-arity production (e.g. `PROD_ID <number>
    /// <number>`): pulls `n` tokens in a row.
    pub fn consume_next_tokens(&mut self, n: usize) -> Result<Vec<Token>, ims_types::Error> {
        (0..n).map(|_| self.next().map_err(ims_types::Error::from)).collect()
    }

    /// Byte offset of the cursor; used by the parser to mark the start of a
    /// `SUB_PRODUCT_DESC` span before replaying the rest of a subscription
    /// statement.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Returns the verbatim text between two byte offsets in the original
    /// buffer, mirroring `get_tokenized_string`.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    fn current_line_text(&self) -> &'a str {
        let end = self.input[self.line_start..]
            .find('\n')
            .map(|i| self.line_start + i)
            .unwrap_or(self.input.len());
        let end = end.min(self.input.len());
        let trimmed = self.input[self.line_start..end].trim_end_matches('\r');
        trimmed
    }

    fn column(&self) -> usize {
        self.pos - self.line_start
    }

    fn position_here(&self) -> Position {
        Position::At {
            line: self.line,
            column: self.column(),
        }
    }

    fn advance_past(&mut self, matched_len: usize, newlines_matched: bool) {
        if newlines_matched {
            let text = &self.input[self.pos..self.pos + matched_len];
            self.line += text.matches('\n').count();
            self.pos += matched_len;
            self.line_start = self.pos;
        } else {
            self.pos += matched_len;
        }
    }

    /// Returns the next token, or a `LexError` if no catalog entry matches at
    /// the current position. Records the token as [`Tokenizer::current`].
    pub fn next(&mut self) -> Result<Token, LexError> {
        let tok = self.scan()?;
        self.current = Some(tok.clone());
        Ok(tok)
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        loop {
            if self.pos >= self.input.len() {
                return Ok(Token::new(
                    TokenKind::EndMarker,
                    "",
                    self.line,
                    self.column(),
                    self.pos,
                ));
            }

            let rest = &self.input[self.pos..];
            let ch = rest.chars().next().expect("pos < input.len()");
            if lexicon::IGNORED_LITERALS.contains(&ch) {
                self.pos += ch.len_utf8();
                continue;
            }

            for (kind, matcher) in CATALOG {
                let Some(matched_len) = try_match(matcher, rest) else {
                    continue;
                };
                let text = &rest[..matched_len];
                let next_char = rest[matched_len..].chars().next();

                let vetoed = match kind {
                    TokenKind::Number | TokenKind::Datetime => {
                        !lexicon::follows_number_ok(next_char)
                    }
                    _ if matches!(
                        kind.family(),
                        Family::Keyword
                            | Family::ShiProduct
                            | Family::RadProduct
                            | Family::TestProductFamily
                            | Family::SubscriptionCommand
                    ) =>
                    {
                        !lexicon::follows_keyword_ok(next_char)
                    }
                    _ => false,
                };
                if vetoed {
                    continue;
                }

                let line = self.line;
                let column = self.column();
                let offset = self.pos;

                let (final_kind, final_text): (TokenKind, String) = match kind {
                    TokenKind::Id => {
                        let classified = classify_id(text);
                        (classified, text.to_owned())
                    }
                    TokenKind::Boolean => {
                        let folded = fold_boolean(text);
                        (TokenKind::Boolean, folded.to_string())
                    }
                    _ => (*kind, text.to_owned()),
                };

                self.advance_past(matched_len, matches!(kind, TokenKind::Newline));

                return Ok(Token::new(final_kind, final_text, line, column, offset));
            }

            return Err(LexError {
                position: self.position_here(),
                instrumented_line: ims_types::error::instrument_line(
                    self.current_line_text(),
                    self.column(),
                ),
            });
        }
    }

    /// Consumes and returns the next token, failing unless it has exactly
    /// `expected`.
    pub fn expect(&mut self, expected: TokenKind) -> Result<Token, ims_types::Error> {
        self.expect_one_of(&[expected])
    }

    /// Consumes and returns the next token, failing unless its kind is one of
    /// `expected`.
    pub fn expect_one_of(&mut self, expected: &[TokenKind]) -> Result<Token, ims_types::Error> {
        let tok = self.next()?;
        if expected.iter().any(|k| kind_eq(*k, tok.kind)) {
            Ok(tok)
        } else {
            Err(self.unexpected(&tok, expected).into())
        }
    }

    /// Consumes tokens as long as they are one of `kinds`, requiring at least
    /// one to match, and returns the first non-matching token.
    pub fn consume_while_next_in(&mut self, kinds: &[TokenKind]) -> Result<Token, ims_types::Error> {
        self.expect_one_of(kinds)?;
        loop {
            let tok = self.next()?;
            if !kinds.iter().any(|k| kind_eq(*k, tok.kind)) {
                return Ok(tok);
            }
        }
    }

    /// Eats tokens starting from `current` as long as they are one of
    /// `kinds`, returning the first non-matching token (which may be
    /// `current` itself).
    pub fn consume_while_current_in(
        &mut self,
        current: Token,
        kinds: &[TokenKind],
    ) -> Result<Token, ims_types::Error> {
        let mut tok = current;
        while kinds.iter().any(|k| kind_eq(*k, tok.kind)) {
            tok = self.next()?;
        }
        Ok(tok)
    }

    /// Scans forward, including past the current token, for the first token
    /// matching one of `kinds`. Only `ENDMARKER` (if requested) may terminate
    /// the scan without a match.
    pub fn advance_until(&mut self, kinds: &[TokenKind]) -> Result<Token, ims_types::Error> {
        let accept_endmarker = kinds.iter().any(|k| matches!(k, TokenKind::EndMarker));
        loop {
            if self.pos >= self.input.len() {
                if accept_endmarker {
                    return Ok(Token::new(
                        TokenKind::EndMarker,
                        "",
                        self.line,
                        self.column(),
                        self.pos,
                    ));
                }
                return Err(SyntaxError {
                    position: self.position_here(),
                    message: "could not find any of the expected tokens before end of message"
                        .to_owned(),
                    suggestion: None,
                    instrumented_line: ims_types::error::instrument_line(
                        self.current_line_text(),
                        self.column(),
                    ),
                }
                .into());
            }

            // Try matching each requested kind, anchored at every remaining
            // position in turn (equivalent to the reference lexer's
            // unanchored `regexp.search`).
            for probe in self.pos..self.input.len() {
                if !self.input.is_char_boundary(probe) {
                    continue;
                }
                let rest = &self.input[probe..];
                for (kind, matcher) in CATALOG {
                    if !kinds.iter().any(|k| kind_eq(*k, *kind)) {
                        continue;
                    }
                    let Some(matched_len) = try_match(matcher, rest) else {
                        continue;
                    };
                    let next_char = rest[matched_len..].chars().next();
                    let vetoed = match kind {
                        TokenKind::Number | TokenKind::Datetime => {
                            !lexicon::follows_number_ok(next_char)
                        }
                        _ if matches!(
                            kind.family(),
                            Family::Keyword
                                | Family::ShiProduct
                                | Family::RadProduct
                                | Family::TestProductFamily
                                | Family::SubscriptionCommand
                        ) =>
                        {
                            !lexicon::follows_keyword_ok(next_char)
                        }
                        _ => false,
                    };
                    if vetoed {
                        continue;
                    }

                    let text = rest[..matched_len].to_owned();
                    let line = count_lines(&self.input[..probe]);
                    let line_start = self.input[..probe].rfind('\n').map(|i| i + 1).unwrap_or(0);
                    let column = probe - line_start;

                    self.line = line;
                    self.line_start = line_start;
                    self.advance_past(probe - self.pos, false);
                    self.advance_past(matched_len, matches!(kind, TokenKind::Newline));

                    return Ok(Token::new(*kind, text, line, column, probe));
                }
            }

            // Nothing matched anywhere in the remainder of the buffer.
            self.pos = self.input.len();
        }
    }

    fn unexpected(&self, tok: &Token, expected: &[TokenKind]) -> SyntaxError {
        let message = if expected.len() == 1 {
            format!("expected {:?} but found {:?} ({:?})", expected[0], tok.kind, tok.text)
        } else {
            format!(
                "expected one of {:?} but found {:?} ({:?})",
                expected, tok.kind, tok.text
            )
        };
        self.error_at(tok, message)
    }

    /// Builds a `SyntaxError` positioned at `tok` with a caller-supplied
    /// message, for productions whose failure is better described than the
    /// generic "expected X but found Y" shape `unexpected` produces.
    pub fn error_at(&self, tok: &Token, message: impl Into<String>) -> SyntaxError {
        let position = if matches!(tok.kind, TokenKind::EndMarker) {
            Position::Eof { line: tok.line }
        } else {
            Position::At {
                line: tok.line,
                column: tok.column,
            }
        };
        SyntaxError {
            position,
            message: message.into(),
            suggestion: None,
            instrumented_line: ims_types::error::instrument_line(
                self.current_line_text(),
                tok.column,
            ),
        }
    }

    /// Returns essential header fields recoverable from raw text alone, used
    /// when parsing fails before the header has been fully understood.
    pub fn get_header_on_error(message: &str) -> PartialHeader {
        let mut header = PartialHeader {
            language: "IMSLANGUAGE",
            id: None,
            source: None,
            format: None,
        };

        if let Some(caps) = MSGID_PATTERN_RE.captures(message) {
            if let Some(m) = caps.name("msgid") {
                header.id = Some(m.as_str().to_owned());
            }
            if let Some(m) = caps.name("msgsource") {
                header.source = Some(m.as_str().to_owned());
            }
        }

        if let Some(caps) = MSGFORMAT_PATTERN_RE.captures(message) {
            if let Some(m) = caps.name("msgfmt") {
                header.format = Some(m.as_str().to_owned());
            }
        }

        header
    }
}

#[derive(Clone, Debug, Default)]
pub struct PartialHeader {
    pub language: &'static str,
    pub id: Option<String>,
    pub source: Option<String>,
    pub format: Option<String>,
}

fn count_lines(prefix: &str) -> usize {
    1 + prefix.matches('\n').count()
}

/// `TokenKind` equality that treats the three `Id`-family virtual kinds as
/// distinct from each other (grammar productions that accept `Id` do not
/// automatically accept `WcId`/`Data` unless they ask for it explicitly).
fn kind_eq(expected: TokenKind, actual: TokenKind) -> bool {
    expected == actual
}

static MSGID_PATTERN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)MSG_ID([ \t])+(?P<msgid>[\d/*A-Za-z_+=()<>]([\w]|[\d/=<>:().@*+-])*)(([ \t])+(?P<msgsource>[\d/*A-Za-z_+=()<>]([\w]|[\d/=<>:().@*+-])*))?",
    )
    .expect("MSGID_PATTERN_RE compiles")
});

static MSGFORMAT_PATTERN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)BEGIN([ \t])+(?P<msgfmt>[A-Za-z]{3}(\d+\.\d+))").expect("MSGFORMAT_PATTERN_RE compiles")
});

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut tz = Tokenizer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = tz.next().expect("lexes cleanly");
            let done = matches!(tok.kind, TokenKind::EndMarker);
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn tokenizes_a_begin_line() {
        let toks = kinds("BEGIN IMS2.0\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Begin,
                TokenKind::MsgFormat,
                TokenKind::Newline,
                TokenKind::EndMarker
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_not_vetoed_into_a_shorter_keyword() {
        let mut tz = Tokenizer::new("WAVEFORMX\n");
        let tok = tz.next().expect("lexes cleanly");
        assert_eq!(tok.kind, TokenKind::Id);
        assert_eq!(tok.text, "WAVEFORMX");
    }

    #[test]
    fn number_followed_by_letters_is_an_id() {
        let mut tz = Tokenizer::new("1234ABC\n");
        let tok = tz.next().expect("lexes cleanly");
        assert_eq!(tok.kind, TokenKind::Id);
    }

    #[test]
    fn wildcard_id_is_classified() {
        let mut tz = Tokenizer::new("STA*\n");
        let tok = tz.next().expect("lexes cleanly");
        assert_eq!(tok.kind, TokenKind::WcId);
    }

    #[test]
    fn long_or_punctuated_id_is_data() {
        let mut tz = Tokenizer::new("a=b\n");
        let tok = tz.next().expect("lexes cleanly");
        assert_eq!(tok.kind, TokenKind::Data);
    }

    #[test]
    fn boolean_folds_false_variants_only() {
        assert!(!fold_boolean("FALSE"));
        assert!(!fold_boolean("no"));
        assert!(!fold_boolean("0"));
        assert!(fold_boolean("TRUE"));
        assert!(fold_boolean("yes"));
    }

    #[test]
    fn illegal_character_reports_position() {
        let mut tz = Tokenizer::new("$\n");
        let err = tz.next().unwrap_err();
        assert_eq!(err.position, Position::At { line: 1, column: 0 });
    }

    #[test]
    fn endmarker_terminates_empty_input() {
        let mut tz = Tokenizer::new("");
        let tok = tz.next().expect("lexes cleanly");
        assert_eq!(tok.kind, TokenKind::EndMarker);
    }

    #[test]
    fn header_recovery_extracts_id_and_format() {
        let header = Tokenizer::get_header_on_error("BEGIN IMS2.0\nMSG_TYPE REQUEST\nMSG_ID abc123\n");
        assert_eq!(header.id.as_deref(), Some("abc123"));
        assert_eq!(header.format.as_deref(), Some("IMS2.0"));
    }

    #[test]
    fn current_tracks_the_last_token_returned() {
        let mut tz = Tokenizer::new("BEGIN IMS2.0\n");
        assert!(tz.current().is_none());
        tz.next().expect("lexes cleanly");
        assert_eq!(tz.current().map(|t| t.kind), Some(TokenKind::Begin));
    }

    #[test]
    fn consume_next_tokens_pulls_a_fixed_arity_run() {
        let mut tz = Tokenizer::new("123 456\n");
        let toks = tz.consume_next_tokens(2).expect("two numbers");
        assert_eq!(toks.iter().map(|t| t.kind).collect::<Vec<_>>(), vec![TokenKind::Number, TokenKind::Number]);
    }
}
