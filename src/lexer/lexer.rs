use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

pub type RegexHandler = fn(&mut Lexer, &Regex) -> Result<(), Error>;

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

impl RegexPattern {
    fn new(pattern: &str, handler: RegexHandler) -> Self {
        RegexPattern {
            regex: Regex::new(pattern).unwrap(),
            handler,
        }
    }
}

lazy_static! {
    // Order matters: longer operators before their prefixes, bytes/f-string
    // prefixes before plain identifiers.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        RegexPattern::new("^[ \\t\\r]+", skip_handler),
        RegexPattern::new("^//[^\\n]*", skip_handler),
        RegexPattern::new("^\\n", MK_DEFAULT_HANDLER!(TokenKind::Newline, "\n")),
        RegexPattern::new("^b\"(?:[^\"\\\\\\n]|\\\\.)*\"", bytes_handler),
        RegexPattern::new("^b'(?:[^'\\\\\\n]|\\\\.)*'", bytes_handler),
        RegexPattern::new("^b[\"']", unterminated_handler),
        RegexPattern::new("^f\"", fstring_handler),
        RegexPattern::new("^[a-zA-Z_][a-zA-Z0-9_]*", symbol_handler),
        RegexPattern::new("^[0-9]+(\\.[0-9]+)?", number_handler),
        RegexPattern::new("^\"(?:[^\"\\\\\\n]|\\\\.)*\"", string_handler),
        RegexPattern::new("^\"", unterminated_handler),
        RegexPattern::new("^\\[", MK_DEFAULT_HANDLER!(TokenKind::OpenBracket, "[")),
        RegexPattern::new("^\\]", MK_DEFAULT_HANDLER!(TokenKind::CloseBracket, "]")),
        RegexPattern::new("^\\{", MK_DEFAULT_HANDLER!(TokenKind::OpenCurly, "{")),
        RegexPattern::new("^\\}", MK_DEFAULT_HANDLER!(TokenKind::CloseCurly, "}")),
        RegexPattern::new("^\\(", MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(")),
        RegexPattern::new("^\\)", MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")")),
        RegexPattern::new("^==", MK_DEFAULT_HANDLER!(TokenKind::Equals, "==")),
        RegexPattern::new("^!=", MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=")),
        RegexPattern::new("^!", MK_DEFAULT_HANDLER!(TokenKind::Not, "!")),
        RegexPattern::new("^=", MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=")),
        RegexPattern::new("^<=", MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=")),
        RegexPattern::new("^<", MK_DEFAULT_HANDLER!(TokenKind::Less, "<")),
        RegexPattern::new("^>=", MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=")),
        RegexPattern::new("^>", MK_DEFAULT_HANDLER!(TokenKind::Greater, ">")),
        RegexPattern::new("^\\|", MK_DEFAULT_HANDLER!(TokenKind::Or, "|")),
        RegexPattern::new("^&", MK_DEFAULT_HANDLER!(TokenKind::And, "&")),
        RegexPattern::new("^\\.", MK_DEFAULT_HANDLER!(TokenKind::Dot, ".")),
        RegexPattern::new("^:", MK_DEFAULT_HANDLER!(TokenKind::Colon, ":")),
        RegexPattern::new("^,", MK_DEFAULT_HANDLER!(TokenKind::Comma, ",")),
        RegexPattern::new("^->", MK_DEFAULT_HANDLER!(TokenKind::Arrow, "->")),
        RegexPattern::new("^\\+", MK_DEFAULT_HANDLER!(TokenKind::Plus, "+")),
        RegexPattern::new("^-", MK_DEFAULT_HANDLER!(TokenKind::Dash, "-")),
        RegexPattern::new("^/", MK_DEFAULT_HANDLER!(TokenKind::Slash, "/")),
        RegexPattern::new("^\\*", MK_DEFAULT_HANDLER!(TokenKind::Star, "*")),
        RegexPattern::new("^%", MK_DEFAULT_HANDLER!(TokenKind::Percent, "%")),
    ];
}

pub struct Lexer {
    tokens: Vec<Token>,
    source: String,
    pos: usize,
    line: u32,
    column: u32,
    file: Rc<String>,
}

impl Lexer {
    pub fn new(source: String, file: Option<String>) -> Lexer {
        let file_name = if let Some(file) = file {
            Rc::new(file)
        } else {
            Rc::new(String::from("shell"))
        };

        Lexer {
            tokens: vec![],
            source,
            pos: 0,
            line: 1,
            column: 1,
            file: file_name,
        }
    }

    /// Starts lexing at `position` instead of the top of the file, used for
    /// expressions embedded in f-strings.
    pub fn at_position(source: String, position: &Position) -> Lexer {
        Lexer {
            tokens: vec![],
            source,
            pos: 0,
            line: position.line,
            column: position.column,
            file: Rc::clone(&position.file),
        }
    }

    /// Consumes `n` bytes, keeping line and column in sync.
    pub fn advance_n(&mut self, n: usize) {
        let end = (self.pos + n).min(self.source.len());
        for ch in self.source[self.pos..end].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn at(&self) -> char {
        self.remainder().chars().next().unwrap_or('\0')
    }

    pub fn remainder(&self) -> &str {
        &self.source[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column, Rc::clone(&self.file))
    }

    /// Pushes a token for the next `length` bytes and consumes them.
    fn push_consumed(&mut self, kind: TokenKind, value: String, length: usize) {
        let start = self.position();
        self.advance_n(length);
        let end = self.position();
        self.push(MK_TOKEN!(kind, value, Span { start, end }));
    }
}

fn matched_len(lexer: &Lexer, regex: &Regex) -> usize {
    regex.find(lexer.remainder()).map(|m| m.end()).unwrap_or(0)
}

fn skip_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let length = matched_len(lexer, regex);
    lexer.advance_n(length);
    Ok(())
}

fn number_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let length = matched_len(lexer, regex);
    let matched = lexer.remainder()[..length].to_string();
    let kind = if matched.contains('.') {
        TokenKind::Float
    } else {
        TokenKind::Int
    };

    lexer.push_consumed(kind, matched, length);
    Ok(())
}

fn string_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let length = matched_len(lexer, regex);
    let body = &lexer.remainder()[1..length - 1];
    let value = unescape(body, false);

    lexer.push_consumed(TokenKind::String, value, length);
    Ok(())
}

fn bytes_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let length = matched_len(lexer, regex);
    // Skip the `b` prefix and the quotes.
    let body = &lexer.remainder()[2..length - 1];
    let value = unescape(body, true);

    lexer.push_consumed(TokenKind::Bytes, value, length);
    Ok(())
}

fn unterminated_handler(lexer: &mut Lexer, _regex: &Regex) -> Result<(), Error> {
    let literal = if lexer.remainder().starts_with('b') {
        "bytes"
    } else {
        "string"
    };

    Err(Error::new(
        ErrorImpl::UnterminatedString {
            literal: String::from(literal),
        },
        lexer.position(),
    ))
}

/// F-strings are scanned by hand: quotes are allowed inside `{...}` so that
/// embedded expressions may themselves contain string literals.
fn fstring_handler(lexer: &mut Lexer, _regex: &Regex) -> Result<(), Error> {
    let rest = lexer.remainder();
    let mut depth = 0usize;
    let mut escaped = false;
    let mut end = None;

    for (index, ch) in rest.char_indices().skip(2) {
        if ch == '\n' {
            break;
        }

        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' if depth == 0 => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '"' if depth == 0 => {
                end = Some(index);
                break;
            }
            _ => {}
        }
    }

    let Some(end) = end else {
        return Err(Error::new(
            ErrorImpl::UnterminatedString {
                literal: String::from("f-string"),
            },
            lexer.position(),
        ));
    };

    let body = rest[2..end].to_string();
    lexer.push_consumed(TokenKind::FString, body, end + 1);
    Ok(())
}

fn symbol_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let length = matched_len(lexer, regex);
    let value = lexer.remainder()[..length].to_string();

    let kind = RESERVED_LOOKUP
        .get(value.as_str())
        .copied()
        .unwrap_or(TokenKind::Identifier);

    lexer.push_consumed(kind, value, length);
    Ok(())
}

/// Resolves backslash escapes. In `bytes_mode` every resulting char stands for
/// one byte, so non-ASCII source text is split into its UTF-8 bytes.
pub fn unescape(body: &str, bytes_mode: bool) -> String {
    let mut result = String::new();
    let mut chars = body.chars().peekable();

    let push_plain = |result: &mut String, ch: char| {
        if bytes_mode && !ch.is_ascii() {
            let mut buffer = [0u8; 4];
            for byte in ch.encode_utf8(&mut buffer).bytes() {
                result.push(char::from(byte));
            }
        } else {
            result.push(ch);
        }
    };

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            push_plain(&mut result, ch);
            continue;
        }

        match chars.peek().copied() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some('\\') => result.push('\\'),
            Some('{') => result.push('{'),
            Some('}') => result.push('}'),
            Some('x') => {
                chars.next();
                let mut hex = String::new();
                while hex.len() < 2 {
                    match chars.peek() {
                        Some(digit) if digit.is_ascii_hexdigit() => {
                            hex.push(*digit);
                            chars.next();
                        }
                        _ => break,
                    }
                }

                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) => result.push(char::from(byte)),
                    Err(_) => {
                        result.push_str("\\x");
                        result.push_str(&hex);
                    }
                }
                continue;
            }
            Some(other) => {
                // Unknown escapes keep their backslash.
                result.push('\\');
                push_plain(&mut result, other);
            }
            None => {
                result.push('\\');
                continue;
            }
        }

        chars.next();
    }

    result
}

pub fn tokenize(source: String, file: Option<String>) -> Result<Vec<Token>, Error> {
    tokenize_with(Lexer::new(source, file))
}

pub fn tokenize_with(mut lex: Lexer) -> Result<Vec<Token>, Error> {
    while !lex.at_eof() {
        let mut matched = false;

        for pattern in PATTERNS.iter() {
            if pattern.regex.is_match(lex.remainder()) {
                (pattern.handler)(&mut lex, &pattern.regex)?;
                matched = true;
                break;
            }
        }

        if !matched {
            return Err(Error::new(
                ErrorImpl::UnrecognisedToken {
                    token: lex.at().to_string(),
                },
                lex.position(),
            ));
        }
    }

    let end = lex.position();
    lex.push(MK_TOKEN!(
        TokenKind::EOF,
        String::from("EOF"),
        Span {
            start: end.clone(),
            end
        }
    ));
    Ok(lex.tokens)
}
