//! Tokenizer for the expression subset understood by the parser.

use super::ast::Span;
use crate::SyntaxError;

/// Punctuators, longest first so that the first match is the longest one.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".",
];

/// Words that cannot be used as unquoted property names when serializing.
const RESERVED_WORDS: &[&str] = &[
    "do", "if", "in", "for", "let", "new", "try", "var", "case", "else", "enum", "eval", "false",
    "null", "this", "true", "void", "with", "break", "catch", "class", "const", "super", "throw",
    "while", "yield", "delete", "export", "import", "public", "return", "static", "switch",
    "typeof", "default", "extends", "finally", "package", "private", "continue", "debugger",
    "function", "arguments", "interface", "protected", "implements", "instanceof",
];

const REGEX_FLAGS: &str = "dgimsuyv";

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Number(f64),
    String(String),
    RegExp { pattern: String, flags: String },
    Punct(&'static str),
    Eof,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self, Token::Punct(q) if *q == p)
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, Token::Name(n) if n == name)
    }

    /// Short form used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Name(n) => n.clone(),
            Token::Number(n) => crate::number::to_js_string(*n),
            Token::String(s) => format!("{:?}", s),
            Token::RegExp { pattern, flags } => format!("/{}/{}", pattern, flags),
            Token::Punct(p) => p.to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
    /// Whether a line terminator separates this token from the previous one.
    pub newline_before: bool,
}

pub type LexResult<T> = Result<T, (Span, SyntaxError)>;

pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

pub fn is_id_part(c: char) -> bool {
    is_id_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

/// Whether `s` lexes as a single identifier token.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_id_start(c) => chars.all(is_id_part),
        _ => false,
    }
}

pub fn is_reserved_word(s: &str) -> bool {
    RESERVED_WORDS.contains(&s)
}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    #[inline]
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn err<T>(&self, start: usize, e: SyntaxError) -> LexResult<T> {
        Err((Span::new(start, self.pos.max(start)), e))
    }

    // Skips whitespace and comments, returning whether a line terminator was
    // crossed.
    fn skip_trivia(&mut self) -> LexResult<bool> {
        let mut newline = false;
        while let Some(ch) = self.peek() {
            if is_line_terminator(ch) {
                newline = true;
                self.bump();
            } else if ch.is_whitespace() || ch == '\u{feff}' {
                self.bump();
            } else if ch == '/' && self.peek_nth(1) == Some('/') {
                while let Some(c) = self.peek() {
                    if is_line_terminator(c) {
                        break;
                    }
                    self.bump();
                }
            } else if ch == '/' && self.peek_nth(1) == Some('*') {
                let start = self.pos;
                self.pos += 2;
                loop {
                    match self.bump() {
                        Some('*') if self.peek() == Some('/') => {
                            self.bump();
                            break;
                        }
                        Some(c) if is_line_terminator(c) => newline = true,
                        Some(_) => {}
                        None => return self.err(start, SyntaxError::UnterminatedComment),
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    pub fn next_token(&mut self) -> LexResult<Lexeme> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;
        let ch = match self.peek() {
            Some(ch) => ch,
            None => {
                return Ok(Lexeme {
                    token: Token::Eof,
                    span: Span::new(start, start),
                    newline_before,
                })
            }
        };
        let token = match ch {
            '"' | '\'' => self.read_string(ch)?,
            '0'..='9' => self.read_number()?,
            '.' if matches!(self.peek_nth(1), Some('0'..='9')) => self.read_number()?,
            '`' => {
                self.bump();
                return self.err(start, SyntaxError::Unsupported("template literals"));
            }
            c if is_id_start(c) => self.read_name(),
            _ => self.read_punct()?,
        };
        Ok(Lexeme {
            token,
            span: Span::new(start, self.pos),
            newline_before,
        })
    }

    /// Re-reads the input starting at the `/` found at `start` as a regular
    /// expression literal. The parser calls this where an expression begins,
    /// since only the grammar can tell a regex from a division.
    pub fn rescan_regex(&mut self, start: usize, newline_before: bool) -> LexResult<Lexeme> {
        self.pos = start + 1;
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.bump() {
                None => return self.err(start, SyntaxError::UnterminatedRegex),
                Some(c) if is_line_terminator(c) => {
                    return self.err(start, SyntaxError::UnterminatedRegex)
                }
                Some('\\') => match self.bump() {
                    Some(c) if !is_line_terminator(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    _ => return self.err(start, SyntaxError::UnterminatedRegex),
                },
                Some('/') if !in_class => break,
                Some(c) => {
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        _ => {}
                    }
                    pattern.push(c);
                }
            }
        }
        let flags_start = self.pos;
        while let Some(c) = self.peek() {
            if !is_id_part(c) {
                break;
            }
            self.bump();
        }
        let flags = &self.src[flags_start..self.pos];
        let mut seen = String::new();
        for c in flags.chars() {
            if !REGEX_FLAGS.contains(c) || seen.contains(c) {
                return self.err(flags_start, SyntaxError::InvalidRegexFlags(flags.to_string()));
            }
            seen.push(c);
        }
        Ok(Lexeme {
            token: Token::RegExp {
                pattern,
                flags: seen,
            },
            span: Span::new(start, self.pos),
            newline_before,
        })
    }

    fn read_name(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_id_part(c) {
                break;
            }
            self.bump();
        }
        Token::Name(self.src[start..self.pos].to_string())
    }

    fn read_punct(&mut self) -> LexResult<Token> {
        let start = self.pos;
        let rest = &self.src[self.pos..];
        for p in PUNCTUATORS {
            if rest.starts_with(p) {
                // `a?.5:1` is a conditional, not optional chaining.
                if *p == "?." && matches!(rest[2..].chars().next(), Some('0'..='9')) {
                    continue;
                }
                self.pos += p.len();
                return Ok(Token::Punct(p));
            }
        }
        let ch = self.bump().unwrap_or_default();
        self.err(start, SyntaxError::UnexpectedChar(ch))
    }

    fn read_number(&mut self) -> LexResult<Token> {
        let start = self.pos;
        let radix = match (self.peek(), self.peek_nth(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };
        let value = if radix != 10 {
            self.pos += 2;
            self.read_radix_digits(start, radix)?
        } else {
            self.read_decimal(start)?
        };
        match self.peek() {
            Some('n') => {
                self.bump();
                self.err(start, SyntaxError::Unsupported("BigInt literals"))
            }
            Some(c) if is_id_start(c) || c.is_ascii_digit() => {
                while matches!(self.peek(), Some(c) if is_id_part(c)) {
                    self.bump();
                }
                self.err(
                    start,
                    SyntaxError::InvalidNumber(self.src[start..self.pos].to_string()),
                )
            }
            _ => Ok(Token::Number(value)),
        }
    }

    fn read_radix_digits(&mut self, start: usize, radix: u32) -> LexResult<f64> {
        let digits_start = self.pos;
        let mut value = 0f64;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(radix)) {
            value = value * radix as f64 + d as f64;
            self.bump();
        }
        if self.pos == digits_start {
            return self.err(
                start,
                SyntaxError::InvalidNumber(self.src[start..self.pos].to_string()),
            );
        }
        Ok(value)
    }

    fn read_decimal(&mut self, start: usize) -> LexResult<f64> {
        self.skip_digits();
        let int_part = &self.src[start..self.pos];
        // Legacy octal, e.g. `0755`.
        if int_part.len() > 1
            && int_part.starts_with('0')
            && int_part.bytes().all(|b| (b'0'..=b'7').contains(&b))
        {
            let value = int_part
                .bytes()
                .fold(0f64, |acc, b| acc * 8.0 + (b - b'0') as f64);
            return Ok(value);
        }
        if self.peek() == Some('.') {
            self.bump();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exp_start = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !matches!(self.peek(), Some('0'..='9')) {
                self.pos = exp_start;
                return self.err(
                    start,
                    SyntaxError::InvalidNumber(self.src[start..exp_start + 1].to_string()),
                );
            }
            self.skip_digits();
        }
        let raw = &self.src[start..self.pos];
        raw.parse::<f64>()
            .or_else(|_| self.err(start, SyntaxError::InvalidNumber(raw.to_string())))
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some('0'..='9')) {
            self.bump();
        }
    }

    fn read_string(&mut self, quote: char) -> LexResult<Token> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return self.err(start, SyntaxError::UnterminatedString),
                Some(c) if c == quote => return Ok(Token::String(value)),
                Some('\\') => {
                    if let Some(c) = self.read_escape(start)? {
                        value.push(c);
                    }
                }
                Some('\n' | '\r') => return self.err(start, SyntaxError::UnterminatedString),
                Some(c) => value.push(c),
            }
        }
    }

    // Returns `None` for line continuations.
    fn read_escape(&mut self, string_start: usize) -> LexResult<Option<char>> {
        let escape_start = self.pos - 1;
        let escape_type = match self.bump() {
            Some(c) => c,
            None => return self.err(string_start, SyntaxError::UnterminatedString),
        };
        Ok(Some(match escape_type {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            'x' => {
                let code = self.read_hex_digits(escape_start, 2)?;
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            'u' => self.read_unicode_escape(escape_start)?,
            '0'..='7' => {
                let mut code = escape_type.to_digit(8).unwrap_or(0);
                // Up to three octal digits, never exceeding 0o377.
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) if code * 8 + d <= 0o377 => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        _ => break,
                    }
                }
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
                return Ok(None);
            }
            c if is_line_terminator(c) => return Ok(None),
            c => c,
        }))
    }

    fn read_hex_digits(&mut self, escape_start: usize, count: usize) -> LexResult<u32> {
        let mut code = 0u32;
        for _ in 0..count {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    code = code * 16 + d;
                    self.bump();
                }
                None => return self.err(escape_start, SyntaxError::InvalidEscape),
            }
        }
        Ok(code)
    }

    fn read_unicode_escape(&mut self, escape_start: usize) -> LexResult<char> {
        if self.peek() == Some('{') {
            self.bump();
            let mut code = 0u32;
            let mut digits = 0;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                code = code.saturating_mul(16).saturating_add(d);
                digits += 1;
                self.bump();
            }
            if digits == 0 || self.bump() != Some('}') || code > 0x10ffff {
                return self.err(escape_start, SyntaxError::InvalidEscape);
            }
            return Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        let code = self.read_hex_digits(escape_start, 4)?;
        if (0xd800..0xdc00).contains(&code) && self.src[self.pos..].starts_with("\\u") {
            let rewind = self.pos;
            self.pos += 2;
            match self.read_hex_digits(escape_start, 4) {
                Ok(low) if (0xdc00..0xe000).contains(&low) => {
                    let combined = 0x10000 + ((code - 0xd800) << 10) + (low - 0xdc00);
                    return Ok(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                _ => self.pos = rewind,
            }
        }
        // Lone surrogates have no `char` representation.
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let lexeme = lexer.next_token().unwrap();
            if lexeme.token == Token::Eof {
                return out;
            }
            out.push(lexeme.token);
        }
    }

    #[test]
    fn numbers() {
        const TEST_CASES: &[(&str, f64)] = &[
            ("0", 0.0),
            ("42", 42.0),
            ("3.25", 3.25),
            (".5", 0.5),
            ("1e3", 1000.0),
            ("2.5E-2", 0.025),
            ("0xff", 255.0),
            ("0b101", 5.0),
            ("0o17", 15.0),
            ("0755", 493.0),
            ("089", 89.0),
        ];
        for (src, expected) in TEST_CASES {
            assert_eq!(tokens(src), vec![Token::Number(*expected)], "{}", src);
        }
    }

    #[test]
    fn strings_and_escapes() {
        const TEST_CASES: &[(&str, &str)] = &[
            (r#""plain""#, "plain"),
            (r#"'single'"#, "single"),
            (r#""a\"b""#, "a\"b"),
            (r#""tab\there""#, "tab\there"),
            (r#""\x41\u0042\u{43}""#, "ABC"),
            (r#""\ud83d\ude00""#, "\u{1f600}"),
            (r#""\ud83d""#, "\u{fffd}"),
            ("\"line\\\ncontinued\"", "linecontinued"),
            (r#""\101""#, "A"),
            (r#""\q""#, "q"),
        ];
        for (src, expected) in TEST_CASES {
            assert_eq!(
                tokens(src),
                vec![Token::String(expected.to_string())],
                "{}",
                src
            );
        }
    }

    #[test]
    fn punctuators_and_comments() {
        assert_eq!(
            tokens("a /* x */ >>>= b // trailing\n?.c"),
            vec![
                Token::Name("a".to_string()),
                Token::Punct(">>>="),
                Token::Name("b".to_string()),
                Token::Punct("?."),
                Token::Name("c".to_string()),
            ]
        );
        assert_eq!(
            tokens("a?.5:1"),
            vec![
                Token::Name("a".to_string()),
                Token::Punct("?"),
                Token::Number(0.5),
                Token::Punct(":"),
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn newline_tracking() {
        let mut lexer = Lexer::new("a /* \n */ b c");
        assert!(!lexer.next_token().unwrap().newline_before);
        assert!(lexer.next_token().unwrap().newline_before);
        assert!(!lexer.next_token().unwrap().newline_before);
    }

    #[test]
    fn regex_rescan() {
        let src = r"/a[/]b\/c/gi";
        let mut lexer = Lexer::new(src);
        let slash = lexer.next_token().unwrap();
        assert_eq!(slash.token, Token::Punct("/"));
        let regex = lexer.rescan_regex(slash.span.start, false).unwrap();
        assert_eq!(
            regex.token,
            Token::RegExp {
                pattern: r"a[/]b\/c".to_string(),
                flags: "gi".to_string()
            }
        );
        assert_eq!(regex.span, Span::new(0, src.len()));
    }

    #[test]
    fn lexing_errors() {
        const TEST_CASES: &[(&str, SyntaxError)] = &[
            ("\"open", SyntaxError::UnterminatedString),
            ("/* open", SyntaxError::UnterminatedComment),
            ("#", SyntaxError::UnexpectedChar('#')),
            ("`tpl`", SyntaxError::Unsupported("template literals")),
            ("10n", SyntaxError::Unsupported("BigInt literals")),
            ("\"\\u12\"", SyntaxError::InvalidEscape),
        ];
        for (src, expected) in TEST_CASES {
            let (_, err) = Lexer::new(src).next_token().unwrap_err();
            assert_eq!(err, *expected, "{}", src);
        }

        let mut lexer = Lexer::new("/abc/gg");
        let slash = lexer.next_token().unwrap();
        let (_, err) = lexer.rescan_regex(slash.span.start, false).unwrap_err();
        assert_eq!(err, SyntaxError::InvalidRegexFlags("gg".to_string()));
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("abc"));
        assert!(is_identifier("$ref"));
        assert!(is_identifier("_id"));
        assert!(is_identifier("café"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
        assert!(is_reserved_word("class"));
        assert!(!is_reserved_word("klass"));
    }
}
