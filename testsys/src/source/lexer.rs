//! Tokenizer for submitted Python source.
//!
//! Produces the token stream the outline parser needs: names, numbers,
//! strings (with f-string expressions tokenized as nested tokens), operators,
//! and `Newline`/`Indent`/`Dedent` markers. Comments and blank lines are
//! dropped, newlines inside brackets and after a `\` continuation are joined.

use super::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offsets into the tokenized source.
    pub start: usize,
    pub end: usize,
    pub line: usize,
    /// Tokens of the `{...}` expressions of an f-string.
    pub nested: Vec<Token>,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub fn is_name(&self, name: &str) -> bool {
        self.kind == TokenKind::Name && self.text == name
    }

    pub fn is_structural(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::EndMarker
        )
    }
}

const OPS3: [&str; 5] = ["**=", "//=", ">>=", "<<=", "..."];
const OPS2: [&str; 19] = [
    "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const OPS1: &str = "()[]{}:,;.+-*/%&|^~<>=@!";

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

struct Lexer<'s> {
    src: &'s str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    brackets: Vec<(char, usize)>,
    indents: Vec<usize>,
    tokens: Vec<Token>,
    at_line_start: bool,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            brackets: Vec::new(),
            indents: vec![0],
            tokens: Vec::new(),
            at_line_start: true,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or(self.src.len())
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.line)
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize, line: usize) {
        self.tokens.push(Token {
            kind,
            text: self.src[start..end].to_string(),
            start,
            end,
            line,
            nested: Vec::new(),
        });
    }

    fn marker(&mut self, kind: TokenKind) {
        let at = self.offset();
        self.tokens.push(Token {
            kind,
            text: String::new(),
            start: at,
            end: at,
            line: self.line,
            nested: Vec::new(),
        });
    }

    fn ends_line(&self) -> bool {
        self.tokens
            .last()
            .map(|t| !t.is_structural())
            .unwrap_or(false)
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                let mut col = 0;
                while let Some(c) = self.peek() {
                    match c {
                        ' ' => col += 1,
                        '\t' => col = (col / 8 + 1) * 8,
                        '\x0c' => col = 0,
                        _ => break,
                    }
                    self.pos += 1;
                }
                match self.peek() {
                    None => break,
                    Some('\n') => {
                        self.pos += 1;
                        self.line += 1;
                        continue;
                    }
                    Some('\r') => {
                        self.pos += 1;
                        continue;
                    }
                    Some('#') => {
                        self.skip_comment();
                        continue;
                    }
                    _ => {}
                }
                self.indent(col)?;
                self.at_line_start = false;
            }

            let Some(c) = self.peek() else { break };
            match c {
                ' ' | '\t' | '\x0c' | '\r' => self.pos += 1,
                '\n' => {
                    if self.brackets.is_empty() {
                        if self.ends_line() {
                            self.marker(TokenKind::Newline);
                        }
                        self.at_line_start = true;
                    }
                    self.pos += 1;
                    self.line += 1;
                }
                '#' => self.skip_comment(),
                '\\' => {
                    let next = if self.peek_at(1) == Some('\r') { 2 } else { 1 };
                    if self.peek_at(next) != Some('\n') {
                        return Err(
                            self.error("unexpected character after line continuation character")
                        );
                    }
                    self.pos += next + 1;
                    self.line += 1;
                }
                '"' | '\'' => self.string(0)?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
                c if c.is_alphabetic() || c == '_' => {
                    let prefix = self.string_prefix_len();
                    if prefix > 0 {
                        self.string(prefix)?;
                    } else {
                        self.name();
                    }
                }
                _ => self.operator()?,
            }
        }

        if let Some(&(open, line)) = self.brackets.last() {
            return Err(SyntaxError::new(format!("'{}' was never closed", open), line));
        }
        if self.ends_line() {
            self.marker(TokenKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.marker(TokenKind::Dedent);
        }
        self.marker(TokenKind::EndMarker);
        Ok(self.tokens)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn indent(&mut self, col: usize) -> Result<(), SyntaxError> {
        let top = *self.indents.last().unwrap_or(&0);
        if col > top {
            self.indents.push(col);
            self.marker(TokenKind::Indent);
        } else if col < top {
            while col < *self.indents.last().unwrap_or(&0) {
                self.indents.pop();
                self.marker(TokenKind::Dedent);
            }
            if col != *self.indents.last().unwrap_or(&0) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        Ok(())
    }

    /// Length of a string prefix (`r`, `b`, `f`, `rb`, ...) directly followed
    /// by a quote, or 0.
    fn string_prefix_len(&self) -> usize {
        for len in 1..=2 {
            let letters_ok = (0..len).all(|i| {
                self.peek_at(i)
                    .is_some_and(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'))
            });
            if !letters_ok {
                return 0;
            }
            if matches!(self.peek_at(len), Some('"') | Some('\'')) {
                return len;
            }
        }
        0
    }

    fn string(&mut self, prefix: usize) -> Result<(), SyntaxError> {
        let start = self.offset();
        let line = self.line;
        let is_format = (0..prefix).any(|i| matches!(self.peek_at(i), Some('f') | Some('F')));
        self.pos += prefix;

        let quote = self.peek().unwrap_or('"');
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let width = if triple { 3 } else { 1 };
        self.pos += width;
        let body_start = self.offset();

        let body_end = loop {
            let Some(c) = self.peek() else {
                return Err(SyntaxError::new(
                    if triple {
                        "unterminated triple-quoted string literal"
                    } else {
                        "unterminated string literal"
                    },
                    line,
                ));
            };
            match c {
                '\\' => {
                    if self.peek_at(1) == Some('\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                }
                '\n' if !triple => {
                    return Err(SyntaxError::new("unterminated string literal", line));
                }
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                c if c == quote
                    && (!triple
                        || (self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote))) =>
                {
                    let end = self.offset();
                    self.pos += width;
                    break end;
                }
                _ => self.pos += 1,
            }
        };

        let end = self.offset();
        self.push(TokenKind::String, start, end, line);
        if is_format {
            let nested = format_expressions(self.src, body_start, body_end, line);
            if let Some(token) = self.tokens.last_mut() {
                token.nested = nested;
            }
        }
        Ok(())
    }

    fn number(&mut self) {
        let start = self.offset();
        let line = self.line;
        let hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X'));
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                let exponent = !hex && matches!(c, 'e' | 'E');
                self.pos += 1;
                if exponent && matches!(self.peek(), Some('+') | Some('-')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        let end = self.offset();
        self.push(TokenKind::Number, start, end, line);
    }

    fn name(&mut self) {
        let start = self.offset();
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let end = self.offset();
        self.push(TokenKind::Name, start, end, self.line);
    }

    fn operator(&mut self) -> Result<(), SyntaxError> {
        let start = self.offset();
        let src = self.src;
        let rest = &src[start..];
        let matched = OPS3
            .iter()
            .chain(OPS2.iter())
            .find(|op| rest.starts_with(**op))
            .map(|op| op.len())
            .or_else(|| {
                rest.chars()
                    .next()
                    .filter(|c| OPS1.contains(*c))
                    .map(char::len_utf8)
            });
        let Some(len) = matched else {
            let c = rest.chars().next().unwrap_or('?');
            return Err(self.error(format!("invalid character '{}'", c)));
        };

        let c = rest.chars().next().unwrap_or(' ');
        if len == 1 {
            match c {
                '(' | '[' | '{' => self.brackets.push((c, self.line)),
                ')' | ']' | '}' => match self.brackets.pop() {
                    Some((open, _)) if closing(open) == c => {}
                    Some((open, _)) => {
                        return Err(self.error(format!(
                            "closing parenthesis '{}' does not match opening parenthesis '{}'",
                            c, open
                        )))
                    }
                    None => return Err(self.error(format!("unmatched '{}'", c))),
                },
                _ => {}
            }
        }

        let chars = rest[..len].chars().count();
        self.pos += chars;
        self.push(TokenKind::Op, start, start + len, self.line);
        Ok(())
    }
}

/// Tokenizes the replacement fields of an f-string body. Fields that fail to
/// tokenize are skipped.
fn format_expressions(src: &str, body_start: usize, body_end: usize, line: usize) -> Vec<Token> {
    let body = &src[body_start..body_end];
    let bytes = body.as_bytes();
    let mut nested = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
            b'{' => {
                let mut depth = 1;
                let mut j = i + 1;
                while j < bytes.len() && depth > 0 {
                    match bytes[j] {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        _ => {}
                    }
                    j += 1;
                }
                let inner_end = if depth == 0 { j - 1 } else { j };
                let inner = &body[i + 1..inner_end];
                let wrapped = format!("({})", inner);
                if let Ok(tokens) = Lexer::new(&wrapped).run() {
                    let base = body_start + i;
                    nested.extend(
                        tokens
                            .into_iter()
                            .filter(|t| !t.is_structural())
                            .map(|mut t| {
                                t.start += base;
                                t.end += base;
                                t.line += line - 1;
                                t
                            }),
                    );
                }
                i = j;
            }
            _ => i += 1,
        }
    }
    nested
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn indentation_produces_markers() {
        use TokenKind::*;
        assert_eq!(
            kinds("def f():\n    return 1\n"),
            vec![Name, Name, Op, Op, Op, Newline, Indent, Name, Number, Newline, Dedent, EndMarker]
        );
    }

    #[test]
    fn brackets_join_lines_and_comments_vanish() {
        let tokens = tokenize("x = (1,\n     2)  # pair\n\n# note\ny = 3\n").unwrap();
        let newlines = tokens.iter().filter(|t| t.kind == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
        assert!(tokens.iter().all(|t| !t.text.contains('#')));
    }

    #[test]
    fn strings_keep_their_prefix_and_quotes() {
        let tokens = tokenize("s = rb'a\\'b' + \"\"\"x\ny\"\"\"\n").unwrap();
        let strings: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::String)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(strings, vec!["rb'a\\'b'", "\"\"\"x\ny\"\"\""]);
    }

    #[test]
    fn f_string_fields_are_tokenized() {
        let tokens = tokenize("f'{__import__(\"os\")} {{literal}}'\n").unwrap();
        let nested = &tokens[0].nested;
        assert!(nested.iter().any(|t| t.is_name("__import__")));
        assert!(!nested.iter().any(|t| t.is_name("literal")));
    }

    #[test]
    fn errors_carry_the_line() {
        let err = tokenize("x = 1\ny = (2,\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(tokenize("s = 'open\n").is_err());
        assert!(tokenize("if x:\n        a\n    b\n").is_err());
        assert!(tokenize("x = $\n").is_err());
    }
}
