use sha2::{Digest, Sha256};

use super::lexer::{tokenize, TokenKind};
use super::syntax::{parse_module, NodeKind, SyntaxNode};
use super::SyntaxError;

/// A located piece of source together with its parsed tree. The tree's
/// spans index into `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeUnit {
    pub source: String,
    pub node: SyntaxNode,
}

impl CodeUnit {
    /// Parses a whole module, e.g. trusted helper code.
    pub fn module(source: impl Into<String>) -> Result<Self, SyntaxError> {
        let source = source.into();
        let node = parse_module(&source)?;
        Ok(Self { source, node })
    }

    /// Parses `source` and keeps the first function definition found in
    /// breadth-first order.
    pub fn parse_function(source: &str) -> Result<Self, SyntaxError> {
        let module = parse_module(source)?;
        match module.find_first(NodeKind::FunctionDef) {
            Some(def) => Self::extract(source, def),
            None => Err(SyntaxError::new("no function definition found", 1)),
        }
    }

    /// Cuts `node` out of `source`, dedented to column zero, and reparses it
    /// so that spans refer to the extracted text.
    pub fn extract(source: &str, node: &SyntaxNode) -> Result<Self, SyntaxError> {
        let line_start = source[..node.start].rfind('\n').map_or(0, |i| i + 1);
        let column = node.start - line_start;
        let segment = dedent(&source[node.start..node.end], column);

        let module = parse_module(&segment)?;
        let reparsed = module
            .children
            .into_iter()
            .find(|child| child.kind == node.kind && child.name == node.name)
            .ok_or_else(|| SyntaxError::new("located unit does not parse alone", node.line))?;
        Ok(Self {
            source: segment,
            node: reparsed,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.node.name()
    }

    /// Hex SHA-256 over the token stream, so edits to comments or layout
    /// inside brackets keep the same fingerprint. Redundant parentheses are
    /// tokens too: `(a + b)` and `a + b` fingerprint differently.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        if let Ok(tokens) = tokenize(&self.source) {
            for token in tokens {
                let text = match token.kind {
                    TokenKind::Newline => "\n",
                    TokenKind::Indent => "\t>",
                    TokenKind::Dedent => "\t<",
                    TokenKind::EndMarker => "",
                    _ => token.text.as_str(),
                };
                hasher.update(text.as_bytes());
                hasher.update([0u8]);
            }
        } else {
            hasher.update(self.source.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Strips up to `column` leading whitespace characters from every line after
/// the first; the first line already starts at the unit.
fn dedent(segment: &str, column: usize) -> String {
    let mut out = String::with_capacity(segment.len());
    for (i, line) in segment.split_inclusive('\n').enumerate() {
        if i == 0 || column == 0 {
            out.push_str(line);
            continue;
        }
        let strip = line
            .char_indices()
            .take(column)
            .take_while(|(_, c)| *c == ' ' || *c == '\t')
            .last()
            .map_or(0, |(idx, c)| idx + c.len_utf8());
        out.push_str(&line[strip..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_function_in_breadth_first_order_wins() {
        let source = "class A:\n    def inner(self):\n        pass\n\ndef outer(x):\n    return x\n";
        let unit = CodeUnit::parse_function(source).unwrap();
        assert_eq!(unit.name(), Some("outer"));
        assert_eq!(unit.source, "def outer(x):\n    return x");
    }

    #[test]
    fn methods_are_dedented_when_extracted() {
        let source = "class A:\n    def m(self):\n        return 1\n";
        let module = parse_module(source).unwrap();
        let def = module.find_first(NodeKind::FunctionDef).unwrap();
        let unit = CodeUnit::extract(source, def).unwrap();
        assert_eq!(unit.source, "def m(self):\n    return 1");
        assert_eq!(&unit.source[unit.node.span()], unit.source);
    }

    #[test]
    fn fingerprint_ignores_comments_but_not_code() {
        let a = CodeUnit::parse_function("def f(a, b):\n    return a + b\n").unwrap();
        let b = CodeUnit::parse_function("def f(a,\n      b):  # sum\n    return a+b\n").unwrap();
        let c = CodeUnit::parse_function("def f(a, b):\n    return a - b\n").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let bracketed = CodeUnit::parse_function("def f(a, b):\n    return (a + b)\n").unwrap();
        assert_ne!(a.fingerprint(), bracketed.fingerprint());
    }

    #[test]
    fn source_without_functions_is_rejected() {
        assert!(CodeUnit::parse_function("x = 1\n").is_err());
    }
}
