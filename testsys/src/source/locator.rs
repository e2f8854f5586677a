use std::fmt;

use serde::{Deserialize, Serialize};

use super::syntax::{NodeKind, SyntaxNode};

/// Identifies the unit a task targets inside submitted source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Locator {
    Function(String),
    Class(String),
}

impl Locator {
    pub fn function(name: impl Into<String>) -> Self {
        Locator::Function(name.into())
    }

    pub fn class(name: impl Into<String>) -> Self {
        Locator::Class(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Locator::Function(name) | Locator::Class(name) => name,
        }
    }

    /// Only plain (non-async) function definitions match a function locator.
    pub fn matches(&self, node: &SyntaxNode) -> bool {
        let kind = match self {
            Locator::Function(_) => NodeKind::FunctionDef,
            Locator::Class(_) => NodeKind::ClassDef,
        };
        node.kind == kind && node.name() == Some(self.name())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Function(name) => write!(f, "{name}()"),
            Locator::Class(name) => write!(f, "class {name}"),
        }
    }
}
