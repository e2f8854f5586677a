//! Static checks over a located unit before anything is dispatched.

use std::ops::BitAnd;

use crate::source::{CodeUnit, NodeKind};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Validator {
    #[default]
    Accept,
    /// Forbids a construct anywhere inside the unit; the unit's own root node
    /// is skipped when `ignore_root` is set.
    NoNodeType { kind: NodeKind, ignore_root: bool },
    NoFunctionCall(String),
    NoNameReference(String),
    Recursion { required: bool },
    /// Runs in order and stops at the first failure.
    All(Vec<Validator>),
}

impl Validator {
    pub fn no_node_type(kind: NodeKind) -> Self {
        Validator::NoNodeType {
            kind,
            ignore_root: true,
        }
    }

    pub fn no_function_call(name: impl Into<String>) -> Self {
        Validator::NoFunctionCall(name.into())
    }

    pub fn no_name_reference(name: impl Into<String>) -> Self {
        Validator::NoNameReference(name.into())
    }

    /// `None` when the unit is accepted, otherwise the violated rule.
    pub fn validate(&self, unit: &CodeUnit) -> Option<String> {
        let root = &unit.node;
        match self {
            Validator::Accept => None,
            Validator::NoNodeType { kind, ignore_root } => root
                .walk()
                .skip(usize::from(*ignore_root))
                .any(|node| node.kind == *kind)
                .then(|| format!("no {} statements allowed", kind.class_name())),
            Validator::NoFunctionCall(name) => root
                .walk()
                .any(|node| node.kind == NodeKind::Call && node.name() == Some(name.as_str()))
                .then(|| format!("no calls to {name}() allowed")),
            Validator::NoNameReference(name) => root
                .walk()
                .any(|node| node.kind == NodeKind::Name && node.name() == Some(name.as_str()))
                .then(|| format!("no name nodes with name '{name}' allowed")),
            Validator::Recursion { required } => {
                let own = root.name();
                let recursive = own.is_some()
                    && root
                        .walk()
                        .any(|node| node.kind == NodeKind::Call && node.name() == own);
                match (required, recursive) {
                    (true, false) => Some("recursion is required".to_string()),
                    (false, true) => Some("recursion is forbidden".to_string()),
                    _ => None,
                }
            }
            Validator::All(validators) => validators.iter().find_map(|v| v.validate(unit)),
        }
    }
}

impl BitAnd for Validator {
    type Output = Validator;

    fn bitand(self, rhs: Validator) -> Validator {
        match (self, rhs) {
            (Validator::Accept, other) | (other, Validator::Accept) => other,
            (Validator::All(mut left), Validator::All(right)) => {
                left.extend(right);
                Validator::All(left)
            }
            (Validator::All(mut left), right) => {
                left.push(right);
                Validator::All(left)
            }
            (left, Validator::All(mut right)) => {
                right.insert(0, left);
                Validator::All(right)
            }
            (left, right) => Validator::All(vec![left, right]),
        }
    }
}

pub fn no_imports() -> Validator {
    Validator::no_node_type(NodeKind::Import)
        & Validator::no_node_type(NodeKind::ImportFrom)
        & Validator::no_name_reference("__import__")
}

pub fn no_local_functions() -> Validator {
    Validator::no_node_type(NodeKind::FunctionDef)
}

pub fn no_exec() -> Validator {
    Validator::no_function_call("exec") & Validator::no_name_reference("exec")
}

pub fn no_eval() -> Validator {
    Validator::no_function_call("eval") & Validator::no_name_reference("eval")
}

pub fn no_recursion() -> Validator {
    Validator::Recursion { required: false }
}

pub fn require_recursion() -> Validator {
    Validator::Recursion { required: true }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(source: &str) -> CodeUnit {
        CodeUnit::parse_function(source).unwrap()
    }

    #[test]
    fn imports_are_rejected_in_every_form() {
        let rule = no_imports();
        assert_eq!(
            rule.validate(&unit("def f():\n    import os\n")).as_deref(),
            Some("no Import statements allowed")
        );
        assert_eq!(
            rule.validate(&unit("def f():\n    from os import path\n")).as_deref(),
            Some("no ImportFrom statements allowed")
        );
        assert_eq!(
            rule.validate(&unit("def f():\n    return __import__('os')\n")).as_deref(),
            Some("no name nodes with name '__import__' allowed")
        );
        assert_eq!(rule.validate(&unit("def f(x):\n    return x\n")), None);
    }

    #[test]
    fn the_root_definition_is_not_a_local_function() {
        let rule = no_local_functions();
        assert_eq!(rule.validate(&unit("def f(x):\n    return x\n")), None);
        assert_eq!(
            rule.validate(&unit("def f(x):\n    def g():\n        pass\n    return g\n"))
                .as_deref(),
            Some("no FunctionDef statements allowed")
        );
    }

    #[test]
    fn recursion_is_a_self_call() {
        let fact = unit("def fact(n):\n    return 1 if n < 2 else n * fact(n - 1)\n");
        let loop_fact = unit("def fact(n):\n    r = 1\n    for i in range(n):\n        r *= i + 1\n    return r\n");

        assert_eq!(require_recursion().validate(&fact), None);
        assert_eq!(
            require_recursion().validate(&loop_fact).as_deref(),
            Some("recursion is required")
        );
        assert_eq!(
            no_recursion().validate(&fact).as_deref(),
            Some("recursion is forbidden")
        );
    }

    #[test]
    fn bracketed_self_call_is_recursion() {
        let fact = unit("def f(x):\n    return (f)(x - 1)\n");
        assert_eq!(require_recursion().validate(&fact), None);
        assert_eq!(
            no_recursion().validate(&fact).as_deref(),
            Some("recursion is forbidden")
        );
        assert_eq!(
            no_eval().validate(&unit("def f(s):\n    return (eval)(s)\n")).as_deref(),
            Some("no calls to eval() allowed")
        );
    }

    #[test]
    fn conjunction_stops_at_the_first_failure() {
        let rule = no_imports() & no_recursion();
        let source = unit("def f(n):\n    import math\n    return f(n - 1)\n");
        assert_eq!(rule.validate(&source).as_deref(), Some("no Import statements allowed"));

        let rule = no_exec() & no_eval();
        assert_eq!(
            rule.validate(&unit("def f(s):\n    return eval(s)\n")).as_deref(),
            Some("no calls to eval() allowed")
        );
        assert_eq!(
            rule.validate(&unit("def f(s):\n    g = exec\n    return g(s)\n")).as_deref(),
            Some("no name nodes with name 'exec' allowed")
        );
    }
}
