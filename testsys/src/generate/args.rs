use std::fmt;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::gen::Gen;

/// Positional and keyword arguments of one test call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Arguments {
    pub fn positional<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            kwargs: Map::new(),
        }
    }

    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.args.iter().map(Value::to_string).collect();
        parts.extend(self.kwargs.iter().map(|(k, v)| format!("{k}={v}")));
        write!(f, "({})", parts.join(", "))
    }
}

/// One argument position: passed through as is, or drawn per test.
#[derive(Debug, Clone)]
pub enum Slot {
    Literal(Value),
    Generated(Gen<Value>),
}

impl Slot {
    fn evaluate(&self, rng: &mut StdRng) -> Value {
        match self {
            Slot::Literal(value) => value.clone(),
            Slot::Generated(gen) => gen.sample(rng),
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Literal(value)
    }
}

impl<T: Into<Value> + 'static> From<Gen<T>> for Slot {
    fn from(gen: Gen<T>) -> Self {
        Slot::Generated(gen.value())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArgList {
    positional: Vec<Slot>,
    keyword: Vec<(String, Slot)>,
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, slot: impl Into<Slot>) -> Self {
        self.positional.push(slot.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, slot: impl Into<Slot>) -> Self {
        self.keyword.push((name.into(), slot.into()));
        self
    }

    /// Evaluates slots left to right, positional before keyword.
    pub fn generate(&self, rng: &mut StdRng) -> Arguments {
        let args = self.positional.iter().map(|s| s.evaluate(rng)).collect();
        let kwargs = self
            .keyword
            .iter()
            .map(|(name, s)| (name.clone(), s.evaluate(rng)))
            .collect();
        Arguments { args, kwargs }
    }
}

/// A test as declared on a task.
#[derive(Debug, Clone)]
pub enum TestCase {
    Literal(Arguments),
    Generated(Gen<Arguments>),
}

impl TestCase {
    pub fn generate(&self, rng: &mut StdRng) -> Arguments {
        match self {
            TestCase::Literal(args) => args.clone(),
            TestCase::Generated(gen) => gen.sample(rng),
        }
    }
}

impl From<Arguments> for TestCase {
    fn from(args: Arguments) -> Self {
        TestCase::Literal(args)
    }
}

impl From<ArgList> for TestCase {
    fn from(list: ArgList) -> Self {
        TestCase::Generated(Gen::new(move |rng| list.generate(rng)))
    }
}

impl From<Gen<Arguments>> for TestCase {
    fn from(gen: Gen<Arguments>) -> Self {
        TestCase::Generated(gen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{random_integer, repeat_test, seeded};
    use serde_json::json;

    #[test]
    fn arg_list_mixes_literals_and_generators() {
        let list = ArgList::new()
            .arg(json!([3, 0, 2]))
            .arg(random_integer(5, 5))
            .kwarg("scale", json!(2.5));
        let args = list.generate(&mut seeded(0));
        assert_eq!(args.args, vec![json!([3, 0, 2]), json!(5)]);
        assert_eq!(args.kwargs.get("scale"), Some(&json!(2.5)));
        assert_eq!(args.to_string(), "([3,0,2], 5, scale=2.5)");
    }

    #[test]
    fn repeated_generated_cases_draw_fresh_values() {
        let cases = repeat_test(ArgList::new().arg(random_integer(0, 1_000_000)), 5);
        let mut rng = seeded(9);
        let drawn: Vec<_> = cases.iter().map(|c| c.generate(&mut rng)).collect();
        assert_eq!(drawn.len(), 5);
        assert!(drawn.windows(2).any(|w| w[0] != w[1]));
    }
}
