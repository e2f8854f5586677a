use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

use super::args::TestCase;
use super::gen::Gen;

/// Uniform integer in `low..=high`.
pub fn random_integer(low: i64, high: i64) -> Gen<i64> {
    Gen::new(move |rng| rng.gen_range(low..=high))
}

/// Uniform float in `low..=high`.
pub fn random_float(low: f64, high: f64) -> Gen<f64> {
    Gen::new(move |rng| rng.gen_range(low..=high))
}

/// `len` characters, each uniform over the code points `low..=high`.
pub fn random_string(len: usize, low: char, high: char) -> Gen<String> {
    let (low, high) = (low as u32, high as u32);
    Gen::new(move |rng| {
        (0..len)
            .map(|_| {
                let code = rng.gen_range(low..=high);
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect()
    })
}

/// A shuffled `0..len`.
pub fn random_permutation(len: usize) -> Gen<Vec<usize>> {
    Gen::new(move |rng| {
        let mut iota: Vec<usize> = (0..len).collect();
        iota.shuffle(rng);
        iota
    })
}

/// True unless `value` is a sequence holding equal elements twice.
pub fn distinct(value: &Value) -> bool {
    match value {
        Value::Array(items) => {
            let seen: HashSet<String> = items.iter().map(Value::to_string).collect();
            seen.len() == items.len()
        }
        Value::String(text) => {
            let seen: HashSet<char> = text.chars().collect();
            seen.len() == text.chars().count()
        }
        _ => true,
    }
}

/// `n` copies of the same case; generated cases draw fresh values each time.
pub fn repeat_test(case: impl Into<TestCase>, n: usize) -> Vec<TestCase> {
    let case = case.into();
    vec![case; n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::seeded;
    use serde_json::json;

    #[test]
    fn ranges_are_inclusive() {
        let mut rng = seeded(11);
        let values: HashSet<i64> = (0..200)
            .map(|_| random_integer(1, 3).sample(&mut rng))
            .collect();
        assert_eq!(values, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn strings_stay_in_the_alphabet() {
        let word = random_string(12, 'a', 'c').sample(&mut seeded(5));
        assert_eq!(word.chars().count(), 12);
        assert!(word.chars().all(|c| ('a'..='c').contains(&c)));
    }

    #[test]
    fn permutation_holds_every_index_once() {
        let mut perm = random_permutation(20).sample(&mut seeded(2));
        perm.sort_unstable();
        assert_eq!(perm, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn distinct_checks_sequences_only() {
        assert!(distinct(&json!([1, 2, 3])));
        assert!(!distinct(&json!([1, 2, 1])));
        assert!(!distinct(&json!("aa")));
        assert!(distinct(&json!(5)));
    }
}
