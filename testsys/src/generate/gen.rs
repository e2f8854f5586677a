use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use serde_json::Value;

type GenFn<T> = dyn Fn(&mut StdRng) -> T + Send + Sync;

pub struct Gen<T>(Arc<GenFn<T>>);

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Gen(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Gen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen<{}>", std::any::type_name::<T>())
    }
}

impl<T: 'static> Gen<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut StdRng) -> T + Send + Sync + 'static,
    {
        Gen(Arc::new(f))
    }

    /// Always yields a clone of `value` without touching the random source.
    pub fn constant(value: T) -> Self
    where
        T: Clone + Send + Sync,
    {
        Gen::new(move |_| value.clone())
    }

    pub fn sample(&self, rng: &mut StdRng) -> T {
        (self.0)(rng)
    }

    /// `n` independent draws.
    pub fn repeat(self, n: usize) -> Gen<Vec<T>> {
        Gen::new(move |rng| (0..n).map(|_| self.sample(rng)).collect())
    }

    pub fn map<U, F>(self, f: F) -> Gen<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Gen::new(move |rng| f(self.sample(rng)))
    }

    /// Feeds each draw into `f` and samples the generator it returns from the
    /// same random source.
    pub fn and_then<U, F>(self, f: F) -> Gen<U>
    where
        U: 'static,
        F: Fn(T) -> Gen<U> + Send + Sync + 'static,
    {
        Gen::new(move |rng| {
            let next = f(self.sample(rng));
            next.sample(rng)
        })
    }

    /// Redraws until `accept` holds. Loops forever on an unsatisfiable
    /// predicate.
    pub fn retry_until<P>(self, accept: P) -> Gen<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Gen::new(move |rng| loop {
            let value = self.sample(rng);
            if accept(&value) {
                return value;
            }
        })
    }
}

impl<T: Into<Value> + 'static> Gen<T> {
    /// Erases the produced type into the JSON value domain.
    pub fn value(self) -> Gen<Value> {
        self.map(Into::into)
    }
}
