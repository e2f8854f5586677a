use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// Suffix appended to a collection's name to address one of its items.
pub const ITEM_SUFFIX: &str = "__item";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Single,
    /// Ordered list of values. Collections sharing a group are indexed together.
    Collection { group: Option<String> },
    /// One element of a collection, resolved by an indexed view.
    Item { group: Option<String> },
}

/// Untyped identity of an artefact: what steps declare as needs and produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtefactKey {
    pub name: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub shape: Shape,
}

impl ArtefactKey {
    fn of<T: Any>(name: String, shape: Shape) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            shape,
        }
    }

    pub fn is_item(&self) -> bool {
        matches!(self.shape, Shape::Item { .. })
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.shape, Shape::Collection { .. })
    }

    pub fn group(&self) -> Option<&str> {
        match &self.shape {
            Shape::Single => None,
            Shape::Collection { group } | Shape::Item { group } => group.as_deref(),
        }
    }

    /// Key of the collection an item belongs to, `None` for non-items.
    pub fn parent_collection(&self) -> Option<ArtefactKey> {
        match &self.shape {
            Shape::Item { group } => Some(ArtefactKey {
                name: self.name.strip_suffix(ITEM_SUFFIX)?.to_string(),
                type_id: self.type_id,
                type_name: self.type_name,
                shape: Shape::Collection {
                    group: group.clone(),
                },
            }),
            _ => None,
        }
    }

    /// Key of a collection's items, `None` for non-collections.
    pub fn item_key(&self) -> Option<ArtefactKey> {
        match &self.shape {
            Shape::Collection { group } => Some(ArtefactKey {
                name: format!("{}{}", self.name, ITEM_SUFFIX),
                type_id: self.type_id,
                type_name: self.type_name,
                shape: Shape::Item {
                    group: group.clone(),
                },
            }),
            _ => None,
        }
    }

    /// The key under which a value for `self` is stored in the root store.
    pub fn storage_key(&self) -> ArtefactKey {
        self.parent_collection().unwrap_or_else(|| self.clone())
    }
}

impl fmt::Display for ArtefactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, self.type_name)
    }
}

/// Typed handle to a single artefact (or to one item of a collection).
pub struct Artefact<T> {
    key: ArtefactKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Artefact<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: ArtefactKey::of::<T>(name.into(), Shape::Single),
            _marker: PhantomData,
        }
    }
}

impl<T> Artefact<T> {
    pub fn key(&self) -> &ArtefactKey {
        &self.key
    }
}

impl<T> Clone for Artefact<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Artefact<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Artefact").field(&self.key).finish()
    }
}

/// Typed handle to an ordered collection of `T`.
pub struct ArtefactCollection<T> {
    key: ArtefactKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ArtefactCollection<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_group(name, None::<String>)
    }

    pub fn grouped(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self::with_group(name, Some(group))
    }

    fn with_group(name: impl Into<String>, group: Option<impl Into<String>>) -> Self {
        Self {
            key: ArtefactKey::of::<T>(
                name.into(),
                Shape::Collection {
                    group: group.map(Into::into),
                },
            ),
            _marker: PhantomData,
        }
    }

    /// Handle addressing the current item when accessed through an indexed view.
    pub fn item(&self) -> Artefact<T> {
        let name = format!("{}{}", self.key.name, ITEM_SUFFIX);
        Artefact {
            key: ArtefactKey::of::<T>(
                name,
                Shape::Item {
                    group: self.key.group().map(str::to_string),
                },
            ),
            _marker: PhantomData,
        }
    }
}

impl<T> ArtefactCollection<T> {
    pub fn key(&self) -> &ArtefactKey {
        &self.key
    }
}

impl<T> Clone for ArtefactCollection<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ArtefactCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArtefactCollection").field(&self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_round_trips_to_collection() {
        let tests = ArtefactCollection::<i64>::grouped("tests", "test");
        let item = tests.item();
        assert!(item.key().is_item());
        assert_eq!(item.key().name, "tests__item");
        assert_eq!(item.key().parent_collection().as_ref(), Some(tests.key()));
        assert_eq!(tests.key().item_key().as_ref(), Some(item.key()));
    }

    #[test]
    fn same_name_different_type_are_distinct_keys() {
        let a = Artefact::<i64>::new("x");
        let b = Artefact::<String>::new("x");
        assert_ne!(a.key(), b.key());
    }
}
