use std::any::Any;
use std::collections::HashMap;

use crate::artefact::{Artefact, ArtefactCollection, ArtefactKey};
use crate::error::ArtefactError;

pub type AnyValue = dyn Any + Send + Sync;

/// Object-safe storage interface shared by the root store and indexed views.
///
/// Steps use the typed helpers from [`StoreExt`]; the raw methods here exist so
/// that `&mut dyn ArtefactStore` can be passed between steps.
pub trait ArtefactStore: Send {
    /// Declared key for a single artefact or collection name.
    fn declared(&self, name: &str) -> Option<ArtefactKey>;

    fn get_raw(&self, key: &ArtefactKey) -> Result<&AnyValue, ArtefactError>;

    fn get_raw_mut(&mut self, key: &ArtefactKey) -> Result<&mut AnyValue, ArtefactError>;

    fn set_raw(&mut self, key: &ArtefactKey, value: Box<AnyValue>) -> Result<(), ArtefactError>;

    fn collection_len(&self, collection: &ArtefactKey) -> Result<usize, ArtefactError>;

    fn get_item_raw(&self, collection: &ArtefactKey, index: usize)
        -> Result<&AnyValue, ArtefactError>;

    fn get_item_raw_mut(
        &mut self,
        collection: &ArtefactKey,
        index: usize,
    ) -> Result<&mut AnyValue, ArtefactError>;

    fn set_item_raw(
        &mut self,
        collection: &ArtefactKey,
        index: usize,
        value: Box<AnyValue>,
    ) -> Result<(), ArtefactError>;

    fn set_collection_raw(
        &mut self,
        collection: &ArtefactKey,
        values: Vec<Box<AnyValue>>,
    ) -> Result<(), ArtefactError>;
}

fn wrong_type(key: &ArtefactKey, actual: &str) -> ArtefactError {
    ArtefactError::WrongArtefactType {
        key: key.name.clone(),
        expected: key.type_name.to_string(),
        actual: actual.to_string(),
    }
}

/// Typed access on top of any [`ArtefactStore`], including trait objects.
pub trait StoreExt: ArtefactStore {
    fn get<T: Any + Send + Sync>(&self, artefact: &Artefact<T>) -> Result<&T, ArtefactError> {
        let key = artefact.key();
        self.get_raw(key)?
            .downcast_ref::<T>()
            .ok_or_else(|| wrong_type(key, "<stored value>"))
    }

    fn get_mut<T: Any + Send + Sync>(
        &mut self,
        artefact: &Artefact<T>,
    ) -> Result<&mut T, ArtefactError> {
        let key = artefact.key().clone();
        self.get_raw_mut(&key)?
            .downcast_mut::<T>()
            .ok_or_else(|| wrong_type(&key, "<stored value>"))
    }

    fn set<T: Any + Send + Sync>(
        &mut self,
        artefact: &Artefact<T>,
        value: T,
    ) -> Result<(), ArtefactError> {
        self.set_raw(artefact.key(), Box::new(value))
    }

    fn len<T: Any + Send + Sync>(
        &self,
        collection: &ArtefactCollection<T>,
    ) -> Result<usize, ArtefactError> {
        self.collection_len(collection.key())
    }

    fn collection<T: Any + Send + Sync>(
        &self,
        collection: &ArtefactCollection<T>,
    ) -> Result<Vec<&T>, ArtefactError> {
        let key = collection.key();
        let len = self.collection_len(key)?;
        (0..len)
            .map(|index| {
                self.get_item_raw(key, index)?
                    .downcast_ref::<T>()
                    .ok_or_else(|| wrong_type(key, "<stored value>"))
            })
            .collect()
    }

    fn set_collection<T: Any + Send + Sync>(
        &mut self,
        collection: &ArtefactCollection<T>,
        values: Vec<T>,
    ) -> Result<(), ArtefactError> {
        let boxed = values
            .into_iter()
            .map(|v| Box::new(v) as Box<AnyValue>)
            .collect();
        self.set_collection_raw(collection.key(), boxed)
    }
}

impl<S: ArtefactStore + ?Sized> StoreExt for S {}

enum Slot {
    Single(Box<AnyValue>),
    Collection(Vec<Option<Box<AnyValue>>>),
}

/// Live store for one pipeline run.
///
/// Only declared keys may be written; declaring a collection implicitly
/// declares its items. Item keys are not reachable here directly, only
/// through an [`IndexedView`](crate::IndexedView).
#[derive(Default)]
pub struct Artefactory {
    declared: HashMap<String, ArtefactKey>,
    values: HashMap<String, Slot>,
}

impl Artefactory {
    pub fn new<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = ArtefactKey>,
    {
        let mut store = Artefactory::default();
        for key in keys {
            store.declare(key);
        }
        store
    }

    /// Declares a key. Item keys declare their parent collection.
    pub fn declare(&mut self, key: ArtefactKey) {
        let key = key.storage_key();
        self.declared.entry(key.name.clone()).or_insert(key);
    }

    pub fn is_declared(&self, key: &ArtefactKey) -> bool {
        self.declared.get(&key.storage_key().name) == Some(&key.storage_key())
    }

    pub fn contains(&self, key: &ArtefactKey) -> bool {
        self.values.contains_key(&key.name)
    }

    /// Resolves `key` against the declarations, reporting undeclared names and
    /// type mismatches.
    fn check(&self, key: &ArtefactKey) -> Result<&ArtefactKey, ArtefactError> {
        let declared = self
            .declared
            .get(&key.name)
            .ok_or_else(|| ArtefactError::UnsupportedArtefact(key.to_string()))?;
        if declared.type_id != key.type_id {
            return Err(wrong_type(declared, key.type_name));
        }
        if declared.is_collection() != key.is_collection() {
            return Err(ArtefactError::UnsupportedArtefact(key.to_string()));
        }
        Ok(declared)
    }

    fn check_value(key: &ArtefactKey, value: &AnyValue) -> Result<(), ArtefactError> {
        if value.type_id() != key.type_id {
            return Err(wrong_type(key, "<foreign type>"));
        }
        Ok(())
    }

    fn item_only(key: &ArtefactKey) -> ArtefactError {
        ArtefactError::missing(key, "item artefacts are only reachable through an indexed view")
    }

    fn items(&self, collection: &ArtefactKey) -> Result<&Vec<Option<Box<AnyValue>>>, ArtefactError> {
        self.check(collection)?;
        match self.values.get(&collection.name) {
            Some(Slot::Collection(items)) => Ok(items),
            _ => Err(ArtefactError::missing(collection, "no such artefact")),
        }
    }

    fn items_mut(
        &mut self,
        collection: &ArtefactKey,
    ) -> Result<&mut Vec<Option<Box<AnyValue>>>, ArtefactError> {
        self.check(collection)?;
        let slot = self
            .values
            .entry(collection.name.clone())
            .or_insert_with(|| Slot::Collection(Vec::new()));
        match slot {
            Slot::Collection(items) => Ok(items),
            Slot::Single(_) => Err(ArtefactError::UnsupportedArtefact(collection.to_string())),
        }
    }
}

impl ArtefactStore for Artefactory {
    fn declared(&self, name: &str) -> Option<ArtefactKey> {
        self.declared.get(name).cloned()
    }

    fn get_raw(&self, key: &ArtefactKey) -> Result<&AnyValue, ArtefactError> {
        if key.is_item() {
            return Err(Self::item_only(key));
        }
        match self.values.get(&key.name) {
            Some(Slot::Single(value)) => {
                self.check(key)?;
                Ok(&**value)
            }
            _ => Err(ArtefactError::missing(key, "no such artefact")),
        }
    }

    fn get_raw_mut(&mut self, key: &ArtefactKey) -> Result<&mut AnyValue, ArtefactError> {
        if key.is_item() {
            return Err(Self::item_only(key));
        }
        self.check(key)?;
        match self.values.get_mut(&key.name) {
            Some(Slot::Single(value)) => Ok(&mut **value),
            _ => Err(ArtefactError::missing(key, "no such artefact")),
        }
    }

    fn set_raw(&mut self, key: &ArtefactKey, value: Box<AnyValue>) -> Result<(), ArtefactError> {
        if key.is_item() {
            return Err(Self::item_only(key));
        }
        self.check(key)?;
        Self::check_value(key, &*value)?;
        self.values.insert(key.name.clone(), Slot::Single(value));
        Ok(())
    }

    fn collection_len(&self, collection: &ArtefactKey) -> Result<usize, ArtefactError> {
        self.items(collection).map(Vec::len)
    }

    fn get_item_raw(
        &self,
        collection: &ArtefactKey,
        index: usize,
    ) -> Result<&AnyValue, ArtefactError> {
        self.items(collection)?
            .get(index)
            .and_then(|slot| slot.as_deref())
            .ok_or_else(|| {
                ArtefactError::missing(collection, format!("no index {} for this artefact", index))
            })
    }

    fn get_item_raw_mut(
        &mut self,
        collection: &ArtefactKey,
        index: usize,
    ) -> Result<&mut AnyValue, ArtefactError> {
        self.check(collection)?;
        let item = match self.values.get_mut(&collection.name) {
            Some(Slot::Collection(items)) => items.get_mut(index),
            _ => None,
        };
        match item {
            Some(Some(value)) => Ok(&mut **value),
            _ => Err(ArtefactError::missing(
                collection,
                format!("no index {} for this artefact", index),
            )),
        }
    }

    fn set_item_raw(
        &mut self,
        collection: &ArtefactKey,
        index: usize,
        value: Box<AnyValue>,
    ) -> Result<(), ArtefactError> {
        Self::check_value(collection, &*value)?;
        let items = self.items_mut(collection)?;
        if items.len() <= index {
            items.resize_with(index + 1, || None);
        }
        items[index] = Some(value);
        Ok(())
    }

    fn set_collection_raw(
        &mut self,
        collection: &ArtefactKey,
        values: Vec<Box<AnyValue>>,
    ) -> Result<(), ArtefactError> {
        self.check(collection)?;
        for value in &values {
            Self::check_value(collection, &**value)?;
        }
        self.values.insert(
            collection.name.clone(),
            Slot::Collection(values.into_iter().map(Some).collect()),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Artefactory, Artefact<String>, ArtefactCollection<i64>) {
        let code = Artefact::<String>::new("code");
        let tests = ArtefactCollection::<i64>::grouped("tests", "test");
        let store = Artefactory::new([code.key().clone(), tests.key().clone()]);
        (store, code, tests)
    }

    #[test]
    fn get_missing_artefact_fails() {
        let (store, code, _) = store();
        let err = store.get(&code).unwrap_err();
        assert!(matches!(err, ArtefactError::MissingArtefact { .. }));
    }

    #[test]
    fn set_undeclared_artefact_fails() {
        let (mut store, _, _) = store();
        let stray = Artefact::<String>::new("stray");
        let err = store.set(&stray, "x".into()).unwrap_err();
        assert!(matches!(err, ArtefactError::UnsupportedArtefact(_)));
    }

    #[test]
    fn set_with_wrong_type_fails() {
        let (mut store, _, _) = store();
        let impostor = Artefact::<i64>::new("code");
        let err = store.set(&impostor, 5).unwrap_err();
        assert!(matches!(err, ArtefactError::WrongArtefactType { .. }));
    }

    #[test]
    fn raw_value_of_foreign_type_is_rejected() {
        let (mut store, code, _) = store();
        let err = store.set_raw(code.key(), Box::new(3_u8)).unwrap_err();
        assert!(matches!(err, ArtefactError::WrongArtefactType { .. }));
    }

    #[test]
    fn values_and_collections_round_trip() {
        let (mut store, code, tests) = store();
        store.set(&code, "def f(): pass".into()).unwrap();
        store.set_collection(&tests, vec![1, 2, 3]).unwrap();

        assert_eq!(store.get(&code).unwrap(), "def f(): pass");
        assert_eq!(store.collection(&tests).unwrap(), vec![&1, &2, &3]);
        store.get_mut(&code).unwrap().push('!');
        assert!(store.get(&code).unwrap().ends_with('!'));
    }

    #[test]
    fn items_are_not_reachable_from_the_root() {
        let (mut store, _, tests) = store();
        store.set_collection(&tests, vec![1]).unwrap();
        assert!(store.get(&tests.item()).is_err());
    }
}
