use crate::artefact::ArtefactKey;
use crate::error::ArtefactError;
use crate::store::{AnyValue, ArtefactStore};

/// A view that pins one index of every collection in `group`.
///
/// Item keys of those collections resolve to element `index` of the parent
/// collection; every other key is delegated to the parent unchanged. Views
/// nest, so a fan-out over group `a` inside a fan-out over group `b` resolves
/// items of both.
pub struct IndexedView<'a> {
    parent: &'a mut dyn ArtefactStore,
    group: Option<String>,
    index: usize,
}

impl<'a> IndexedView<'a> {
    pub fn new(parent: &'a mut dyn ArtefactStore, group: Option<String>, index: usize) -> Self {
        Self {
            parent,
            group,
            index,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The collection `key` indexes into, if it is an item of this view's group.
    fn pinned(&self, key: &ArtefactKey) -> Option<ArtefactKey> {
        let collection = key.parent_collection()?;
        let declared = self.parent.declared(&collection.name)?;
        (declared.is_collection() && declared.group() == self.group.as_deref())
            .then_some(collection)
    }
}

impl ArtefactStore for IndexedView<'_> {
    fn declared(&self, name: &str) -> Option<ArtefactKey> {
        self.parent.declared(name)
    }

    fn get_raw(&self, key: &ArtefactKey) -> Result<&AnyValue, ArtefactError> {
        match self.pinned(key) {
            Some(collection) => self.parent.get_item_raw(&collection, self.index),
            None => self.parent.get_raw(key),
        }
    }

    fn get_raw_mut(&mut self, key: &ArtefactKey) -> Result<&mut AnyValue, ArtefactError> {
        match self.pinned(key) {
            Some(collection) => self.parent.get_item_raw_mut(&collection, self.index),
            None => self.parent.get_raw_mut(key),
        }
    }

    fn set_raw(&mut self, key: &ArtefactKey, value: Box<AnyValue>) -> Result<(), ArtefactError> {
        match self.pinned(key) {
            Some(collection) => self.parent.set_item_raw(&collection, self.index, value),
            None => self.parent.set_raw(key, value),
        }
    }

    fn collection_len(&self, collection: &ArtefactKey) -> Result<usize, ArtefactError> {
        self.parent.collection_len(collection)
    }

    fn get_item_raw(
        &self,
        collection: &ArtefactKey,
        index: usize,
    ) -> Result<&AnyValue, ArtefactError> {
        self.parent.get_item_raw(collection, index)
    }

    fn get_item_raw_mut(
        &mut self,
        collection: &ArtefactKey,
        index: usize,
    ) -> Result<&mut AnyValue, ArtefactError> {
        self.parent.get_item_raw_mut(collection, index)
    }

    fn set_item_raw(
        &mut self,
        collection: &ArtefactKey,
        index: usize,
        value: Box<AnyValue>,
    ) -> Result<(), ArtefactError> {
        self.parent.set_item_raw(collection, index, value)
    }

    fn set_collection_raw(
        &mut self,
        collection: &ArtefactKey,
        values: Vec<Box<AnyValue>>,
    ) -> Result<(), ArtefactError> {
        self.parent.set_collection_raw(collection, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::{Artefact, ArtefactCollection};
    use crate::store::{Artefactory, StoreExt};

    #[test]
    fn items_resolve_to_the_pinned_index() {
        let tests = ArtefactCollection::<i64>::grouped("tests", "test");
        let answers = ArtefactCollection::<i64>::grouped("answers", "test");
        let code = Artefact::<String>::new("code");
        let mut root = Artefactory::new([
            tests.key().clone(),
            answers.key().clone(),
            code.key().clone(),
        ]);
        root.set_collection(&tests, vec![10, 20, 30]).unwrap();
        root.set(&code, "src".into()).unwrap();

        for index in 0..3 {
            let mut view = IndexedView::new(&mut root, Some("test".into()), index);
            let test = *view.get(&tests.item()).unwrap();
            view.set(&answers.item(), test * 2).unwrap();
            assert_eq!(view.get(&code).unwrap(), "src");
        }

        assert_eq!(root.collection(&answers).unwrap(), vec![&20, &40, &60]);
    }

    #[test]
    fn out_of_range_index_is_missing() {
        let tests = ArtefactCollection::<i64>::grouped("tests", "test");
        let mut root = Artefactory::new([tests.key().clone()]);
        root.set_collection(&tests, vec![1]).unwrap();
        let view = IndexedView::new(&mut root, Some("test".into()), 4);
        let err = view.get(&tests.item()).unwrap_err();
        assert!(matches!(err, ArtefactError::MissingArtefact { .. }));
    }

    #[test]
    fn other_groups_are_not_pinned() {
        let errors = ArtefactCollection::<String>::grouped("errors", "errors");
        let mut root = Artefactory::new([errors.key().clone()]);
        root.set_collection(&errors, vec!["boom".into()]).unwrap();
        let view = IndexedView::new(&mut root, Some("test".into()), 0);
        assert!(view.get(&errors.item()).is_err());
        assert_eq!(view.collection(&errors).unwrap().len(), 1);
    }
}
