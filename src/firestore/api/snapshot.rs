use std::collections::BTreeMap;

use crate::firestore::api::converter::FirestoreDataConverter;
use crate::firestore::api::query::Query;
use crate::firestore::api::reference::DocumentReference;
use crate::firestore::api::Firestore;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{IntoFieldPath, ResourcePath};
use crate::firestore::native::{
    NativeChangeType, NativeDocumentChange, NativeDocumentSnapshot, NativeMetadata,
    NativeQuerySnapshot, SnapshotListenOptions,
};
use crate::firestore::value::{FirestoreValue, MapValue};

/// Metadata about the state of a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotMetadata {
    from_cache: bool,
    has_pending_writes: bool,
}

impl SnapshotMetadata {
    pub fn new(from_cache: bool, has_pending_writes: bool) -> Self {
        Self {
            from_cache,
            has_pending_writes,
        }
    }

    /// Whether the snapshot was served from the local cache.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Whether the snapshot contains local writes not yet acknowledged.
    pub fn has_pending_writes(&self) -> bool {
        self.has_pending_writes
    }
}

impl From<NativeMetadata> for SnapshotMetadata {
    fn from(metadata: NativeMetadata) -> Self {
        Self::new(metadata.0, metadata.1)
    }
}

#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    reference: DocumentReference,
    data: Option<MapValue>,
    metadata: SnapshotMetadata,
}

impl DocumentSnapshot {
    pub(crate) fn from_native(
        firestore: &Firestore,
        native: NativeDocumentSnapshot,
    ) -> FirestoreResult<Self> {
        let path = ResourcePath::from_string(&native.path)?;
        let reference = DocumentReference::new(firestore.clone(), path)?;
        let data = if native.exists {
            let fields = native.data.unwrap_or_default();
            Some(firestore.serializer().decode_map(fields)?)
        } else {
            None
        };
        Ok(Self {
            reference,
            data,
            metadata: native.metadata.into(),
        })
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    pub(crate) fn path(&self) -> &ResourcePath {
        self.reference.resource_path()
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Document fields, `None` when the document does not exist.
    pub fn data(&self) -> Option<&BTreeMap<String, FirestoreValue>> {
        self.data.as_ref().map(MapValue::fields)
    }

    /// Reads a possibly nested field. Missing fields and missing documents
    /// both yield `Ok(None)`.
    pub fn get(&self, field_path: impl IntoFieldPath) -> FirestoreResult<Option<&FirestoreValue>> {
        let field_path = field_path.into_field_path().map_err(|err| {
            invalid_argument(format!(
                "firebase.firestore() DocumentSnapshot.get(*) 'fieldPath' {}.",
                err.message()
            ))
        })?;
        Ok(self.data.as_ref().and_then(|data| data.get(&field_path)))
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    pub fn from_cache(&self) -> bool {
        self.metadata.from_cache()
    }

    pub fn has_pending_writes(&self) -> bool {
        self.metadata.has_pending_writes()
    }

    /// Decodes the fields through `converter`; `None` when the document does not exist.
    pub fn to_model<C>(&self, converter: &C) -> FirestoreResult<Option<C::Model>>
    where
        C: FirestoreDataConverter,
    {
        self.data
            .as_ref()
            .map(|data| converter.from_map(data))
            .transpose()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentChangeType {
    Added,
    Modified,
    Removed,
}

impl From<NativeChangeType> for DocumentChangeType {
    fn from(value: NativeChangeType) -> Self {
        match value {
            NativeChangeType::Added => DocumentChangeType::Added,
            NativeChangeType::Modified => DocumentChangeType::Modified,
            NativeChangeType::Removed => DocumentChangeType::Removed,
        }
    }
}

/// One entry of [`QuerySnapshot::doc_changes`]. Indices are `-1` when the
/// document was not part of the old or new result set.
#[derive(Clone, Debug)]
pub struct DocumentChange {
    change_type: DocumentChangeType,
    doc: DocumentSnapshot,
    new_index: i64,
    old_index: i64,
    is_metadata_change: bool,
}

impl DocumentChange {
    fn from_native(firestore: &Firestore, native: NativeDocumentChange) -> FirestoreResult<Self> {
        Ok(Self {
            change_type: native.change_type.into(),
            doc: DocumentSnapshot::from_native(firestore, native.doc)?,
            new_index: native.new_index,
            old_index: native.old_index,
            is_metadata_change: native.is_metadata_change,
        })
    }

    pub fn change_type(&self) -> DocumentChangeType {
        self.change_type
    }

    pub fn doc(&self) -> &DocumentSnapshot {
        &self.doc
    }

    pub fn new_index(&self) -> i64 {
        self.new_index
    }

    pub fn old_index(&self) -> i64 {
        self.old_index
    }

    pub fn is_metadata_change(&self) -> bool {
        self.is_metadata_change
    }
}

#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    query: Query,
    documents: Vec<DocumentSnapshot>,
    changes: Vec<DocumentChange>,
    metadata: SnapshotMetadata,
    excludes_metadata_changes: bool,
}

impl QuerySnapshot {
    pub(crate) fn from_native(query: &Query, native: NativeQuerySnapshot) -> FirestoreResult<Self> {
        let firestore = query.firestore();
        let documents = native
            .documents
            .into_iter()
            .map(|doc| DocumentSnapshot::from_native(firestore, doc))
            .collect::<FirestoreResult<Vec<_>>>()?;
        let changes = native
            .changes
            .into_iter()
            .map(|change| DocumentChange::from_native(firestore, change))
            .collect::<FirestoreResult<Vec<_>>>()?;
        Ok(Self {
            query: query.clone(),
            documents,
            changes,
            metadata: native.metadata.into(),
            excludes_metadata_changes: native.excludes_metadata_changes,
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn size(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    /// Changes since the previous snapshot. Metadata-only changes are left
    /// out unless `options` asks for them, which is only allowed when the
    /// listener itself was registered with metadata changes.
    pub fn doc_changes(
        &self,
        options: SnapshotListenOptions,
    ) -> FirestoreResult<Vec<&DocumentChange>> {
        if options.include_metadata_changes && self.excludes_metadata_changes {
            return Err(invalid_argument(
                "firebase.firestore() QuerySnapshot.docChanges() 'includeMetadataChanges' option specified, however the onSnapshot() listener has excluded metadata changes. To include metadata changes with your document changes, pass includeMetadataChanges: true to your onSnapshot() listener.",
            ));
        }
        Ok(self
            .changes
            .iter()
            .filter(|change| options.include_metadata_changes || !change.is_metadata_change)
            .collect())
    }

    pub fn for_each<F>(&self, mut callback: F)
    where
        F: FnMut(&DocumentSnapshot, usize),
    {
        for (index, doc) in self.documents.iter().enumerate() {
            callback(doc, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::test_support::{firestore, RecordingNative};
    use crate::firestore::native::WireValue;

    fn native_doc(path: &str, data: Option<BTreeMap<String, WireValue>>) -> NativeDocumentSnapshot {
        NativeDocumentSnapshot {
            path: path.to_string(),
            exists: data.is_some(),
            metadata: NativeMetadata(true, false),
            data,
        }
    }

    #[test]
    fn document_snapshot_reads_nested_fields() {
        let db = firestore(RecordingNative::default());
        let mut address = BTreeMap::new();
        address.insert("city".to_string(), WireValue::String("Oslo".into()));
        let mut data = BTreeMap::new();
        data.insert("address".to_string(), WireValue::Object(address));

        let snapshot = DocumentSnapshot::from_native(&db, native_doc("users/alice", Some(data))).unwrap();
        assert!(snapshot.exists());
        assert_eq!(snapshot.id(), "alice");
        assert!(snapshot.from_cache());
        assert_eq!(
            snapshot.get("address.city").unwrap(),
            Some(&FirestoreValue::from_string("Oslo"))
        );
        assert_eq!(snapshot.get("address.zip").unwrap(), None);
        assert!(snapshot.get("address..zip").is_err());
    }

    #[test]
    fn missing_document_has_no_data() {
        let db = firestore(RecordingNative::default());
        let snapshot = DocumentSnapshot::from_native(&db, native_doc("users/bob", None)).unwrap();
        assert!(!snapshot.exists());
        assert!(snapshot.data().is_none());
        assert_eq!(snapshot.get("name").unwrap(), None);
    }

    #[test]
    fn doc_changes_respect_listener_options() {
        let db = firestore(RecordingNative::default());
        let query = db.collection("users").unwrap().query();
        let change = |is_metadata_change| NativeDocumentChange {
            change_type: NativeChangeType::Modified,
            doc: native_doc("users/a", Some(BTreeMap::new())),
            new_index: 0,
            old_index: 0,
            is_metadata_change,
        };
        let native = NativeQuerySnapshot {
            source: None,
            excludes_metadata_changes: false,
            changes: vec![change(false), change(true)],
            documents: vec![native_doc("users/a", Some(BTreeMap::new()))],
            metadata: NativeMetadata::default(),
        };

        let snapshot = QuerySnapshot::from_native(&query, native.clone()).unwrap();
        assert_eq!(snapshot.doc_changes(SnapshotListenOptions::default()).unwrap().len(), 1);
        assert_eq!(
            snapshot
                .doc_changes(SnapshotListenOptions::include_metadata_changes())
                .unwrap()
                .len(),
            2
        );

        let excluded = QuerySnapshot::from_native(
            &query,
            NativeQuerySnapshot {
                excludes_metadata_changes: true,
                ..native
            },
        )
        .unwrap();
        let err = excluded
            .doc_changes(SnapshotListenOptions::include_metadata_changes())
            .unwrap_err();
        assert!(err
            .message()
            .contains("To include metadata changes with your document changes"));
    }
}
