use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::firestore::api::converter::FirestoreDataConverter;
use crate::firestore::api::listener::{ListenerKind, ListenerRegistration, SnapshotHandler};
use crate::firestore::api::operations::{native_set_options, SetOptions, UpdateData};
use crate::firestore::api::query::Query;
use crate::firestore::api::query_modifiers::QueryModifiers;
use crate::firestore::api::snapshot::DocumentSnapshot;
use crate::firestore::api::Firestore;
use crate::firestore::constants::AUTO_ID_LENGTH;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::ResourcePath;
use crate::firestore::native::{GetOptions, SnapshotListenOptions};
use crate::firestore::value::FirestoreValue;

const SET_OPTIONS_PREFIX: &str = "firebase.firestore().doc().set(_, *) ";

/// A collection, usable everywhere a [`Query`] is.
#[derive(Clone, Debug)]
pub struct CollectionReference {
    query: Query,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if !path.is_collection() {
            return Err(invalid_argument(
                "firebase.firestore().collection(*) 'collectionPath' must point to a collection.",
            ));
        }
        Ok(Self {
            query: Query::new(firestore, path, QueryModifiers::new(), None),
        })
    }

    pub fn id(&self) -> &str {
        self.query.resource_path().id().unwrap_or_default()
    }

    /// Slash separated path relative to the database root.
    pub fn path(&self) -> String {
        self.query.resource_path().relative_name()
    }

    /// The document holding this collection, `None` for root collections.
    pub fn parent(&self) -> Option<DocumentReference> {
        let parent = self.query.resource_path().parent()?;
        if parent.is_empty() {
            return None;
        }
        Some(DocumentReference {
            firestore: self.query.firestore().clone(),
            path: parent,
        })
    }

    /// Reference to a document of this collection. `None` picks a random
    /// 20 character id; a given path may descend into subcollections but must
    /// end on a document.
    pub fn doc(&self, document_path: Option<&str>) -> FirestoreResult<DocumentReference> {
        let document_path = match document_path {
            Some("") => {
                return Err(invalid_argument(
                    "firebase.firestore().collection().doc(*) 'documentPath' must be a non-empty string.",
                ))
            }
            Some(path) => path.to_string(),
            None => generate_auto_id(),
        };
        let path = self.query.resource_path().child(&document_path);
        if !path.is_document() {
            return Err(invalid_argument(
                "firebase.firestore().collection().doc(*) 'documentPath' must point to a document.",
            ));
        }
        Ok(DocumentReference {
            firestore: self.query.firestore().clone(),
            path,
        })
    }

    /// Writes `data` to a new document with an auto id.
    pub async fn add(
        &self,
        data: BTreeMap<String, FirestoreValue>,
    ) -> FirestoreResult<DocumentReference> {
        let document = self.doc(None)?;
        document.set(data, None).await?;
        Ok(document)
    }

    pub fn query(&self) -> Query {
        self.query.clone()
    }
}

impl Deref for CollectionReference {
    type Target = Query;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path())
    }
}

#[derive(Clone, Debug)]
pub struct DocumentReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if !path.is_document() {
            return Err(invalid_argument(
                "firebase.firestore().doc(*) 'documentPath' must point to a document.",
            ));
        }
        Ok(Self { firestore, path })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn id(&self) -> &str {
        self.path.id().unwrap_or_default()
    }

    /// Slash separated path relative to the database root.
    pub fn path(&self) -> String {
        self.path.relative_name()
    }

    pub(crate) fn resource_path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn parent(&self) -> CollectionReference {
        let parent = self.path.parent().unwrap_or_default();
        CollectionReference {
            query: Query::new(self.firestore.clone(), parent, QueryModifiers::new(), None),
        }
    }

    pub fn collection(&self, collection_path: &str) -> FirestoreResult<CollectionReference> {
        if collection_path.is_empty() {
            return Err(invalid_argument(
                "firebase.firestore().doc().collection(*) 'collectionPath' must be a non-empty string.",
            ));
        }
        let path = self.path.child(collection_path);
        if !path.is_collection() {
            return Err(invalid_argument(
                "firebase.firestore().doc().collection(*) 'collectionPath' must point to a collection.",
            ));
        }
        CollectionReference::new(self.firestore.clone(), path)
    }

    pub async fn get(&self, options: GetOptions) -> FirestoreResult<DocumentSnapshot> {
        let snapshot = self
            .firestore
            .native()
            .document_get(&self.path(), options)
            .await?;
        DocumentSnapshot::from_native(&self.firestore, snapshot)
    }

    /// Replaces the document, or merges into it when `options` says so.
    pub async fn set(
        &self,
        data: BTreeMap<String, FirestoreValue>,
        options: Option<SetOptions>,
    ) -> FirestoreResult<()> {
        let options = native_set_options(options.as_ref(), SET_OPTIONS_PREFIX)?;
        let data = self.firestore.serializer().encode_map(&data)?;
        self.firestore
            .native()
            .document_set(&self.path(), data, options)
            .await
    }

    /// Writes a typed model through `converter`.
    pub async fn set_with_converter<C>(
        &self,
        converter: &C,
        value: &C::Model,
        options: Option<SetOptions>,
    ) -> FirestoreResult<()>
    where
        C: FirestoreDataConverter,
    {
        let data = converter.to_map(value).map_err(|err| {
            invalid_argument(format!(
                "firebase.firestore().doc().set(*) 'withConverter.toFirestore' threw an error: {}.",
                err.message()
            ))
        })?;
        self.set(data, options).await
    }

    pub async fn update(&self, data: UpdateData) -> FirestoreResult<()> {
        let data = self.firestore.serializer().encode_map(data.fields())?;
        self.firestore
            .native()
            .document_update(&self.path(), data)
            .await
    }

    pub async fn delete(&self) -> FirestoreResult<()> {
        self.firestore.native().document_delete(&self.path()).await
    }

    pub fn on_snapshot(
        &self,
        options: SnapshotListenOptions,
        handler: impl Into<SnapshotHandler<DocumentSnapshot>>,
    ) -> FirestoreResult<ListenerRegistration> {
        let observer = handler
            .into()
            .into_observer()
            .map_err(|err| err.with_prefix("firebase.firestore().doc().onSnapshot(*) "))?;

        let listeners = self.firestore.listeners();
        let listener_id = listeners.next_id();
        listeners.add_document(listener_id, observer);
        self.firestore
            .native()
            .document_on_snapshot(&self.path(), listener_id, options);
        Ok(ListenerRegistration::new(
            self.firestore.clone(),
            listener_id,
            ListenerKind::Document,
        ))
    }

    /// Same path within the same app.
    pub fn is_equal(&self, other: &DocumentReference) -> bool {
        self.path == other.path && self.firestore.app_name() == other.firestore.app_name()
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.path())
    }
}

impl From<&DocumentReference> for FirestoreValue {
    fn from(reference: &DocumentReference) -> Self {
        FirestoreValue::from_reference(reference.path.clone())
    }
}

impl From<DocumentReference> for FirestoreValue {
    fn from(reference: DocumentReference) -> Self {
        FirestoreValue::from_reference(reference.path)
    }
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}
