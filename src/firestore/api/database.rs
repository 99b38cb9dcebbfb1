use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use serde_json::Value as JsonValue;

use crate::firestore::api::listener::ListenerRegistry;
use crate::firestore::api::query::Query;
use crate::firestore::api::query_modifiers::QueryModifiers;
use crate::firestore::api::reference::{CollectionReference, DocumentReference};
use crate::firestore::api::transaction::Transaction;
use crate::firestore::api::transaction_handler::{
    TransactionHandler, TransactionOutput, UpdateFunction,
};
use crate::firestore::api::write_batch::WriteBatch;
use crate::firestore::constants::{CACHE_SIZE_UNLIMITED, MIN_CACHE_SIZE_BYTES};
use crate::firestore::error::{internal_error, invalid_argument, FirestoreResult};
use crate::firestore::model::{DatabaseId, ResourcePath};
use crate::firestore::native::{NativeEvent, NativeFirestore, NativeSerializer, NativeSettings};

const SETTINGS_PREFIX: &str = "firebase.firestore().settings(*) ";

/// How server timestamps that are still pending are surfaced in reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServerTimestampBehavior {
    Estimate,
    Previous,
    None,
}

impl ServerTimestampBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerTimestampBehavior::Estimate => "estimate",
            ServerTimestampBehavior::Previous => "previous",
            ServerTimestampBehavior::None => "none",
        }
    }
}

impl FromStr for ServerTimestampBehavior {
    type Err = crate::firestore::error::FirestoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "estimate" => Ok(ServerTimestampBehavior::Estimate),
            "previous" => Ok(ServerTimestampBehavior::Previous),
            "none" => Ok(ServerTimestampBehavior::None),
            _ => Err(invalid_argument(format!(
                "{SETTINGS_PREFIX}'settings.serverTimestampBehavior' must be one of 'estimate', 'previous', 'none'."
            ))),
        }
    }
}

/// Instance settings. Unset fields keep their current value when applied.
///
/// `ignore_undefined_properties` stays on this side of the bridge and only
/// changes how data is encoded; everything else is forwarded to the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FirestoreSettings {
    pub persistence: Option<bool>,
    pub cache_size_bytes: Option<i64>,
    pub host: Option<String>,
    pub ssl: Option<bool>,
    pub server_timestamp_behavior: Option<ServerTimestampBehavior>,
    pub ignore_undefined_properties: Option<bool>,
}

impl FirestoreSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn validate(&self) -> FirestoreResult<()> {
        if let Some(cache_size) = self.cache_size_bytes {
            if cache_size != CACHE_SIZE_UNLIMITED && cache_size < MIN_CACHE_SIZE_BYTES {
                return Err(invalid_argument(format!(
                    "{SETTINGS_PREFIX}'settings.cacheSizeBytes' the minimum cache size is 1048576 bytes (1MB)."
                )));
            }
        }
        if matches!(self.host.as_deref(), Some("")) {
            return Err(invalid_argument(format!(
                "{SETTINGS_PREFIX}'settings.host' must not be an empty string."
            )));
        }
        Ok(())
    }

    fn merge(&mut self, update: &FirestoreSettings) {
        fn take<T: Clone>(current: &mut Option<T>, update: &Option<T>) {
            if update.is_some() {
                current.clone_from(update);
            }
        }
        take(&mut self.persistence, &update.persistence);
        take(&mut self.cache_size_bytes, &update.cache_size_bytes);
        take(&mut self.host, &update.host);
        take(&mut self.ssl, &update.ssl);
        take(&mut self.server_timestamp_behavior, &update.server_timestamp_behavior);
        take(&mut self.ignore_undefined_properties, &update.ignore_undefined_properties);
    }

    fn to_native(&self) -> NativeSettings {
        NativeSettings {
            persistence: self.persistence,
            cache_size_bytes: self.cache_size_bytes,
            host: self.host.clone(),
            ssl: self.ssl,
            server_timestamp_behavior: self
                .server_timestamp_behavior
                .map(|behavior| behavior.as_str().to_string()),
        }
    }
}

/// Entry point bound to one app and database, backed by a native engine.
///
/// Cloning is cheap; clones share listeners, transactions and settings.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    database_id: DatabaseId,
    native: Arc<dyn NativeFirestore>,
    settings: Mutex<FirestoreSettings>,
    listeners: ListenerRegistry,
    transactions: TransactionHandler,
}

pub struct FirestoreBuilder {
    native: Arc<dyn NativeFirestore>,
    database_id: DatabaseId,
    settings: FirestoreSettings,
}

impl FirestoreBuilder {
    fn new(native: Arc<dyn NativeFirestore>) -> Self {
        Self {
            native,
            database_id: DatabaseId::default(),
            settings: FirestoreSettings::default(),
        }
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.database_id = DatabaseId::new(app_name, self.database_id.database());
        self
    }

    pub fn database_id(mut self, database: impl Into<String>) -> Self {
        self.database_id = self.database_id.with_database(database);
        self
    }

    /// Initial settings, kept locally. Use [`Firestore::settings`] to push
    /// settings to the engine.
    pub fn settings(mut self, settings: FirestoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> FirestoreResult<Firestore> {
        self.settings
            .validate()
            .map_err(|err| err.with_prefix("Firestore::builder() "))?;
        Ok(Firestore {
            inner: Arc::new(FirestoreInner {
                database_id: self.database_id,
                native: self.native,
                settings: Mutex::new(self.settings),
                listeners: ListenerRegistry::default(),
                transactions: TransactionHandler::default(),
            }),
        })
    }
}

impl Firestore {
    pub fn builder(native: Arc<dyn NativeFirestore>) -> FirestoreBuilder {
        FirestoreBuilder::new(native)
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    pub fn app_name(&self) -> &str {
        self.inner.database_id.app_name()
    }

    pub fn native(&self) -> &Arc<dyn NativeFirestore> {
        &self.inner.native
    }

    /// Whether `other` is bound to the same app and database.
    pub fn is_same(&self, other: &Firestore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.database_id == other.inner.database_id
    }

    /// Codec configured with the current `ignore_undefined_properties` policy.
    pub fn serializer(&self) -> NativeSerializer {
        let ignore_undefined = self
            .inner
            .settings
            .lock()
            .unwrap()
            .ignore_undefined_properties
            .unwrap_or(false);
        NativeSerializer::new(ignore_undefined)
    }

    pub fn current_settings(&self) -> FirestoreSettings {
        self.inner.settings.lock().unwrap().clone()
    }

    pub(crate) fn listeners(&self) -> &ListenerRegistry {
        &self.inner.listeners
    }

    pub(crate) fn transactions(&self) -> &TransactionHandler {
        &self.inner.transactions
    }

    pub fn collection(&self, collection_path: &str) -> FirestoreResult<CollectionReference> {
        if collection_path.is_empty() {
            return Err(invalid_argument(
                "firebase.firestore().collection(*) 'collectionPath' must be a non-empty string.",
            ));
        }
        CollectionReference::new(self.clone(), ResourcePath::root().child(collection_path))
    }

    pub fn doc(&self, document_path: &str) -> FirestoreResult<DocumentReference> {
        if document_path.is_empty() {
            return Err(invalid_argument(
                "firebase.firestore().doc(*) 'documentPath' must be a non-empty string.",
            ));
        }
        DocumentReference::new(self.clone(), ResourcePath::root().child(document_path))
    }

    /// Query over every collection named `collection_id`, whatever its parent.
    pub fn collection_group(&self, collection_id: &str) -> FirestoreResult<Query> {
        if collection_id.is_empty() {
            return Err(invalid_argument(
                "firebase.firestore().collectionGroup(*) 'collectionId' must be a non-empty string.",
            ));
        }
        if collection_id.contains('/') {
            return Err(invalid_argument(
                "firebase.firestore().collectionGroup(*) 'collectionId' must not contain '/'.",
            ));
        }
        Ok(Query::new(
            self.clone(),
            ResourcePath::root().child(collection_id),
            QueryModifiers::new().as_collection_group(),
            None,
        ))
    }

    /// Query stored in a previously loaded bundle.
    pub fn named_query(&self, query_name: &str) -> FirestoreResult<Query> {
        if query_name.is_empty() {
            return Err(invalid_argument(
                "firebase.firestore().namedQuery(*) 'queryName' must be a non-empty string.",
            ));
        }
        Ok(Query::new(
            self.clone(),
            ResourcePath::root(),
            QueryModifiers::new(),
            Some(query_name.to_string()),
        ))
    }

    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.clone())
    }

    /// Runs `update_function` inside an engine transaction.
    ///
    /// The engine may call the function several times; each attempt gets a
    /// fresh write buffer. The returned future resolves with the value of the
    /// attempt the engine committed, or with the first error. Engine errors
    /// carry the location of this call in [`FirestoreError::stack`].
    ///
    /// [`FirestoreError::stack`]: crate::firestore::FirestoreError::stack
    #[track_caller]
    pub fn run_transaction<T, F, Fut>(
        &self,
        update_function: F,
    ) -> impl Future<Output = FirestoreResult<T>> + Send + 'static
    where
        T: Send + 'static,
        F: Fn(Transaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FirestoreResult<T>> + Send + 'static,
    {
        let caller = Location::caller();
        let stack = format!("{}:{}:{}", caller.file(), caller.line(), caller.column());

        let update: UpdateFunction = Arc::new(move |transaction: Transaction| {
            update_function(transaction)
                .map(|result| result.map(|value| Box::new(value) as TransactionOutput))
                .boxed()
        });
        let receiver = self.inner.transactions.begin(self, update, stack);

        async move {
            let output = receiver
                .await
                .map_err(|_| internal_error("Transaction was dropped before it settled"))??;
            output
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| internal_error("Transaction resolved with an unexpected result type"))
        }
    }

    /// Validates `settings`, applies them locally and forwards the engine
    /// facing part.
    pub async fn settings(&self, settings: FirestoreSettings) -> FirestoreResult<()> {
        if settings.is_empty() {
            return Err(invalid_argument(format!(
                "{SETTINGS_PREFIX}'settings' must not be an empty object."
            )));
        }
        settings.validate()?;
        self.inner.settings.lock().unwrap().merge(&settings);
        self.inner.native.settings(settings.to_native()).await
    }

    pub async fn load_bundle(&self, bundle: &str) -> FirestoreResult<()> {
        self.inner.native.load_bundle(bundle).await
    }

    pub async fn clear_persistence(&self) -> FirestoreResult<()> {
        self.inner.native.clear_persistence().await
    }

    pub async fn wait_for_pending_writes(&self) -> FirestoreResult<()> {
        self.inner.native.wait_for_pending_writes().await
    }

    pub async fn terminate(&self) -> FirestoreResult<()> {
        self.inner.native.terminate().await
    }

    pub async fn disable_network(&self) -> FirestoreResult<()> {
        self.inner.native.disable_network().await
    }

    pub async fn enable_network(&self) -> FirestoreResult<()> {
        self.inner.native.enable_network().await
    }

    pub fn use_emulator(&self, host: &str, port: u16) -> FirestoreResult<()> {
        if host.is_empty() || port == 0 {
            return Err(invalid_argument(
                "firebase.firestore().useEmulator() takes a non-empty host and port",
            ));
        }
        self.inner.native.use_emulator(host, port);
        Ok(())
    }

    /// Routes an engine event to the listener or transaction it belongs to.
    /// Events for ids that are no longer registered are dropped.
    pub async fn handle_event(&self, event: NativeEvent) {
        match event {
            NativeEvent::DocumentSync { listener_id, body } => {
                self.inner.listeners.dispatch_document(self, listener_id, body)
            }
            NativeEvent::CollectionSync { listener_id, body } => {
                self.inner.listeners.dispatch_query(self, listener_id, body)
            }
            NativeEvent::Transaction { listener_id, body } => {
                self.inner
                    .transactions
                    .handle_event(self, listener_id, body)
                    .await
            }
        }
    }

    /// Decodes a raw `{listenerId, body}` payload received under `event_name`
    /// and routes it.
    pub async fn handle_raw_event(&self, event_name: &str, payload: JsonValue) -> FirestoreResult<()> {
        let event = NativeEvent::from_json(event_name, payload)?;
        self.handle_event(event).await;
        Ok(())
    }
}

impl fmt::Debug for Firestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firestore")
            .field("database_id", &self.inner.database_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::constants::{DEFAULT_APP_NAME, DEFAULT_DATABASE_ID};
    use crate::firestore::test_support::{firestore, NativeCall, RecordingNative};

    #[test]
    fn builder_defaults_to_default_app_and_database() {
        let db = firestore(RecordingNative::default());
        assert_eq!(db.app_name(), DEFAULT_APP_NAME);
        assert_eq!(db.database_id().database(), DEFAULT_DATABASE_ID);

        let custom = Firestore::builder(Arc::new(RecordingNative::default()))
            .app_name("secondary")
            .database_id("analytics")
            .build()
            .unwrap();
        assert_eq!(custom.app_name(), "secondary");
        assert_eq!(custom.database_id().database(), "analytics");
        assert!(!db.is_same(&custom));
    }

    #[test]
    fn path_entry_points_validate_their_argument() {
        let db = firestore(RecordingNative::default());
        assert!(db.collection("").unwrap_err().message().contains("non-empty"));
        assert!(db
            .collection("users/alice")
            .unwrap_err()
            .message()
            .ends_with("must point to a collection."));
        assert!(db.doc("users").unwrap_err().message().ends_with("must point to a document."));
        assert!(db
            .collection_group("users/alice/posts")
            .unwrap_err()
            .message()
            .ends_with("must not contain '/'."));
        assert!(db.collection_group("posts").unwrap().modifiers().is_collection_group());

        let named = db.named_query("latest").unwrap();
        assert_eq!(named.request().path, "latest");
    }

    #[tokio::test]
    async fn settings_are_validated_and_forwarded() {
        let native = RecordingNative::default();
        let db = firestore(native.clone());

        let err = db.settings(FirestoreSettings::default()).await.unwrap_err();
        assert!(err.message().ends_with("'settings' must not be an empty object."));

        let err = db
            .settings(FirestoreSettings {
                cache_size_bytes: Some(1024),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.message().contains("the minimum cache size is 1048576 bytes"));

        db.settings(FirestoreSettings {
            cache_size_bytes: Some(CACHE_SIZE_UNLIMITED),
            ignore_undefined_properties: Some(true),
            server_timestamp_behavior: Some("previous".parse().unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(db.serializer().ignore_undefined());

        let forwarded = native.calls().into_iter().find_map(|call| match call {
            NativeCall::Settings { settings } => Some(settings),
            _ => None,
        });
        let forwarded = forwarded.unwrap();
        assert_eq!(forwarded.cache_size_bytes, Some(-1));
        assert_eq!(forwarded.server_timestamp_behavior.as_deref(), Some("previous"));
    }

    #[test]
    fn use_emulator_requires_host_and_port() {
        let native = RecordingNative::default();
        let db = firestore(native.clone());
        assert!(db.use_emulator("", 8080).is_err());
        db.use_emulator("localhost", 8080).unwrap();
        assert!(native.calls().contains(&NativeCall::UseEmulator {
            host: "localhost".into(),
            port: 8080,
        }));
    }
}
