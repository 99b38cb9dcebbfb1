use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::firestore::api::query::Query;
use crate::firestore::api::snapshot::{DocumentSnapshot, QuerySnapshot};
use crate::firestore::api::Firestore;
use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::native::{NativeDocumentSnapshot, NativeQuerySnapshot, SyncEventBody};
use crate::util::subscribe::{ErrorFn, NextFn, PartialObserver};

pub type SnapshotCallback<T> = Arc<dyn Fn(Result<&T, &FirestoreError>) + Send + Sync + 'static>;

/// What `on_snapshot` calls back: either a single callback receiving each
/// snapshot or error, or an observer with separate `next` and `error`.
pub enum SnapshotHandler<T> {
    Callback(SnapshotCallback<T>),
    Observer(PartialObserver<T, FirestoreError>),
}

impl<T: 'static> SnapshotHandler<T> {
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(Result<&T, &FirestoreError>) + Send + Sync + 'static,
    {
        SnapshotHandler::Callback(Arc::new(callback))
    }

    pub fn observer(observer: PartialObserver<T, FirestoreError>) -> Self {
        SnapshotHandler::Observer(observer)
    }

    pub(crate) fn into_observer(self) -> FirestoreResult<SnapshotObserver<T>> {
        match self {
            SnapshotHandler::Callback(callback) => {
                let on_error = callback.clone();
                let next: NextFn<T> = Arc::new(move |value: &T| callback(Ok(value)));
                let error: ErrorFn<FirestoreError> =
                    Arc::new(move |error: &FirestoreError| on_error(Err(error)));
                Ok(SnapshotObserver {
                    next: Some(next),
                    error: Some(error),
                })
            }
            SnapshotHandler::Observer(observer) => {
                if observer.is_empty() {
                    return Err(invalid_argument(
                        "'observer.next' or 'onNext' expected a function.",
                    ));
                }
                Ok(SnapshotObserver {
                    next: observer.next,
                    error: observer.error,
                })
            }
        }
    }
}

impl<T> From<PartialObserver<T, FirestoreError>> for SnapshotHandler<T> {
    fn from(observer: PartialObserver<T, FirestoreError>) -> Self {
        SnapshotHandler::Observer(observer)
    }
}

/// Handler resolved to its `next` / `error` pair.
pub(crate) struct SnapshotObserver<T> {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn<FirestoreError>>,
}

impl<T> Clone for SnapshotObserver<T> {
    fn clone(&self) -> Self {
        Self {
            next: self.next.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T> SnapshotObserver<T> {
    fn next(&self, value: &T) {
        if let Some(next) = &self.next {
            next(value);
        }
    }

    fn error(&self, error: &FirestoreError) {
        if let Some(callback) = &self.error {
            callback(error);
        }
    }

    fn deliver(&self, result: FirestoreResult<T>) {
        match result {
            Ok(value) => self.next(&value),
            Err(error) => self.error(&error),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ListenerKind {
    Document,
    Query,
}

struct QueryListener {
    query: Query,
    observer: SnapshotObserver<QuerySnapshot>,
}

/// Live snapshot listeners of one instance, keyed by listener id.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    documents: Mutex<HashMap<u64, SnapshotObserver<DocumentSnapshot>>>,
    queries: Mutex<HashMap<u64, QueryListener>>,
}

impl ListenerRegistry {
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn add_document(&self, id: u64, observer: SnapshotObserver<DocumentSnapshot>) {
        self.documents.lock().unwrap().insert(id, observer);
    }

    pub(crate) fn add_query(&self, id: u64, query: Query, observer: SnapshotObserver<QuerySnapshot>) {
        self.queries
            .lock()
            .unwrap()
            .insert(id, QueryListener { query, observer });
    }

    /// Returns `true` when the listener was still registered.
    pub(crate) fn remove(&self, kind: ListenerKind, id: u64) -> bool {
        match kind {
            ListenerKind::Document => self.documents.lock().unwrap().remove(&id).is_some(),
            ListenerKind::Query => self.queries.lock().unwrap().remove(&id).is_some(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.lock().unwrap().len() + self.queries.lock().unwrap().len()
    }

    pub(crate) fn dispatch_document(
        &self,
        firestore: &Firestore,
        listener_id: u64,
        body: SyncEventBody<NativeDocumentSnapshot>,
    ) {
        let observer = self.documents.lock().unwrap().get(&listener_id).cloned();
        let Some(observer) = observer else {
            log::debug!("Dropping document snapshot event for unknown listener {listener_id}");
            return;
        };
        let result = match body {
            SyncEventBody::Snapshot(snapshot) => DocumentSnapshot::from_native(firestore, snapshot),
            SyncEventBody::Error(error) => {
                self.unsubscribe(firestore, ListenerKind::Document, listener_id);
                Err(FirestoreError::from_native(&error.code, error.message))
            }
        };
        observer.deliver(result);
    }

    pub(crate) fn dispatch_query(
        &self,
        firestore: &Firestore,
        listener_id: u64,
        body: SyncEventBody<NativeQuerySnapshot>,
    ) {
        let listener = self
            .queries
            .lock()
            .unwrap()
            .get(&listener_id)
            .map(|listener| (listener.query.clone(), listener.observer.clone()));
        let Some((query, observer)) = listener else {
            log::debug!("Dropping collection snapshot event for unknown listener {listener_id}");
            return;
        };
        let result = match body {
            SyncEventBody::Snapshot(snapshot) => QuerySnapshot::from_native(&query, snapshot),
            SyncEventBody::Error(error) => {
                self.unsubscribe(firestore, ListenerKind::Query, listener_id);
                Err(FirestoreError::from_native(&error.code, error.message))
            }
        };
        observer.deliver(result);
    }

    /// An errored listener receives nothing further; the engine side is torn
    /// down with it.
    fn unsubscribe(&self, firestore: &Firestore, kind: ListenerKind, listener_id: u64) {
        if !self.remove(kind, listener_id) {
            return;
        }
        match kind {
            ListenerKind::Document => firestore.native().document_off_snapshot(listener_id),
            ListenerKind::Query => firestore.native().collection_off_snapshot(listener_id),
        }
    }
}

/// Handle returned by `on_snapshot`. Dropping it, or calling
/// [`remove`](ListenerRegistration::remove), stops the listener and tells the
/// engine to unsubscribe.
pub struct ListenerRegistration {
    firestore: Firestore,
    id: Option<u64>,
    kind: ListenerKind,
}

impl ListenerRegistration {
    pub(crate) fn new(firestore: Firestore, id: u64, kind: ListenerKind) -> Self {
        Self {
            firestore,
            id: Some(id),
            kind,
        }
    }

    pub fn listener_id(&self) -> Option<u64> {
        self.id
    }

    pub fn remove(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if !self.firestore.listeners().remove(self.kind, id) {
            return;
        }
        match self.kind {
            ListenerKind::Document => self.firestore.native().document_off_snapshot(id),
            ListenerKind::Query => self.firestore.native().collection_off_snapshot(id),
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn empty_observer_is_rejected() {
        let handler: SnapshotHandler<u32> = PartialObserver::new().into();
        let err = handler.into_observer().err().unwrap();
        assert_eq!(err.message(), "'observer.next' or 'onNext' expected a function.");
    }

    #[test]
    fn callback_receives_values_and_errors() {
        let seen = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let (seen_cb, errors_cb) = (seen.clone(), errors.clone());
        let handler = SnapshotHandler::callback(move |result: Result<&u32, &FirestoreError>| {
            match result {
                Ok(value) => seen_cb.fetch_add(*value as usize, Ordering::SeqCst),
                Err(_) => errors_cb.fetch_add(1, Ordering::SeqCst),
            };
        });

        let observer = handler.into_observer().unwrap();
        observer.deliver(Ok(2));
        observer.deliver(Err(invalid_argument("boom")));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ids_are_monotonic_per_registry() {
        let registry = ListenerRegistry::default();
        let first = registry.next_id();
        assert_eq!(registry.next_id(), first + 1);
        assert_eq!(ListenerRegistry::default().next_id(), 0);
    }

    #[tokio::test]
    async fn engine_error_unsubscribes_document_listener() {
        use crate::firestore::native::{NativeErrorBody, NativeEvent, NativeMetadata};
        use crate::firestore::test_support::{firestore, NativeCall, RecordingNative};

        let native = RecordingNative::default();
        let db = firestore(native.clone());
        let errors = Arc::new(AtomicUsize::new(0));
        let snapshots = Arc::new(AtomicUsize::new(0));
        let (errors_cb, snapshots_cb) = (errors.clone(), snapshots.clone());

        let registration = db
            .doc("users/alice")
            .unwrap()
            .on_snapshot(
                Default::default(),
                SnapshotHandler::callback(move |result: Result<&DocumentSnapshot, &FirestoreError>| {
                    match result {
                        Ok(_) => snapshots_cb.fetch_add(1, Ordering::SeqCst),
                        Err(_) => errors_cb.fetch_add(1, Ordering::SeqCst),
                    };
                }),
            )
            .unwrap();
        let id = registration.listener_id().unwrap();

        db.handle_event(NativeEvent::DocumentSync {
            listener_id: id,
            body: SyncEventBody::Error(NativeErrorBody {
                code: "permission-denied".into(),
                message: "denied".into(),
            }),
        })
        .await;
        db.handle_event(NativeEvent::DocumentSync {
            listener_id: id,
            body: SyncEventBody::Snapshot(NativeDocumentSnapshot {
                path: "users/alice".into(),
                exists: false,
                metadata: NativeMetadata::default(),
                data: None,
            }),
        })
        .await;
        registration.remove();

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(snapshots.load(Ordering::SeqCst), 0);
        assert_eq!(db.listeners().len(), 0);
        let off_calls: Vec<_> = native
            .calls()
            .into_iter()
            .filter(|call| matches!(call, NativeCall::DocumentOffSnapshot { .. }))
            .collect();
        assert_eq!(off_calls, vec![NativeCall::DocumentOffSnapshot { listener_id: id }]);
    }
}
