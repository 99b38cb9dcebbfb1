//! In-memory engine double for unit tests: records every bridge call and
//! answers reads from canned data.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::firestore::api::{Firestore, GetOptions, SnapshotListenOptions};
use crate::firestore::error::{FirestoreError, FirestoreResult};
use crate::firestore::native::{
    NativeCountResult, NativeDocumentSnapshot, NativeFirestore, NativeMetadata,
    NativeQuerySnapshot, NativeSetOptions, NativeSettings, QueryRequest, WireValue, WriteCommand,
};

#[derive(Clone, Debug, PartialEq)]
pub enum NativeCall {
    DocumentGet { path: String, options: GetOptions },
    DocumentSet { path: String, data: BTreeMap<String, WireValue>, options: NativeSetOptions },
    DocumentUpdate { path: String, data: BTreeMap<String, WireValue> },
    DocumentDelete { path: String },
    DocumentOnSnapshot { path: String, listener_id: u64, options: SnapshotListenOptions },
    DocumentOffSnapshot { listener_id: u64 },
    CollectionGet { request: QueryRequest, options: GetOptions },
    CollectionOnSnapshot { request: QueryRequest, listener_id: u64, options: SnapshotListenOptions },
    CollectionOffSnapshot { listener_id: u64 },
    CollectionCount { request: QueryRequest },
    NamedQueryGet { request: QueryRequest, options: GetOptions },
    NamedQueryOnSnapshot { request: QueryRequest, listener_id: u64, options: SnapshotListenOptions },
    DocumentBatch { writes: Vec<WriteCommand> },
    TransactionBegin { id: u64 },
    TransactionGetDocument { id: u64, path: String },
    TransactionApplyBuffer { id: u64, commands: Vec<WriteCommand> },
    TransactionDispose { id: u64 },
    Settings { settings: NativeSettings },
    UseEmulator { host: String, port: u16 },
}

#[derive(Default)]
struct Recorded {
    calls: Vec<NativeCall>,
    documents: HashMap<String, BTreeMap<String, WireValue>>,
    query_result: NativeQuerySnapshot,
    count: u64,
    apply_error: Option<FirestoreError>,
}

#[derive(Clone, Default)]
pub struct RecordingNative {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingNative {
    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn batches(&self) -> Vec<Vec<WriteCommand>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NativeCall::DocumentBatch { writes } => Some(writes),
                _ => None,
            })
            .collect()
    }

    pub fn with_document(self, path: &str, data: BTreeMap<String, WireValue>) -> Self {
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(path.to_string(), data);
        self
    }

    pub fn set_query_result(&self, snapshot: NativeQuerySnapshot) {
        self.state.lock().unwrap().query_result = snapshot;
    }

    pub fn set_count(&self, count: u64) {
        self.state.lock().unwrap().count = count;
    }

    pub fn fail_apply_buffer(&self, error: FirestoreError) {
        self.state.lock().unwrap().apply_error = Some(error);
    }

    fn record(&self, call: NativeCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn snapshot(&self, path: &str) -> NativeDocumentSnapshot {
        let data = self.state.lock().unwrap().documents.get(path).cloned();
        NativeDocumentSnapshot {
            path: path.to_string(),
            exists: data.is_some(),
            metadata: NativeMetadata::default(),
            data,
        }
    }
}

#[async_trait]
impl NativeFirestore for RecordingNative {
    async fn document_get(
        &self,
        path: &str,
        options: GetOptions,
    ) -> FirestoreResult<NativeDocumentSnapshot> {
        self.record(NativeCall::DocumentGet { path: path.to_string(), options });
        Ok(self.snapshot(path))
    }

    async fn document_set(
        &self,
        path: &str,
        data: BTreeMap<String, WireValue>,
        options: NativeSetOptions,
    ) -> FirestoreResult<()> {
        self.record(NativeCall::DocumentSet { path: path.to_string(), data, options });
        Ok(())
    }

    async fn document_update(
        &self,
        path: &str,
        data: BTreeMap<String, WireValue>,
    ) -> FirestoreResult<()> {
        self.record(NativeCall::DocumentUpdate { path: path.to_string(), data });
        Ok(())
    }

    async fn document_delete(&self, path: &str) -> FirestoreResult<()> {
        self.record(NativeCall::DocumentDelete { path: path.to_string() });
        Ok(())
    }

    fn document_on_snapshot(&self, path: &str, listener_id: u64, options: SnapshotListenOptions) {
        self.record(NativeCall::DocumentOnSnapshot {
            path: path.to_string(),
            listener_id,
            options,
        });
    }

    fn document_off_snapshot(&self, listener_id: u64) {
        self.record(NativeCall::DocumentOffSnapshot { listener_id });
    }

    async fn collection_get(
        &self,
        request: &QueryRequest,
        options: GetOptions,
    ) -> FirestoreResult<NativeQuerySnapshot> {
        self.record(NativeCall::CollectionGet { request: request.clone(), options });
        Ok(self.state.lock().unwrap().query_result.clone())
    }

    fn collection_on_snapshot(
        &self,
        request: &QueryRequest,
        listener_id: u64,
        options: SnapshotListenOptions,
    ) {
        self.record(NativeCall::CollectionOnSnapshot {
            request: request.clone(),
            listener_id,
            options,
        });
    }

    fn collection_off_snapshot(&self, listener_id: u64) {
        self.record(NativeCall::CollectionOffSnapshot { listener_id });
    }

    async fn collection_count(&self, request: &QueryRequest) -> FirestoreResult<NativeCountResult> {
        self.record(NativeCall::CollectionCount { request: request.clone() });
        Ok(NativeCountResult { count: self.state.lock().unwrap().count })
    }

    async fn named_query_get(
        &self,
        request: &QueryRequest,
        options: GetOptions,
    ) -> FirestoreResult<NativeQuerySnapshot> {
        self.record(NativeCall::NamedQueryGet { request: request.clone(), options });
        Ok(self.state.lock().unwrap().query_result.clone())
    }

    fn named_query_on_snapshot(
        &self,
        request: &QueryRequest,
        listener_id: u64,
        options: SnapshotListenOptions,
    ) {
        self.record(NativeCall::NamedQueryOnSnapshot {
            request: request.clone(),
            listener_id,
            options,
        });
    }

    async fn document_batch(&self, writes: Vec<WriteCommand>) -> FirestoreResult<()> {
        self.record(NativeCall::DocumentBatch { writes });
        Ok(())
    }

    fn transaction_begin(&self, transaction_id: u64) {
        self.record(NativeCall::TransactionBegin { id: transaction_id });
    }

    async fn transaction_get_document(
        &self,
        transaction_id: u64,
        path: &str,
    ) -> FirestoreResult<NativeDocumentSnapshot> {
        self.record(NativeCall::TransactionGetDocument {
            id: transaction_id,
            path: path.to_string(),
        });
        Ok(self.snapshot(path))
    }

    async fn transaction_apply_buffer(
        &self,
        transaction_id: u64,
        commands: Vec<WriteCommand>,
    ) -> FirestoreResult<()> {
        self.record(NativeCall::TransactionApplyBuffer {
            id: transaction_id,
            commands,
        });
        match self.state.lock().unwrap().apply_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn transaction_dispose(&self, transaction_id: u64) {
        self.record(NativeCall::TransactionDispose { id: transaction_id });
    }

    async fn settings(&self, settings: NativeSettings) -> FirestoreResult<()> {
        self.record(NativeCall::Settings { settings });
        Ok(())
    }

    fn use_emulator(&self, host: &str, port: u16) {
        self.record(NativeCall::UseEmulator {
            host: host.to_string(),
            port,
        });
    }
}

pub fn firestore(native: RecordingNative) -> Firestore {
    Firestore::builder(Arc::new(native)).build().unwrap()
}

pub fn firestore_for_app(native: RecordingNative, app_name: &str) -> Firestore {
    Firestore::builder(Arc::new(native))
        .app_name(app_name)
        .build()
        .unwrap()
}
