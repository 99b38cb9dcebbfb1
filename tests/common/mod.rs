#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use firestore_bridge::firestore::error::FirestoreResult;
use firestore_bridge::firestore::native::{
    GetOptions, NativeCountResult, NativeDocumentSnapshot, NativeFirestore, NativeQuerySnapshot,
    NativeSetOptions, NativeSettings, QueryRequest, SnapshotListenOptions, WireValue, WriteCommand,
};
use firestore_bridge::firestore::Firestore;
use serde_json::{json, Value};

/// Engine double recording each bridge call as `(method, JSON arguments)`,
/// the shape a real bridge would marshal.
#[derive(Clone, Default)]
pub struct MockEngine {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    documents: Arc<Mutex<HashMap<String, BTreeMap<String, WireValue>>>>,
    query_result: Arc<Mutex<NativeQuerySnapshot>>,
}

impl MockEngine {
    pub fn firestore(&self) -> Firestore {
        Firestore::builder(Arc::new(self.clone()))
            .build()
            .expect("default settings are valid")
    }

    pub fn put_document(&self, path: &str, data: BTreeMap<String, WireValue>) {
        self.documents.lock().unwrap().insert(path.to_string(), data);
    }

    pub fn set_query_result(&self, snapshot: NativeQuerySnapshot) {
        *self.query_result.lock().unwrap() = snapshot;
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_named(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == method)
            .map(|(_, args)| args)
            .collect()
    }

    fn record(&self, method: &str, args: Value) {
        self.calls.lock().unwrap().push((method.to_string(), args));
    }

    fn document(&self, path: &str) -> NativeDocumentSnapshot {
        let data = self.documents.lock().unwrap().get(path).cloned();
        NativeDocumentSnapshot {
            path: path.to_string(),
            exists: data.is_some(),
            data,
            ..Default::default()
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("bridge payloads serialize")
}

#[async_trait]
impl NativeFirestore for MockEngine {
    async fn document_get(
        &self,
        path: &str,
        options: GetOptions,
    ) -> FirestoreResult<NativeDocumentSnapshot> {
        self.record("documentGet", json!([path, to_json(&options)]));
        Ok(self.document(path))
    }

    async fn document_set(
        &self,
        path: &str,
        data: BTreeMap<String, WireValue>,
        options: NativeSetOptions,
    ) -> FirestoreResult<()> {
        self.record("documentSet", json!([path, to_json(&data), to_json(&options)]));
        Ok(())
    }

    async fn document_update(
        &self,
        path: &str,
        data: BTreeMap<String, WireValue>,
    ) -> FirestoreResult<()> {
        self.record("documentUpdate", json!([path, to_json(&data)]));
        Ok(())
    }

    async fn document_delete(&self, path: &str) -> FirestoreResult<()> {
        self.record("documentDelete", json!([path]));
        Ok(())
    }

    fn document_on_snapshot(&self, path: &str, listener_id: u64, options: SnapshotListenOptions) {
        self.record("documentOnSnapshot", json!([path, listener_id, to_json(&options)]));
    }

    fn document_off_snapshot(&self, listener_id: u64) {
        self.record("documentOffSnapshot", json!([listener_id]));
    }

    async fn collection_get(
        &self,
        request: &QueryRequest,
        options: GetOptions,
    ) -> FirestoreResult<NativeQuerySnapshot> {
        self.record("collectionGet", json!([to_json(request), to_json(&options)]));
        Ok(self.query_result.lock().unwrap().clone())
    }

    fn collection_on_snapshot(
        &self,
        request: &QueryRequest,
        listener_id: u64,
        options: SnapshotListenOptions,
    ) {
        self.record(
            "collectionOnSnapshot",
            json!([to_json(request), listener_id, to_json(&options)]),
        );
    }

    fn collection_off_snapshot(&self, listener_id: u64) {
        self.record("collectionOffSnapshot", json!([listener_id]));
    }

    async fn collection_count(&self, request: &QueryRequest) -> FirestoreResult<NativeCountResult> {
        self.record("collectionCount", json!([to_json(request)]));
        let count = self.query_result.lock().unwrap().documents.len() as u64;
        Ok(NativeCountResult { count })
    }

    async fn named_query_get(
        &self,
        request: &QueryRequest,
        options: GetOptions,
    ) -> FirestoreResult<NativeQuerySnapshot> {
        self.record("namedQueryGet", json!([to_json(request), to_json(&options)]));
        Ok(self.query_result.lock().unwrap().clone())
    }

    fn named_query_on_snapshot(
        &self,
        request: &QueryRequest,
        listener_id: u64,
        options: SnapshotListenOptions,
    ) {
        self.record(
            "namedQueryOnSnapshot",
            json!([to_json(request), listener_id, to_json(&options)]),
        );
    }

    async fn document_batch(&self, writes: Vec<WriteCommand>) -> FirestoreResult<()> {
        self.record("documentBatch", json!([to_json(&writes)]));
        Ok(())
    }

    fn transaction_begin(&self, transaction_id: u64) {
        self.record("transactionBegin", json!([transaction_id]));
    }

    async fn transaction_get_document(
        &self,
        transaction_id: u64,
        path: &str,
    ) -> FirestoreResult<NativeDocumentSnapshot> {
        self.record("transactionGetDocument", json!([transaction_id, path]));
        Ok(self.document(path))
    }

    async fn transaction_apply_buffer(
        &self,
        transaction_id: u64,
        commands: Vec<WriteCommand>,
    ) -> FirestoreResult<()> {
        self.record("transactionApplyBuffer", json!([transaction_id, to_json(&commands)]));
        Ok(())
    }

    fn transaction_dispose(&self, transaction_id: u64) {
        self.record("transactionDispose", json!([transaction_id]));
    }

    async fn settings(&self, settings: NativeSettings) -> FirestoreResult<()> {
        self.record("settings", json!([to_json(&settings)]));
        Ok(())
    }
}
