//! Boundary with the storage engine: the tagged value codec, payload shapes
//! and the [`NativeFirestore`] trait through which every terminal operation
//! is dispatched.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::firestore::api::query_modifiers::{FilterDef, OrderDef, QueryOptions, QueryType};
use crate::firestore::error::FirestoreResult;

pub mod events;
pub mod payload;
pub mod serializer;
pub mod type_map;

pub use events::{NativeEvent, SyncEventBody, TransactionEventBody};
pub use payload::{
    GetOptions, NativeChangeType, NativeCountResult, NativeDocumentChange, NativeDocumentSnapshot,
    NativeErrorBody, NativeMetadata, NativeQuerySnapshot, NativeSetOptions, NativeSettings,
    SnapshotListenOptions, Source, WriteCommand,
};
pub use serializer::{NativeSerializer, MAX_SAFE_INTEGER};
pub use type_map::{TypeTag, WireFieldValue, WireFormatError, WireValue};

/// Everything an engine needs to run a query: the collection path (or the
/// bundle query name), the query type and the encoded modifiers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub path: String,
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub filters: Vec<FilterDef>,
    pub orders: Vec<OrderDef>,
    pub options: QueryOptions,
}

/// Storage engine reached through the bridge.
///
/// Method names follow the bridge protocol (`documentGet` becomes
/// [`document_get`](NativeFirestore::document_get), and so on). Subscription
/// and transaction bookkeeping calls are fire and forget.
#[async_trait]
pub trait NativeFirestore: Send + Sync + 'static {
    async fn document_get(
        &self,
        path: &str,
        options: GetOptions,
    ) -> FirestoreResult<NativeDocumentSnapshot>;

    async fn document_set(
        &self,
        path: &str,
        data: BTreeMap<String, WireValue>,
        options: NativeSetOptions,
    ) -> FirestoreResult<()>;

    async fn document_update(
        &self,
        path: &str,
        data: BTreeMap<String, WireValue>,
    ) -> FirestoreResult<()>;

    async fn document_delete(&self, path: &str) -> FirestoreResult<()>;

    fn document_on_snapshot(&self, path: &str, listener_id: u64, options: SnapshotListenOptions);

    fn document_off_snapshot(&self, listener_id: u64);

    async fn collection_get(
        &self,
        request: &QueryRequest,
        options: GetOptions,
    ) -> FirestoreResult<NativeQuerySnapshot>;

    fn collection_on_snapshot(
        &self,
        request: &QueryRequest,
        listener_id: u64,
        options: SnapshotListenOptions,
    );

    fn collection_off_snapshot(&self, listener_id: u64);

    async fn collection_count(&self, request: &QueryRequest) -> FirestoreResult<NativeCountResult>;

    async fn named_query_get(
        &self,
        request: &QueryRequest,
        options: GetOptions,
    ) -> FirestoreResult<NativeQuerySnapshot>;

    fn named_query_on_snapshot(
        &self,
        request: &QueryRequest,
        listener_id: u64,
        options: SnapshotListenOptions,
    );

    async fn document_batch(&self, writes: Vec<WriteCommand>) -> FirestoreResult<()>;

    fn transaction_begin(&self, transaction_id: u64);

    async fn transaction_get_document(
        &self,
        transaction_id: u64,
        path: &str,
    ) -> FirestoreResult<NativeDocumentSnapshot>;

    async fn transaction_apply_buffer(
        &self,
        transaction_id: u64,
        commands: Vec<WriteCommand>,
    ) -> FirestoreResult<()>;

    fn transaction_dispose(&self, transaction_id: u64);

    async fn settings(&self, settings: NativeSettings) -> FirestoreResult<()>;

    async fn load_bundle(&self, _bundle: &str) -> FirestoreResult<()> {
        Ok(())
    }

    async fn clear_persistence(&self) -> FirestoreResult<()> {
        Ok(())
    }

    async fn wait_for_pending_writes(&self) -> FirestoreResult<()> {
        Ok(())
    }

    async fn terminate(&self) -> FirestoreResult<()> {
        Ok(())
    }

    async fn disable_network(&self) -> FirestoreResult<()> {
        Ok(())
    }

    async fn enable_network(&self) -> FirestoreResult<()> {
        Ok(())
    }

    fn use_emulator(&self, _host: &str, _port: u16) {}
}
