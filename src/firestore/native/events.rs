use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::firestore::constants::{COLLECTION_SYNC_EVENT, DOCUMENT_SYNC_EVENT, TRANSACTION_EVENT};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::native::payload::{
    NativeDocumentSnapshot, NativeErrorBody, NativeQuerySnapshot,
};

/// Body of a snapshot listener event: `{snapshot}` or `{error}`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncEventBody<T> {
    Snapshot(T),
    Error(NativeErrorBody),
}

/// Body of a transaction event, discriminated by `type`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionEventBody {
    #[serde(alias = "UPDATE")]
    Update,
    #[serde(alias = "ERROR")]
    Error {
        #[serde(default)]
        error: NativeErrorBody,
    },
    #[serde(alias = "COMPLETE")]
    Complete,
}

/// An event emitted by the engine, routed by listener or transaction id.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeEvent {
    DocumentSync {
        listener_id: u64,
        body: SyncEventBody<NativeDocumentSnapshot>,
    },
    CollectionSync {
        listener_id: u64,
        body: SyncEventBody<NativeQuerySnapshot>,
    },
    Transaction {
        listener_id: u64,
        body: TransactionEventBody,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent<B> {
    listener_id: u64,
    body: B,
}

impl NativeEvent {
    /// Decodes an event delivered under `event_name` with the raw JSON payload
    /// `{listenerId, body, ...}`.
    pub fn from_json(event_name: &str, payload: JsonValue) -> FirestoreResult<Self> {
        fn parse<B: for<'de> Deserialize<'de>>(
            event_name: &str,
            payload: JsonValue,
        ) -> FirestoreResult<RawEvent<B>> {
            serde_json::from_value(payload).map_err(|err| {
                invalid_argument(format!("Malformed '{event_name}' payload: {err}"))
            })
        }

        match event_name {
            DOCUMENT_SYNC_EVENT => {
                let raw: RawEvent<SyncEventBody<NativeDocumentSnapshot>> = parse(event_name, payload)?;
                Ok(NativeEvent::DocumentSync {
                    listener_id: raw.listener_id,
                    body: raw.body,
                })
            }
            COLLECTION_SYNC_EVENT => {
                let raw: RawEvent<SyncEventBody<NativeQuerySnapshot>> = parse(event_name, payload)?;
                Ok(NativeEvent::CollectionSync {
                    listener_id: raw.listener_id,
                    body: raw.body,
                })
            }
            TRANSACTION_EVENT => {
                let raw: RawEvent<TransactionEventBody> = parse(event_name, payload)?;
                Ok(NativeEvent::Transaction {
                    listener_id: raw.listener_id,
                    body: raw.body,
                })
            }
            other => Err(invalid_argument(format!("Unknown native event '{other}'"))),
        }
    }

    pub fn listener_id(&self) -> u64 {
        match self {
            NativeEvent::DocumentSync { listener_id, .. }
            | NativeEvent::CollectionSync { listener_id, .. }
            | NativeEvent::Transaction { listener_id, .. } => *listener_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NativeEvent::DocumentSync { .. } => DOCUMENT_SYNC_EVENT,
            NativeEvent::CollectionSync { .. } => COLLECTION_SYNC_EVENT,
            NativeEvent::Transaction { .. } => TRANSACTION_EVENT,
        }
    }
}
