mod aggregate;
mod converter;
mod database;
mod filter;
pub(crate) mod listener;
pub(crate) mod operations;
mod query;
pub mod query_modifiers;
mod reference;
mod snapshot;
mod transaction;
mod transaction_handler;
mod write_batch;

pub use aggregate::{AggregateQuery, AggregateQuerySnapshot};
pub use converter::{FirestoreDataConverter, FnConverter, PassthroughConverter};
pub use database::{Firestore, FirestoreBuilder, FirestoreSettings, ServerTimestampBehavior};
pub use filter::Filter;
pub use listener::{ListenerRegistration, SnapshotCallback, SnapshotHandler};
pub use operations::{SetOptions, UpdateData};
pub use query::{Query, QueryCursor};
pub use query_modifiers::{
    FilterOperator, IntoFilterOperator, IntoOrderDirection, OrderDirection, QueryModifiers,
};
pub use reference::{CollectionReference, DocumentReference};
pub use snapshot::{DocumentChange, DocumentChangeType, DocumentSnapshot, QuerySnapshot, SnapshotMetadata};
pub use transaction::Transaction;
pub use transaction_handler::{TransactionInput, TransactionState};
pub use write_batch::WriteBatch;

pub use crate::firestore::native::{GetOptions, SnapshotListenOptions, Source};
