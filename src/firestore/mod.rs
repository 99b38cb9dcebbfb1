pub mod api;
pub mod constants;
pub mod error;
pub mod model;
pub mod native;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{
    AggregateQuery, AggregateQuerySnapshot, CollectionReference, DocumentChange,
    DocumentChangeType, DocumentReference, DocumentSnapshot, Filter, FilterOperator, Firestore,
    FirestoreBuilder, FirestoreDataConverter, FirestoreSettings, FnConverter, GetOptions,
    ListenerRegistration, OrderDirection, PassthroughConverter, Query, QueryCursor, QuerySnapshot,
    ServerTimestampBehavior, SetOptions, SnapshotHandler, SnapshotListenOptions, SnapshotMetadata,
    Source, Transaction, TransactionState, UpdateData, WriteBatch,
};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{FieldPath, GeoPoint, ResourcePath, Timestamp, VectorValue};
pub use native::{NativeEvent, NativeFirestore};
pub use value::{BytesValue, FirestoreValue, ValueKind};
