pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";
pub const DEFAULT_DATABASE_ID: &str = "(default)";

pub const DOCUMENT_SYNC_EVENT: &str = "firestore_document_sync_event";
pub const COLLECTION_SYNC_EVENT: &str = "firestore_collection_sync_event";
pub const TRANSACTION_EVENT: &str = "firestore_transaction_event";

/// Reserved field name addressing the document identifier.
pub const DOCUMENT_ID_FIELD: &str = "__name__";

/// Largest array accepted by `in`, `not-in` and `array-contains-any` in `where`.
pub const MAX_WHERE_IN_VALUES: usize = 30;
/// Largest array accepted by the same operators inside a `Filter`.
pub const MAX_FILTER_IN_VALUES: usize = 10;
pub const MAX_COMPOSITE_FILTERS: usize = 10;

pub const CACHE_SIZE_UNLIMITED: i64 = -1;
pub const MIN_CACHE_SIZE_BYTES: i64 = 1_048_576;

pub const AUTO_ID_LENGTH: usize = 20;
