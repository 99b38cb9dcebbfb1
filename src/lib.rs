//! Client-side Firestore core for native bridge engines.
//!
//! The crate builds and validates Firestore queries, documents, batched
//! writes and transactions, encodes values into the tagged wire format the
//! engine understands, and routes the events the engine emits back to
//! snapshot listeners and pending transactions. Everything that touches
//! storage or the network goes through the [`NativeFirestore`] trait.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use firestore_bridge::firestore::{Firestore, FirestoreResult, GetOptions, NativeFirestore};
//!
//! async fn adults(engine: Arc<dyn NativeFirestore>) -> FirestoreResult<usize> {
//!     let db = Firestore::builder(engine).build()?;
//!     let snapshot = db
//!         .collection("users")?
//!         .where_field("age", ">=", 18)?
//!         .order_by("age", "asc")?
//!         .limit(10)?
//!         .get(GetOptions::default())
//!         .await?;
//!     Ok(snapshot.size())
//! }
//! ```
//!
//! [`NativeFirestore`]: firestore::NativeFirestore

pub mod firestore;
pub mod util;
