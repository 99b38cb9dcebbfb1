use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::firestore::error::FirestoreResult;
use crate::firestore::value::{FirestoreValue, MapValue};

type Fields = BTreeMap<String, FirestoreValue>;

/// `withConverter` pair: `to_map` runs before a write is encoded and
/// `from_map` after a snapshot's fields are decoded.
///
/// Errors returned by `to_map` are reported with the calling operation's
/// prefix, e.g. `firebase.firestore().doc().set(*) 'withConverter.toFirestore' threw an error: ...`.
pub trait FirestoreDataConverter: Send + Sync + Clone + 'static {
    type Model: Clone;

    fn to_map(&self, value: &Self::Model) -> FirestoreResult<Fields>;

    fn from_map(&self, value: &MapValue) -> FirestoreResult<Self::Model>;
}

/// Hands raw field maps through untouched.
#[derive(Clone, Debug, Default)]
pub struct PassthroughConverter;

impl FirestoreDataConverter for PassthroughConverter {
    type Model = Fields;

    fn to_map(&self, value: &Self::Model) -> FirestoreResult<Fields> {
        Ok(value.clone())
    }

    fn from_map(&self, value: &MapValue) -> FirestoreResult<Self::Model> {
        Ok(value.fields().clone())
    }
}

/// Converter assembled from a `toFirestore` and a `fromFirestore` closure.
pub struct FnConverter<T> {
    to_firestore: Arc<dyn Fn(&T) -> FirestoreResult<Fields> + Send + Sync>,
    from_firestore: Arc<dyn Fn(&MapValue) -> FirestoreResult<T> + Send + Sync>,
}

impl<T> FnConverter<T> {
    pub fn new<To, From>(to_firestore: To, from_firestore: From) -> Self
    where
        To: Fn(&T) -> FirestoreResult<Fields> + Send + Sync + 'static,
        From: Fn(&MapValue) -> FirestoreResult<T> + Send + Sync + 'static,
    {
        Self {
            to_firestore: Arc::new(to_firestore),
            from_firestore: Arc::new(from_firestore),
        }
    }
}

impl<T> Clone for FnConverter<T> {
    fn clone(&self) -> Self {
        Self {
            to_firestore: Arc::clone(&self.to_firestore),
            from_firestore: Arc::clone(&self.from_firestore),
        }
    }
}

impl<T> fmt::Debug for FnConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter").finish_non_exhaustive()
    }
}

impl<T> FirestoreDataConverter for FnConverter<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Model = T;

    fn to_map(&self, value: &T) -> FirestoreResult<Fields> {
        (self.to_firestore)(value)
    }

    fn from_map(&self, value: &MapValue) -> FirestoreResult<T> {
        (self.from_firestore)(value)
    }
}
