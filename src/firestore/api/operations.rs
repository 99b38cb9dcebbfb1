use std::collections::BTreeMap;

use crate::firestore::api::reference::DocumentReference;
use crate::firestore::api::Firestore;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{FieldPath, IntoFieldPath};
use crate::firestore::native::{NativeSetOptions, WriteCommand};
use crate::firestore::value::FirestoreValue;

/// Merge behaviour of a `set` write.
///
/// At most one of `merge` and `merge_fields` may be given; the check runs
/// when the write is issued.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetOptions {
    pub merge: Option<bool>,
    pub merge_fields: Option<Vec<FieldPath>>,
}

impl SetOptions {
    /// Merges every field present in the written data.
    pub fn merge_all() -> Self {
        Self::merge(true)
    }

    pub fn merge(merge: bool) -> Self {
        Self {
            merge: Some(merge),
            merge_fields: None,
        }
    }

    /// Merges only the listed fields. Strings are parsed as dotted paths.
    pub fn merge_fields<I, P>(fields: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: IntoFieldPath,
    {
        let merge_fields = fields
            .into_iter()
            .map(|field| {
                field.into_field_path().map_err(|err| {
                    invalid_argument(format!("'options.mergeFields' {}", err.message()))
                })
            })
            .collect::<FirestoreResult<Vec<_>>>()?;
        Ok(Self {
            merge: None,
            merge_fields: Some(merge_fields),
        })
    }

    pub(crate) fn to_native(&self) -> FirestoreResult<NativeSetOptions> {
        if self.merge.is_some() && self.merge_fields.is_some() {
            return Err(invalid_argument(
                "'options' must not contain both 'merge' & 'mergeFields'.",
            ));
        }
        Ok(NativeSetOptions {
            merge: self.merge,
            merge_fields: self.merge_fields.as_ref().map(|fields| {
                fields.iter().map(FieldPath::canonical_string).collect()
            }),
        })
    }
}

/// Parses optional set options, prefixing errors with the calling operation.
pub(crate) fn native_set_options(
    options: Option<&SetOptions>,
    prefix: &str,
) -> FirestoreResult<NativeSetOptions> {
    match options {
        Some(options) => options.to_native().map_err(|err| err.with_prefix(prefix)),
        None => Ok(NativeSetOptions::default()),
    }
}

/// Builds buffered write commands for batches and transactions, all bound
/// to one instance.
pub(crate) struct WriteCommandBuilder<'a> {
    firestore: &'a Firestore,
    operation: &'static str,
}

impl<'a> WriteCommandBuilder<'a> {
    /// `operation` prefixes messages, e.g. `firebase.firestore().batch()`.
    pub(crate) fn new(firestore: &'a Firestore, operation: &'static str) -> Self {
        Self {
            firestore,
            operation,
        }
    }

    fn check_reference(&self, method: &str, reference: &DocumentReference) -> FirestoreResult<()> {
        if !self.firestore.is_same(reference.firestore()) {
            return Err(invalid_argument(format!(
                "{}.{method}(*) 'documentRef' provided DocumentReference is from a different Firestore instance.",
                self.operation
            )));
        }
        Ok(())
    }

    pub(crate) fn set(
        &self,
        reference: &DocumentReference,
        data: &BTreeMap<String, FirestoreValue>,
        options: Option<&SetOptions>,
    ) -> FirestoreResult<WriteCommand> {
        self.check_reference("set", reference)?;
        let prefix = format!("{}.set(_, _, *) ", self.operation);
        let options = native_set_options(options, &prefix)?;
        Ok(WriteCommand::Set {
            path: reference.path(),
            data: self.firestore.serializer().encode_map(data)?,
            options,
        })
    }

    pub(crate) fn update(
        &self,
        reference: &DocumentReference,
        data: &UpdateData,
    ) -> FirestoreResult<WriteCommand> {
        self.check_reference("update", reference)?;
        Ok(WriteCommand::Update {
            path: reference.path(),
            data: self.firestore.serializer().encode_map(data.fields())?,
        })
    }

    pub(crate) fn delete(&self, reference: &DocumentReference) -> FirestoreResult<WriteCommand> {
        self.check_reference("delete", reference)?;
        Ok(WriteCommand::Delete {
            path: reference.path(),
        })
    }
}

/// Fields written by an `update`, keyed by dotted field path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateData {
    fields: BTreeMap<String, FirestoreValue>,
}

impl UpdateData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the update from `(field, value)` pairs. `FieldPath` keys are
    /// joined with dots.
    pub fn from_pairs<I, P, V>(pairs: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = (P, V)>,
        P: IntoFieldPath,
        V: Into<FirestoreValue>,
    {
        pairs
            .into_iter()
            .enumerate()
            .try_fold(Self::new(), |data, (index, (field, value))| {
                let field = field.into_field_path().map_err(|err| {
                    invalid_argument(format!(
                        "argument at index {} must be a string or FieldPath: {}",
                        index * 2,
                        err.message()
                    ))
                })?;
                Ok(data.insert(field, value.into()))
            })
    }

    pub fn set(
        self,
        field: impl IntoFieldPath,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let field = field.into_field_path()?;
        Ok(self.insert(field, value.into()))
    }

    fn insert(mut self, field: FieldPath, value: FirestoreValue) -> Self {
        self.fields.insert(field.canonical_string(), value);
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, FirestoreValue> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<BTreeMap<String, FirestoreValue>> for UpdateData {
    fn from(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self { fields }
    }
}
