use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use crate::firestore::api::converter::FirestoreDataConverter;
use crate::firestore::api::operations::{SetOptions, UpdateData, WriteCommandBuilder};
use crate::firestore::api::reference::DocumentReference;
use crate::firestore::api::Firestore;
use crate::firestore::error::{failed_precondition, invalid_argument, FirestoreResult};
use crate::firestore::native::WriteCommand;
use crate::firestore::value::FirestoreValue;

const OPERATION: &str = "firebase.firestore().batch()";

/// Buffers writes and commits them atomically in a single engine call.
///
/// A batch can be committed once; afterwards every method fails.
pub struct WriteBatch {
    firestore: Firestore,
    commands: Vec<WriteCommand>,
    committed: bool,
}

impl WriteBatch {
    pub(crate) fn new(firestore: Firestore) -> Self {
        Self {
            firestore,
            commands: Vec::new(),
            committed: false,
        }
    }

    pub fn set(
        &mut self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
        options: Option<SetOptions>,
    ) -> FirestoreResult<&mut Self> {
        self.ensure_open("set")?;
        let command = self.builder().set(reference, &data, options.as_ref())?;
        self.commands.push(command);
        Ok(self)
    }

    pub fn set_with_converter<C>(
        &mut self,
        reference: &DocumentReference,
        converter: &C,
        value: &C::Model,
        options: Option<SetOptions>,
    ) -> FirestoreResult<&mut Self>
    where
        C: FirestoreDataConverter,
    {
        let data = converter.to_map(value)?;
        self.set(reference, data, options)
    }

    pub fn update(
        &mut self,
        reference: &DocumentReference,
        data: UpdateData,
    ) -> FirestoreResult<&mut Self> {
        self.ensure_open("update")?;
        let command = self.builder().update(reference, &data)?;
        self.commands.push(command);
        Ok(self)
    }

    pub fn delete(&mut self, reference: &DocumentReference) -> FirestoreResult<&mut Self> {
        self.ensure_open("delete")?;
        let command = self.builder().delete(reference)?;
        self.commands.push(command);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Marks the batch committed and sends its writes. The state change
    /// happens when `commit` is called; an empty batch resolves without
    /// reaching the engine.
    pub fn commit(&mut self) -> impl Future<Output = FirestoreResult<()>> + Send + 'static {
        let pending = if self.committed {
            Err(failed_precondition(format!(
                "{OPERATION}.commit() A write batch can no longer be used after commit() has been called. The batch has already committed."
            )))
        } else {
            self.committed = true;
            Ok(std::mem::take(&mut self.commands))
        };
        let native = self.firestore.native().clone();

        async move {
            let commands = pending?;
            if commands.is_empty() {
                return Ok(());
            }
            native.document_batch(commands).await
        }
    }

    fn ensure_open(&self, method: &str) -> FirestoreResult<()> {
        if self.committed {
            return Err(invalid_argument(format!(
                "{OPERATION}.{method}() A write batch can no longer be used after commit() has been called."
            )));
        }
        Ok(())
    }

    fn builder(&self) -> WriteCommandBuilder<'_> {
        WriteCommandBuilder::new(&self.firestore, OPERATION)
    }
}

impl fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatch")
            .field("commands", &self.commands)
            .field("committed", &self.committed)
            .finish()
    }
}
