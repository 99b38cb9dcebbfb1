use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::firestore::api::converter::FirestoreDataConverter;
use crate::firestore::api::operations::{SetOptions, UpdateData, WriteCommandBuilder};
use crate::firestore::api::reference::DocumentReference;
use crate::firestore::api::snapshot::DocumentSnapshot;
use crate::firestore::api::Firestore;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::native::WriteCommand;
use crate::firestore::value::FirestoreValue;

const OPERATION: &str = "firebase.firestore().runTransaction() Transaction";

/// Handle passed to the `run_transaction` update function.
///
/// Reads go straight to the engine; writes are buffered and sent as one
/// `transaction_apply_buffer` call once the update function resolves. The
/// buffer is cleared before every attempt, so a retried attempt never sees
/// writes from the previous one.
#[derive(Clone)]
pub struct Transaction {
    firestore: Firestore,
    id: u64,
    buffer: Arc<Mutex<TransactionBuffer>>,
}

#[derive(Default)]
struct TransactionBuffer {
    commands: Vec<WriteCommand>,
    called_get_count: usize,
    pending_result: Option<Box<dyn Any + Send>>,
}

impl Transaction {
    pub(crate) fn new(firestore: Firestore, id: u64) -> Self {
        Self {
            firestore,
            id,
            buffer: Arc::new(Mutex::new(TransactionBuffer::default())),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn get(&self, reference: &DocumentReference) -> FirestoreResult<DocumentSnapshot> {
        if !self.firestore.is_same(reference.firestore()) {
            return Err(invalid_argument(format!(
                "{OPERATION}.get(*) 'documentRef' provided DocumentReference is from a different Firestore instance."
            )));
        }
        self.buffer.lock().unwrap().called_get_count += 1;
        let snapshot = self
            .firestore
            .native()
            .transaction_get_document(self.id, &reference.path())
            .await?;
        DocumentSnapshot::from_native(&self.firestore, snapshot)
    }

    pub fn set(
        &self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
        options: Option<SetOptions>,
    ) -> FirestoreResult<&Self> {
        let command = self.builder().set(reference, &data, options.as_ref())?;
        self.push(command)
    }

    pub fn set_with_converter<C>(
        &self,
        reference: &DocumentReference,
        converter: &C,
        value: &C::Model,
        options: Option<SetOptions>,
    ) -> FirestoreResult<&Self>
    where
        C: FirestoreDataConverter,
    {
        let data = converter.to_map(value).map_err(|err| {
            invalid_argument(format!(
                "{OPERATION}.set(_, *) 'withConverter.toFirestore' threw an error: {}.",
                err.message()
            ))
        })?;
        self.set(reference, data, options)
    }

    pub fn update(&self, reference: &DocumentReference, data: UpdateData) -> FirestoreResult<&Self> {
        let command = self.builder().update(reference, &data)?;
        self.push(command)
    }

    pub fn delete(&self, reference: &DocumentReference) -> FirestoreResult<&Self> {
        let command = self.builder().delete(reference)?;
        self.push(command)
    }

    /// Reads issued during the current attempt.
    pub fn called_get_count(&self) -> usize {
        self.buffer.lock().unwrap().called_get_count
    }

    /// Writes buffered during the current attempt.
    pub fn pending_writes(&self) -> Vec<WriteCommand> {
        self.buffer.lock().unwrap().commands.clone()
    }

    /// Resets the buffer ahead of a new attempt.
    pub(crate) fn prepare(&self) {
        *self.buffer.lock().unwrap() = TransactionBuffer::default();
    }

    pub(crate) fn set_pending_result(&self, result: Box<dyn Any + Send>) {
        self.buffer.lock().unwrap().pending_result = Some(result);
    }

    pub(crate) fn take_pending_result(&self) -> Option<Box<dyn Any + Send>> {
        self.buffer.lock().unwrap().pending_result.take()
    }

    fn push(&self, command: WriteCommand) -> FirestoreResult<&Self> {
        self.buffer.lock().unwrap().commands.push(command);
        Ok(self)
    }

    fn builder(&self) -> WriteCommandBuilder<'_> {
        WriteCommandBuilder::new(&self.firestore, OPERATION)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.buffer.lock().unwrap();
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("commands", &buffer.commands)
            .field("called_get_count", &buffer.called_get_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::test_support::{firestore, firestore_for_app, RecordingNative};

    #[tokio::test]
    async fn buffers_writes_and_counts_reads() {
        let native = RecordingNative::default();
        let db = firestore(native.clone());
        let alice = db.doc("users/alice").unwrap();
        let transaction = Transaction::new(db.clone(), 7);

        let snapshot = transaction.get(&alice).await.unwrap();
        assert!(!snapshot.exists());
        assert_eq!(transaction.called_get_count(), 1);

        transaction
            .set(&alice, BTreeMap::new(), None)
            .unwrap()
            .update(&alice, UpdateData::new().set("age", 3).unwrap())
            .unwrap()
            .delete(&alice)
            .unwrap();
        let writes = transaction.pending_writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[2], WriteCommand::Delete { path: "users/alice".into() });

        transaction.set_pending_result(Box::new(5_u32));
        transaction.prepare();
        assert!(transaction.pending_writes().is_empty());
        assert_eq!(transaction.called_get_count(), 0);
        assert!(transaction.take_pending_result().is_none());
    }

    #[test]
    fn rejects_documents_from_other_instances() {
        let db = firestore(RecordingNative::default());
        let other = firestore_for_app(RecordingNative::default(), "secondary");
        let transaction = Transaction::new(db, 1);
        let err = transaction
            .set(&other.doc("users/alice").unwrap(), BTreeMap::new(), None)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "firebase.firestore().runTransaction() Transaction.set(*) 'documentRef' provided DocumentReference is from a different Firestore instance."
        );
        assert!(transaction.pending_writes().is_empty());
    }
}
