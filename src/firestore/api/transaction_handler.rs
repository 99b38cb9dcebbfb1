//! Event-driven transaction coordination.
//!
//! The engine owns the retry loop: it sends an `update` event for every
//! attempt, then either `complete` or `error`. Each transaction id moves
//! through [`TransactionState`] and is cleaned up exactly once.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::future::BoxFuture;

use crate::firestore::api::transaction::Transaction;
use crate::firestore::api::Firestore;
use crate::firestore::error::{internal_error, FirestoreError, FirestoreResult};
use crate::firestore::native::TransactionEventBody;

pub(crate) type TransactionOutput = Box<dyn Any + Send>;

pub(crate) type UpdateFunction =
    Arc<dyn Fn(Transaction) -> BoxFuture<'static, FirestoreResult<TransactionOutput>> + Send + Sync>;

pub(crate) type TransactionReceiver = oneshot::Receiver<FirestoreResult<TransactionOutput>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionState {
    PendingBegin,
    AwaitingUpdate,
    ApplyingBuffer,
    Complete,
    Errored,
}

/// What happened to a transaction, from the engine or from the update function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionInput {
    Begin,
    Update,
    Applied,
    Failed,
    Error,
    Complete,
}

impl TransactionState {
    /// Next state for `input`, or `None` when the input is ignored in this state.
    pub fn transition(self, input: TransactionInput) -> Option<TransactionState> {
        use TransactionInput as I;
        use TransactionState as S;

        match (self, input) {
            (S::PendingBegin, I::Begin) => Some(S::AwaitingUpdate),
            (S::AwaitingUpdate | S::ApplyingBuffer, I::Update) => Some(S::ApplyingBuffer),
            (S::ApplyingBuffer, I::Applied) => Some(S::AwaitingUpdate),
            (S::AwaitingUpdate | S::ApplyingBuffer, I::Complete) => Some(S::Complete),
            (S::PendingBegin | S::AwaitingUpdate | S::ApplyingBuffer, I::Error | I::Failed) => {
                Some(S::Errored)
            }
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Complete | TransactionState::Errored)
    }
}

struct PendingTransaction {
    state: TransactionState,
    update: UpdateFunction,
    transaction: Transaction,
    stack: String,
    sender: Option<oneshot::Sender<FirestoreResult<TransactionOutput>>>,
}

impl PendingTransaction {
    fn advance(&mut self, id: u64, input: TransactionInput) -> bool {
        match self.state.transition(input) {
            Some(next) => {
                self.state = next;
                true
            }
            None => {
                log::debug!(
                    "Ignoring {input:?} for transaction {id} in state {:?}",
                    self.state
                );
                false
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct TransactionHandler {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingTransaction>>,
}

impl TransactionHandler {
    /// Registers a transaction and asks the engine to start it. The receiver
    /// resolves once the engine reports `complete` or the attempt fails.
    pub(crate) fn begin(
        &self,
        firestore: &Firestore,
        update: UpdateFunction,
        stack: String,
    ) -> TransactionReceiver {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = oneshot::channel();
        let mut record = PendingTransaction {
            state: TransactionState::PendingBegin,
            update,
            transaction: Transaction::new(firestore.clone(), id),
            stack,
            sender: Some(sender),
        };
        record.advance(id, TransactionInput::Begin);
        self.pending.lock().unwrap().insert(id, record);

        firestore.native().transaction_begin(id);
        receiver
    }

    pub(crate) fn state(&self, id: u64) -> Option<TransactionState> {
        self.pending.lock().unwrap().get(&id).map(|record| record.state)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub(crate) async fn handle_event(
        &self,
        firestore: &Firestore,
        id: u64,
        body: TransactionEventBody,
    ) {
        match body {
            TransactionEventBody::Update => self.handle_update(firestore, id).await,
            TransactionEventBody::Error { error } => {
                if let Some(record) = self.settle(id, TransactionInput::Error) {
                    let err = FirestoreError::from_native(&error.code, error.message)
                        .with_stack(record.stack.clone());
                    Self::finish(firestore, id, record, Err(err));
                }
            }
            TransactionEventBody::Complete => {
                if let Some(record) = self.settle(id, TransactionInput::Complete) {
                    let result = record.transaction.take_pending_result().ok_or_else(|| {
                        internal_error(format!(
                            "Transaction {id} completed before its update function resolved"
                        ))
                    });
                    Self::finish(firestore, id, record, result);
                }
            }
        }
    }

    async fn handle_update(&self, firestore: &Firestore, id: u64) {
        let attempt = {
            let mut pending = self.pending.lock().unwrap();
            match pending.get_mut(&id) {
                Some(record) => {
                    if record.advance(id, TransactionInput::Update) {
                        record.transaction.prepare();
                        Some((record.update.clone(), record.transaction.clone()))
                    } else {
                        None
                    }
                }
                None => {
                    log::debug!("Dropping update event for unknown transaction {id}");
                    None
                }
            }
        };
        let Some((update, transaction)) = attempt else {
            return;
        };

        let output = match update(transaction.clone()).await {
            Ok(output) => output,
            Err(err) => {
                if let Some(record) = self.settle(id, TransactionInput::Failed) {
                    Self::finish(firestore, id, record, Err(err));
                }
                return;
            }
        };
        if self.state(id).is_none() {
            log::debug!("Transaction {id} settled while its update function was running");
            return;
        }
        transaction.set_pending_result(output);

        let commands = transaction.pending_writes();
        match firestore
            .native()
            .transaction_apply_buffer(id, commands)
            .await
        {
            Ok(()) => {
                if let Some(record) = self.pending.lock().unwrap().get_mut(&id) {
                    record.advance(id, TransactionInput::Applied);
                }
            }
            Err(err) => {
                if let Some(record) = self.settle(id, TransactionInput::Failed) {
                    Self::finish(firestore, id, record, Err(err));
                }
            }
        }
    }

    /// Moves the transaction into a terminal state and takes its record.
    fn settle(&self, id: u64, input: TransactionInput) -> Option<PendingTransaction> {
        let mut pending = self.pending.lock().unwrap();
        let Some(record) = pending.get_mut(&id) else {
            log::debug!("Dropping {input:?} for unknown transaction {id}");
            return None;
        };
        if !record.advance(id, input) {
            return None;
        }
        pending.remove(&id)
    }

    fn finish(
        firestore: &Firestore,
        id: u64,
        mut record: PendingTransaction,
        result: FirestoreResult<TransactionOutput>,
    ) {
        if let Some(sender) = record.sender.take() {
            // The caller may have dropped the future; nothing to deliver then.
            let _ = sender.send(result);
        }
        firestore.native().transaction_dispose(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::test_support::{firestore, NativeCall, RecordingNative};
    use futures::FutureExt;

    fn counting_update(result: u32) -> UpdateFunction {
        Arc::new(move |_transaction: Transaction| {
            async move { Ok::<_, FirestoreError>(Box::new(result) as TransactionOutput) }.boxed()
        })
    }

    #[test]
    fn transition_table() {
        use TransactionInput as I;
        use TransactionState as S;

        assert_eq!(S::PendingBegin.transition(I::Begin), Some(S::AwaitingUpdate));
        assert_eq!(S::AwaitingUpdate.transition(I::Update), Some(S::ApplyingBuffer));
        assert_eq!(S::ApplyingBuffer.transition(I::Applied), Some(S::AwaitingUpdate));
        assert_eq!(S::ApplyingBuffer.transition(I::Update), Some(S::ApplyingBuffer));
        assert_eq!(S::AwaitingUpdate.transition(I::Complete), Some(S::Complete));
        assert_eq!(S::ApplyingBuffer.transition(I::Error), Some(S::Errored));
        assert_eq!(S::PendingBegin.transition(I::Complete), None);
        assert_eq!(S::Complete.transition(I::Update), None);
        assert_eq!(S::Errored.transition(I::Error), None);
        assert!(S::Errored.is_terminal());
    }

    #[tokio::test]
    async fn update_then_complete_resolves_once() {
        let native = RecordingNative::default();
        let db = firestore(native.clone());
        let handler = TransactionHandler::default();

        let receiver = handler.begin(&db, counting_update(9), "here".into());
        assert_eq!(handler.state(0), Some(TransactionState::AwaitingUpdate));

        handler.handle_event(&db, 0, TransactionEventBody::Update).await;
        assert_eq!(handler.state(0), Some(TransactionState::AwaitingUpdate));
        handler.handle_event(&db, 0, TransactionEventBody::Complete).await;
        handler.handle_event(&db, 0, TransactionEventBody::Complete).await;

        let output = receiver.await.unwrap().unwrap();
        assert_eq!(*output.downcast::<u32>().unwrap(), 9);
        assert_eq!(handler.len(), 0);
        let disposals = native
            .calls()
            .into_iter()
            .filter(|call| matches!(call, NativeCall::TransactionDispose { .. }))
            .count();
        assert_eq!(disposals, 1);
    }

    #[tokio::test]
    async fn engine_errors_carry_the_call_site() {
        let native = RecordingNative::default();
        let db = firestore(native.clone());
        let handler = TransactionHandler::default();

        let receiver = handler.begin(&db, counting_update(1), "src/app.rs:10:5".into());
        handler
            .handle_event(
                &db,
                0,
                TransactionEventBody::Error {
                    error: crate::firestore::native::NativeErrorBody {
                        code: "aborted".into(),
                        message: "contention".into(),
                    },
                },
            )
            .await;

        let err = receiver.await.unwrap().unwrap_err();
        assert_eq!(err.code_str(), "firestore/aborted");
        assert_eq!(err.message(), "contention");
        assert_eq!(err.stack(), Some("src/app.rs:10:5"));
        assert!(native.calls().contains(&NativeCall::TransactionDispose { id: 0 }));
    }

    #[tokio::test]
    async fn failing_update_function_rejects_without_applying() {
        let native = RecordingNative::default();
        let db = firestore(native.clone());
        let handler = TransactionHandler::default();
        let update: UpdateFunction = Arc::new(|_transaction: Transaction| {
            async { Err::<TransactionOutput, _>(internal_error("nope")) }.boxed()
        });

        let receiver = handler.begin(&db, update, String::new());
        handler.handle_event(&db, 0, TransactionEventBody::Update).await;

        let err = receiver.await.unwrap().unwrap_err();
        assert_eq!(err.message(), "nope");
        assert!(!native
            .calls()
            .iter()
            .any(|call| matches!(call, NativeCall::TransactionApplyBuffer { .. })));
    }

    #[tokio::test]
    async fn events_for_unknown_ids_are_ignored() {
        let db = firestore(RecordingNative::default());
        let handler = TransactionHandler::default();
        handler.handle_event(&db, 42, TransactionEventBody::Update).await;
        handler.handle_event(&db, 42, TransactionEventBody::Complete).await;
        assert_eq!(handler.len(), 0);
    }
}
