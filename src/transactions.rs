use std::{fs, marker::PhantomData, path::PathBuf};

/// Enum of possible operations to rollback
pub enum RollbackOperation {
    /// A directory created for the output, removed with everything below it.
    RemoveDir(PathBuf),
}
/// Active Transaction
pub struct Active;
/// Committed Transaction
pub struct Committed;
/// A trait that tells us if rollback should occur when dropped.
pub trait TransactionState {
    const SHOULD_ROLLBACK: bool;
}
impl TransactionState for Active {
    const SHOULD_ROLLBACK: bool = true;
}
impl TransactionState for Committed {
    const SHOULD_ROLLBACK: bool = false;
}
/// Tracks the directories created while writing one output file.
///
/// An [`Active`] transaction that is dropped (because the write failed and the error is
/// propagated with `?`) removes the registered directories again, so a failed render leaves
/// the filesystem as it found it. Calling [`Transaction::commit`] keeps them.
///
/// # Example
///
/// ```rust
/// use sassify::transactions::{Active, RollbackOperation, Transaction};
///
/// let mut trx = Transaction::<Active>::new();
/// trx.add_operation(RollbackOperation::RemoveDir("some/path".into()));
/// trx.commit(); // No rollback will happen
/// ```
pub struct Transaction<State: TransactionState> {
    rollback_operations: Vec<RollbackOperation>,
    state: PhantomData<State>,
}
impl Transaction<Active> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Transaction {
            rollback_operations: vec![],
            state: PhantomData,
        }
    }
    /// Registers an action to undo if the transaction is dropped without being committed.
    pub fn add_operation(&mut self, operation: RollbackOperation) {
        self.rollback_operations.push(operation);
    }
    /// Finalizes the transaction, preventing any rollback from occurring.
    pub fn commit(mut self) -> Transaction<Committed> {
        self.rollback_operations.clear();

        Transaction {
            rollback_operations: vec![],
            state: PhantomData,
        }
    }
}
impl<S: TransactionState> Drop for Transaction<S> {
    fn drop(&mut self) {
        if S::SHOULD_ROLLBACK && !self.rollback_operations.is_empty() {
            log::debug!("...rolling back created directories");
            while let Some(operation) = self.rollback_operations.pop() {
                match operation {
                    RollbackOperation::RemoveDir(path) => {
                        log::debug!("...removing dir: {}", path.display());
                        let _ = fs::remove_dir_all(&path);
                    }
                }
            }
        } else if !S::SHOULD_ROLLBACK {
            log::debug!("...committing transaction");
        }
    }
}
