//! # Execution Context
//!
//! Every capability operation takes an explicit [`Context`]. A context
//! carries the block header, the identity of the snapshot it branched from, a
//! cancellation token, an optional deadline, and a private write cache over
//! the per-keeper key/value stores.
//!
//! Writes are visible only through the context that made them until the
//! context is committed (see `adapters::memory_store::LedgerStore`) or
//! absorbed into its parent. Dropping a context discards its writes; a
//! cancelled context refuses further writes and cannot be committed, so none
//! of its effects are ever observable.

use crate::domain::entities::BlockHeader;
use crate::domain::errors::LedgerError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Name of a keeper's key/value store.
pub type StoreKey = &'static str;

// =============================================================================
// SNAPSHOT IDENTITY
// =============================================================================

/// Version of the committed store a context branched from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =============================================================================
// CANCELLATION
// =============================================================================

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers cancellation for every holder of the token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// KEY/VALUE STORE
// =============================================================================

/// Ordered in-memory key/value store backing one keeper.
#[derive(Clone, Debug, Default)]
pub struct KvStore(BTreeMap<Vec<u8>, Vec<u8>>);

impl KvStore {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.0.get(key).map(Vec::as_slice)
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.0.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.0.remove(key);
    }

    fn prefix_iter<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.0
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// All keeper stores, keyed by store name.
pub type MultiStore = BTreeMap<StoreKey, KvStore>;

// =============================================================================
// CONTEXT
// =============================================================================

/// Execution context threaded explicitly through every capability call.
#[derive(Debug)]
pub struct Context {
    header: BlockHeader,
    snapshot: SnapshotId,
    cancel: CancelToken,
    deadline: Option<Instant>,
    stores: MultiStore,
    /// Number of writes applied through this context.
    writes: u64,
    /// Parent's write count when this context was branched.
    branched_at: Option<u64>,
}

impl Context {
    pub(crate) fn new(header: BlockHeader, snapshot: SnapshotId, stores: MultiStore) -> Self {
        Self {
            header,
            snapshot,
            cancel: CancelToken::new(),
            deadline: None,
            stores,
            writes: 0,
            branched_at: None,
        }
    }

    pub(crate) fn into_stores(self) -> MultiStore {
        self.stores
    }

    /// Attaches a deadline after which the context counts as cancelled.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Replaces the cancellation token, e.g. to share one across contexts.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Block header this context executes in.
    #[must_use]
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Block height.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Snapshot this context (or its root ancestor) branched from.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    /// Handle that cancels this context and every branch of it.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Aborts the context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once cancelled or past the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fails with [`LedgerError::Cancelled`] if the context was aborted.
    pub fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.is_cancelled() {
            Err(LedgerError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Creates a nested context over a copy of this context's state.
    ///
    /// The branch shares cancellation and deadline with its parent. Apply its
    /// writes with [`Context::absorb`] or drop it to discard them.
    #[must_use]
    pub fn branch(&self) -> Self {
        Self {
            header: self.header.clone(),
            snapshot: self.snapshot,
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            stores: self.stores.clone(),
            writes: 0,
            branched_at: Some(self.writes),
        }
    }

    /// Writes a branch's effects into this context.
    ///
    /// Fails if the branch was cancelled, or if this context was written to
    /// after the branch was taken (the branch would overwrite those writes).
    pub fn absorb(&mut self, child: Self) -> Result<(), LedgerError> {
        child.ensure_active()?;
        if child.branched_at != Some(self.writes) {
            return Err(LedgerError::StaleSnapshot {
                expected: SnapshotId(child.branched_at.unwrap_or_default()),
                actual: SnapshotId(self.writes),
            });
        }
        if child.writes > 0 {
            self.stores = child.stores;
            self.writes += child.writes;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Raw store access
    // -------------------------------------------------------------------------

    /// Reads a raw value.
    #[must_use]
    pub fn get(&self, store: StoreKey, key: &[u8]) -> Option<&[u8]> {
        self.stores.get(store).and_then(|s| s.get(key))
    }

    /// Writes a raw value.
    pub fn set(&mut self, store: StoreKey, key: Vec<u8>, value: Vec<u8>) -> Result<(), LedgerError> {
        self.ensure_active()?;
        self.stores.entry(store).or_default().set(key, value);
        self.writes += 1;
        Ok(())
    }

    /// Deletes a raw value. Deleting an absent key is a no-op write.
    pub fn delete(&mut self, store: StoreKey, key: &[u8]) -> Result<(), LedgerError> {
        self.ensure_active()?;
        if let Some(s) = self.stores.get_mut(store) {
            s.delete(key);
        }
        self.writes += 1;
        Ok(())
    }

    /// Iterates entries under a key prefix in ascending key order.
    pub fn prefix_iter<'a>(
        &'a self,
        store: StoreKey,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.stores
            .get(store)
            .into_iter()
            .flat_map(move |s| s.prefix_iter(prefix))
    }

    // -------------------------------------------------------------------------
    // Typed access (bincode)
    // -------------------------------------------------------------------------

    /// Reads and decodes a record.
    pub fn get_record<T: DeserializeOwned>(
        &self,
        store: StoreKey,
        key: &[u8],
    ) -> Result<Option<T>, LedgerError> {
        self.get(store, key)
            .map(|bytes| bincode::deserialize(bytes).map_err(LedgerError::from))
            .transpose()
    }

    /// Encodes and writes a record.
    pub fn set_record<T: Serialize>(
        &mut self,
        store: StoreKey,
        key: Vec<u8>,
        record: &T,
    ) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(record)?;
        self.set(store, key, bytes)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const STORE: StoreKey = "test";

    fn ctx() -> Context {
        Context::new(BlockHeader::default(), SnapshotId(0), MultiStore::new())
    }

    #[test]
    fn test_branch_discarded_on_drop() {
        let mut root = ctx();
        root.set(STORE, b"a".to_vec(), b"1".to_vec()).unwrap();

        {
            let mut child = root.branch();
            child.set(STORE, b"a".to_vec(), b"2".to_vec()).unwrap();
            assert_eq!(child.get(STORE, b"a"), Some(&b"2"[..]));
        }

        assert_eq!(root.get(STORE, b"a"), Some(&b"1"[..]));
    }

    #[test]
    fn test_absorb_applies_child_writes() {
        let mut root = ctx();
        let mut child = root.branch();
        child.set(STORE, b"k".to_vec(), b"v".to_vec()).unwrap();
        root.absorb(child).unwrap();
        assert_eq!(root.get(STORE, b"k"), Some(&b"v"[..]));
    }

    #[test]
    fn test_absorb_rejects_stale_branch() {
        let mut root = ctx();
        let mut child = root.branch();
        child.set(STORE, b"k".to_vec(), b"child".to_vec()).unwrap();
        root.set(STORE, b"other".to_vec(), b"parent".to_vec()).unwrap();

        let err = root.absorb(child).unwrap_err();
        assert!(matches!(err, LedgerError::StaleSnapshot { .. }));
        assert_eq!(root.get(STORE, b"k"), None);
    }

    #[test]
    fn test_cancelled_context_refuses_writes() {
        let mut root = ctx();
        let child = root.branch();
        root.cancel();

        assert!(child.is_cancelled());
        assert_eq!(
            root.set(STORE, b"k".to_vec(), vec![]),
            Err(LedgerError::Cancelled)
        );
        assert_eq!(root.absorb(child), Err(LedgerError::Cancelled));
    }

    #[test]
    fn test_deadline_counts_as_cancelled() {
        let expired = ctx().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(expired.is_cancelled());

        let live = ctx().with_deadline(Instant::now() + Duration::from_secs(60));
        assert!(live.ensure_active().is_ok());
    }

    #[test]
    fn test_prefix_iter_is_ordered_and_bounded() {
        let mut root = ctx();
        for key in [&b"a/2"[..], b"a/1", b"b/1", b"a/3"] {
            root.set(STORE, key.to_vec(), vec![]).unwrap();
        }
        let keys: Vec<&[u8]> = root.prefix_iter(STORE, b"a/").map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&b"a/1"[..], b"a/2", b"a/3"]);
    }
}
