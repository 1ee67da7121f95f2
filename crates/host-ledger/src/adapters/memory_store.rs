//! # In-Memory Ledger Store
//!
//! Committed state for the reference keepers. Contexts branch from the
//! latest committed version and publish their writes with [`LedgerStore::commit`].

use crate::domain::context::{Context, MultiStore, SnapshotId};
use crate::domain::entities::BlockHeader;
use crate::domain::errors::LedgerError;
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Committed {
    version: SnapshotId,
    header: BlockHeader,
    stores: MultiStore,
}

/// Versioned, in-memory committed state shared by all keepers.
#[derive(Debug, Default)]
pub struct LedgerStore {
    committed: RwLock<Committed>,
}

impl LedgerStore {
    /// Creates an empty store at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest committed version.
    #[must_use]
    pub fn version(&self) -> SnapshotId {
        self.committed.read().version
    }

    /// Header of the latest committed context.
    #[must_use]
    pub fn latest_header(&self) -> BlockHeader {
        self.committed.read().header.clone()
    }

    /// Opens a context for executing a new block on top of the latest
    /// committed state.
    #[must_use]
    pub fn begin(&self, header: BlockHeader) -> Context {
        let committed = self.committed.read();
        Context::new(header, committed.version, committed.stores.clone())
    }

    /// Opens a context over the latest committed state for reads.
    ///
    /// Writes made through it are discarded unless it is committed.
    #[must_use]
    pub fn query_context(&self) -> Context {
        let committed = self.committed.read();
        Context::new(
            committed.header.clone(),
            committed.version,
            committed.stores.clone(),
        )
    }

    /// Publishes every write made through `ctx` and returns the new version.
    ///
    /// # Errors
    ///
    /// * `Cancelled` - the context was aborted; nothing is published
    /// * `StaleSnapshot` - another context committed after `ctx` branched
    pub fn commit(&self, ctx: Context) -> Result<SnapshotId, LedgerError> {
        ctx.ensure_active()?;

        let mut committed = self.committed.write();
        if ctx.snapshot() != committed.version {
            return Err(LedgerError::StaleSnapshot {
                expected: ctx.snapshot(),
                actual: committed.version,
            });
        }

        committed.header = ctx.header().clone();
        committed.stores = ctx.into_stores();
        committed.version = SnapshotId(committed.version.0 + 1);

        debug!(
            version = %committed.version,
            height = committed.header.height,
            "ledger state committed"
        );
        Ok(committed.version)
    }
}

// =============================================================================
// TESTS
// =============================================================================
