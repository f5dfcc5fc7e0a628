//! # Versioned Document Store
//!
//! The persistence boundary for workflow documents. Every stored record
//! carries a monotonically increasing version; conditional updates fail with
//! [`StorageError::VersionConflict`] when the stored version is not the one
//! the caller read, which the engine surfaces as a stale-state error.
//!
//! ## Design
//!
//! All operations are synchronous (`parking_lot`, not `tokio::sync`) — locks
//! are never held across `.await` points, and `parking_lot` locks do not
//! poison on panic. The read-validate-mutate closure in
//! [`Collection::try_update`] runs under a single write lock, so there is no
//! TOCTOU window between the version check and the write. Closures mutate a
//! clone of the record; a closure error leaves the stored record and its
//! version untouched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use uds_core::StorageError;
use uds_state::{
    EntityKind, GrnRecord, InvoiceRecord, PoRecord, PrRecord, ShipmentRecord,
};

// ---------------------------------------------------------------------------
// Versioned
// ---------------------------------------------------------------------------

/// A stored record together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Incremented on every successful update. Starts at 1 on create.
    pub version: u64,
    /// The record itself.
    pub record: T,
}

impl<T> Versioned<T> {
    /// Wrap a freshly created record at version 1.
    pub fn new(record: T) -> Self {
        Self { version: 1, record }
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Thread-safe, cloneable in-memory collection of versioned documents,
/// keyed by document number.
#[derive(Debug)]
pub struct Collection<T: Clone + Send + Sync> {
    kind: EntityKind,
    data: Arc<RwLock<HashMap<String, Versioned<T>>>>,
}

impl<T: Clone + Send + Sync> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Collection<T> {
    /// Create an empty collection for one document kind.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The document kind this collection stores.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Insert a new document at version 1. Fails if the key is taken.
    pub fn insert_new(&self, id: impl Into<String>, record: T) -> Result<(), StorageError> {
        let id = id.into();
        let mut guard = self.data.write();
        if guard.contains_key(&id) {
            return Err(StorageError::AlreadyExists {
                kind: self.kind.to_string(),
                id,
            });
        }
        guard.insert(id, Versioned::new(record));
        Ok(())
    }

    /// Retrieve a document and its version.
    pub fn get(&self, id: &str) -> Option<Versioned<T>> {
        self.data.read().get(id).cloned()
    }

    /// Retrieve a document, or a `NotFound` storage error.
    pub fn require(&self, id: &str) -> Result<Versioned<T>, StorageError> {
        self.get(id).ok_or_else(|| StorageError::NotFound {
            kind: self.kind.to_string(),
            id: id.to_string(),
        })
    }

    /// List all documents.
    pub fn list(&self) -> Vec<Versioned<T>> {
        self.data.read().values().cloned().collect()
    }

    /// Whether a document exists.
    pub fn contains(&self, id: &str) -> bool {
        self.data.read().contains_key(id)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically read-validate-mutate one document under a version guard.
    ///
    /// The closure receives a mutable clone of the record; on `Ok` the clone
    /// replaces the stored record and the version is bumped, on `Err`
    /// nothing is written. Missing documents and version mismatches come
    /// back as storage errors converted into `E`.
    pub fn try_update<R, E: From<StorageError>>(
        &self,
        id: &str,
        expected_version: u64,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id).ok_or_else(|| StorageError::NotFound {
            kind: self.kind.to_string(),
            id: id.to_string(),
        })?;
        if entry.version != expected_version {
            return Err(StorageError::VersionConflict {
                kind: self.kind.to_string(),
                id: id.to_string(),
                expected: expected_version,
                found: entry.version,
            }
            .into());
        }
        let mut candidate = entry.record.clone();
        let out = f(&mut candidate)?;
        entry.record = candidate;
        entry.version += 1;
        Ok(out)
    }

    /// Mutate a document unconditionally, bumping its version. Used by the
    /// integrity repairer, which operates on drifted data where version
    /// fencing is meaningless.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut T)) -> Option<Versioned<T>> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        f(&mut entry.record);
        entry.version += 1;
        Some(entry.clone())
    }

    /// Remove a document.
    pub fn remove(&self, id: &str) -> Option<Versioned<T>> {
        self.data.write().remove(id)
    }
}

// ---------------------------------------------------------------------------
// WorkflowStore
// ---------------------------------------------------------------------------

/// The document store the workflow engine runs against.
///
/// One collection per entity kind, plus the one multi-document primitive the
/// engine needs: PO creation must link every source PR and write the PO as a
/// single atomic step, or do nothing at all.
pub trait WorkflowStore: Send + Sync {
    /// Purchase requisitions.
    fn prs(&self) -> &Collection<PrRecord>;
    /// Purchase orders.
    fn pos(&self) -> &Collection<PoRecord>;
    /// Shipments.
    fn shipments(&self) -> &Collection<ShipmentRecord>;
    /// Goods receipt notes.
    fn grns(&self) -> &Collection<GrnRecord>;
    /// Invoices.
    fn invoices(&self) -> &Collection<InvoiceRecord>;

    /// Atomically create `po` and flip every PR in `linked` to its linked
    /// state, fencing each PR on the version the caller read.
    ///
    /// On any error — a duplicate PO number, a missing PR, a version
    /// conflict — no document is written. The supplied PR records must
    /// already carry their post-link state (status, `po_number`); the store
    /// validates versions, not workflow rules.
    fn create_po_linking(
        &self,
        po: PoRecord,
        linked: Vec<(PrRecord, u64)>,
    ) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// InMemoryWorkflowStore
// ---------------------------------------------------------------------------

/// The in-memory store. Backs tests, fixtures, and the offline audit CLI.
#[derive(Debug, Clone)]
pub struct InMemoryWorkflowStore {
    prs: Collection<PrRecord>,
    pos: Collection<PoRecord>,
    shipments: Collection<ShipmentRecord>,
    grns: Collection<GrnRecord>,
    invoices: Collection<InvoiceRecord>,
}

impl InMemoryWorkflowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            prs: Collection::new(EntityKind::Pr),
            pos: Collection::new(EntityKind::Po),
            shipments: Collection::new(EntityKind::Shipment),
            grns: Collection::new(EntityKind::Grn),
            invoices: Collection::new(EntityKind::Invoice),
        }
    }
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn prs(&self) -> &Collection<PrRecord> {
        &self.prs
    }

    fn pos(&self) -> &Collection<PoRecord> {
        &self.pos
    }

    fn shipments(&self) -> &Collection<ShipmentRecord> {
        &self.shipments
    }

    fn grns(&self) -> &Collection<GrnRecord> {
        &self.grns
    }

    fn invoices(&self) -> &Collection<InvoiceRecord> {
        &self.invoices
    }

    fn create_po_linking(
        &self,
        po: PoRecord,
        linked: Vec<(PrRecord, u64)>,
    ) -> Result<(), StorageError> {
        // Lock order: POs before PRs, everywhere a path takes both.
        let mut pos = self.pos.data.write();
        let mut prs = self.prs.data.write();

        let po_id = po.po_number.as_str().to_string();
        if pos.contains_key(&po_id) {
            return Err(StorageError::AlreadyExists {
                kind: EntityKind::Po.to_string(),
                id: po_id,
            });
        }

        // Validate every PR version before writing anything.
        for (pr, expected) in &linked {
            let id = pr.pr_number.as_str();
            let entry = prs.get(id).ok_or_else(|| StorageError::NotFound {
                kind: EntityKind::Pr.to_string(),
                id: id.to_string(),
            })?;
            if entry.version != *expected {
                return Err(StorageError::VersionConflict {
                    kind: EntityKind::Pr.to_string(),
                    id: id.to_string(),
                    expected: *expected,
                    found: entry.version,
                });
            }
        }

        pos.insert(po_id, Versioned::new(po));
        for (pr, expected) in linked {
            let id = pr.pr_number.as_str().to_string();
            prs.insert(
                id,
                Versioned {
                    version: expected + 1,
                    record: pr,
                },
            );
        }
        Ok(())
    }
}
