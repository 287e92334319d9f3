//! The editing session: one in-memory chain plus the summaries list.
//!
//! An [`EditorSession`] owns the tree being edited and talks to storage only
//! through a [`ChainStore`] handed in per call. Edits never touch storage;
//! [`EditorSession::save`] reconciles the whole tree at once.

pub mod export;
pub mod state;
pub mod sync;

pub use export::{ExportError, ExportFormat};
pub use state::SessionState;

use crate::db::gateway::{ChainDetails, ChainStore, NewChain, StoredChain, SyncPlan};
use crate::error::{ErrorCode, StoreError};
use crate::model::{Chain, DocumentInfo, LocalId, Node, PositionOverflow, Row};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Revision shown for documents stored without one.
pub const DEFAULT_REVISION: &str = "01";

/// Errors raised by [`EditorSession`] operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no chain is loaded")]
    NoChain,

    #[error("row {0} not found in the current chain")]
    RowNotFound(LocalId),

    #[error("node {0} not found in the current chain")]
    NodeNotFound(LocalId),

    #[error(transparent)]
    Position(#[from] PositionOverflow),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EditorError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoChain => ErrorCode::NoChainLoaded,
            Self::RowNotFound(_) => ErrorCode::RowNotFound,
            Self::NodeNotFound(_) => ErrorCode::NodeNotFound,
            Self::Position(_) => ErrorCode::PositionExhausted,
            Self::Export(ExportError::UnknownFormat(_)) => ErrorCode::InvalidInput,
            Self::Export(_) => ErrorCode::ExportFailed,
            Self::Store(err) => err.code(),
        }
    }
}

/// List entry for a stored chain; rows and nodes are not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainSummary {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub document: DocumentInfo,
    pub created_at_us: i64,
}

impl From<StoredChain> for ChainSummary {
    fn from(stored: StoredChain) -> Self {
        let mut document = stored.document.info;
        if document.revision.trim().is_empty() {
            document.revision = DEFAULT_REVISION.to_string();
        }
        Self {
            id: stored.value_chain.id,
            name: stored.value_chain.name,
            title: stored.value_chain.title,
            document,
            created_at_us: stored.value_chain.created_at_us,
        }
    }
}

/// What a successful [`EditorSession::save`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub chain_id: i64,
    /// `true` when the chain itself was inserted by this save.
    pub created: bool,
    pub rows_created: usize,
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub rows_deleted: usize,
    pub nodes_deleted: usize,
}

impl SaveReport {
    fn from_plan(chain_id: i64, created: bool, plan: &SyncPlan) -> Self {
        Self {
            chain_id,
            created,
            rows_created: plan.create_rows.len(),
            nodes_created: plan.created_node_count(),
            nodes_updated: plan.update_nodes.len(),
            rows_deleted: plan.delete_rows.len(),
            nodes_deleted: plan.delete_nodes.len(),
        }
    }

    /// `true` when the save wrote nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        !self.created
            && self.rows_created == 0
            && self.nodes_created == 0
            && self.nodes_updated == 0
            && self.rows_deleted == 0
            && self.nodes_deleted == 0
    }
}

/// Single-user editing session.
#[derive(Debug, Clone)]
pub struct EditorSession {
    state: SessionState,
    current: Option<Chain>,
    summaries: Vec<ChainSummary>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Unloaded,
            current: None,
            summaries: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn current(&self) -> Option<&Chain> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn summaries(&self) -> &[ChainSummary] {
        &self.summaries
    }

    /// `true` when the current chain has edits not yet saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state == SessionState::Editing
    }

    /// Refresh the summaries list from storage.
    ///
    /// # Errors
    ///
    /// The store error. The previous list is kept on failure.
    pub fn load_list<S: ChainStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<&[ChainSummary], EditorError> {
        let prior = self.begin(SessionState::Loading)?;
        match store.list_chains() {
            Ok(chains) => {
                self.summaries = chains.into_iter().map(ChainSummary::from).collect();
                self.state = prior;
                debug!(count = self.summaries.len(), "loaded chain list");
                Ok(self.summaries.as_slice())
            }
            Err(err) => Err(self.fail(prior, err)),
        }
    }

    /// Hydrate chain `id` into the session, replacing the current tree.
    ///
    /// # Errors
    ///
    /// The store error. The previous tree is kept on failure.
    pub fn load_details<S: ChainStore + ?Sized>(
        &mut self,
        store: &S,
        id: i64,
    ) -> Result<&Chain, EditorError> {
        let prior = self.begin(SessionState::Loading)?;
        match store.get_chain_details(id) {
            Ok(details) => {
                if prior == SessionState::Editing {
                    warn!(chain_id = id, "discarding unsaved edits");
                }
                self.state = SessionState::Ready;
                debug!(chain_id = id, rows = details.rows.len(), "hydrated chain");
                Ok(&*self.current.insert(hydrate(details)))
            }
            Err(err) => Err(self.fail(prior, err)),
        }
    }

    /// Start a draft chain: title is the uppercased name, one row of
    /// `node_count` empty nodes. Nothing is stored until [`Self::save`].
    pub fn new_chain(
        &mut self,
        name: impl Into<String>,
        document: DocumentInfo,
        node_count: usize,
    ) -> &Chain {
        self.state = SessionState::Editing;
        self.current.insert(Chain::draft(name, document, node_count))
    }

    /// Append a row holding one empty node.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoChain`], or [`EditorError::Position`] when the last
    /// row is at the largest position.
    pub fn add_row(&mut self) -> Result<LocalId, EditorError> {
        let id = self.chain_mut()?.add_row()?;
        self.touch();
        Ok(id)
    }

    /// Append an empty node to `row_id`.
    ///
    /// # Errors
    ///
    /// [`EditorError::RowNotFound`] when the row is not in the tree, or
    /// [`EditorError::Position`] when its last node is at the largest
    /// position.
    pub fn add_node_to_row(&mut self, row_id: LocalId) -> Result<LocalId, EditorError> {
        let id = self
            .chain_mut()?
            .add_node_to_row(row_id)?
            .ok_or(EditorError::RowNotFound(row_id))?;
        self.touch();
        Ok(id)
    }

    /// Replace a node's text and description. `None` clears the description.
    ///
    /// # Errors
    ///
    /// [`EditorError::NodeNotFound`] when the node is not in the tree.
    pub fn update_node(
        &mut self,
        node_id: LocalId,
        text: impl Into<String>,
        description: Option<String>,
    ) -> Result<&Node, EditorError> {
        let chain = self.chain_mut()?;
        if !chain.update_node(node_id, text, description) {
            return Err(EditorError::NodeNotFound(node_id));
        }
        self.touch();
        self.current
            .as_ref()
            .and_then(|chain| chain.node(node_id))
            .ok_or(EditorError::NodeNotFound(node_id))
    }

    /// # Errors
    ///
    /// [`EditorError::NodeNotFound`] when the node is not in the tree.
    pub fn delete_node(&mut self, node_id: LocalId) -> Result<(), EditorError> {
        if !self.chain_mut()?.delete_node(node_id) {
            return Err(EditorError::NodeNotFound(node_id));
        }
        self.touch();
        Ok(())
    }

    /// # Errors
    ///
    /// [`EditorError::RowNotFound`] when the row is not in the tree.
    pub fn delete_row(&mut self, row_id: LocalId) -> Result<(), EditorError> {
        if !self.chain_mut()?.delete_row(row_id) {
            return Err(EditorError::RowNotFound(row_id));
        }
        self.touch();
        Ok(())
    }

    /// Persist the current tree.
    ///
    /// A draft chain is created and then filled; a stored chain is diffed
    /// against storage and only the difference is written. Temporary ids
    /// are swapped for issued ones on success. On failure the tree is left
    /// exactly as it was.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoChain`], or the store error.
    pub fn save<S: ChainStore + ?Sized>(&mut self, store: &mut S) -> Result<SaveReport, EditorError> {
        let mut working = self.current.clone().ok_or(EditorError::NoChain)?;
        let prior = self.begin(SessionState::Saving)?;

        let outcome = match working.id() {
            LocalId::Temporary(_) => persist_draft(store, &mut working),
            LocalId::Persisted(id) => sync_existing(store, id, &mut working),
        };

        match outcome {
            Ok(report) => {
                self.current = Some(working);
                self.state = SessionState::Ready;
                info!(
                    chain_id = report.chain_id,
                    created = report.created,
                    nodes_created = report.nodes_created,
                    nodes_updated = report.nodes_updated,
                    "saved value chain"
                );
                Ok(report)
            }
            Err(err) => Err(self.fail(prior, err)),
        }
    }

    /// Snapshot the current tree as structured text.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoChain`] or a serialization failure.
    pub fn export(&self, format: ExportFormat) -> Result<String, EditorError> {
        let chain = self.current.as_ref().ok_or(EditorError::NoChain)?;
        Ok(export::render(chain, format)?)
    }

    // Calls take `&mut self` and finish before returning, so a busy state is
    // only held between here and the matching settle or `fail`.
    fn begin(&mut self, busy: SessionState) -> Result<SessionState, EditorError> {
        let prior = self.state;
        if !prior.can_enter(busy) {
            return Err(EditorError::NoChain);
        }
        self.state = busy;
        Ok(prior)
    }

    fn fail(&mut self, prior: SessionState, err: StoreError) -> EditorError {
        warn!(state = %self.state, restored = %prior, error = %err, "gateway call failed");
        self.state = prior;
        EditorError::Store(err)
    }

    fn chain_mut(&mut self) -> Result<&mut Chain, EditorError> {
        self.current.as_mut().ok_or(EditorError::NoChain)
    }

    fn touch(&mut self) {
        self.state = self.state.after_edit();
    }
}

fn hydrate(details: ChainDetails) -> Chain {
    let rows = details
        .rows
        .into_iter()
        .map(|row| {
            let nodes = row
                .nodes
                .into_iter()
                .map(|node| {
                    Node::hydrated(
                        LocalId::Persisted(node.id),
                        node.position,
                        node.text,
                        node.description,
                        node.is_empty,
                    )
                })
                .collect();
            Row::hydrated(LocalId::Persisted(row.row.id), row.row.position, nodes)
        })
        .collect();

    Chain::hydrated(
        LocalId::Persisted(details.value_chain.id),
        details.value_chain.name,
        details.value_chain.title,
        details.document.info,
        rows,
    )
}

fn persist_draft<S: ChainStore + ?Sized>(
    store: &mut S,
    chain: &mut Chain,
) -> Result<SaveReport, StoreError> {
    let created = store.create_chain(&NewChain {
        name: chain.name.clone(),
        title: chain.title.clone(),
        document: chain.document.clone(),
    })?;
    let chain_id = created.value_chain.id;
    let plan = sync::plan_for_draft(chain);

    let issued = match store.apply_sync(chain_id, &plan) {
        Ok(issued) => issued,
        Err(err) => {
            warn!(chain_id, error = %err, "filling new chain failed; removing it");
            if let Err(cleanup) = store.delete_chain(chain_id) {
                warn!(chain_id, error = %cleanup, "could not remove partially saved chain");
            }
            return Err(err);
        }
    };

    chain.set_id(LocalId::Persisted(chain_id));
    sync::reconcile(chain, &issued);
    Ok(SaveReport::from_plan(chain_id, true, &plan))
}

fn sync_existing<S: ChainStore + ?Sized>(
    store: &mut S,
    chain_id: i64,
    chain: &mut Chain,
) -> Result<SaveReport, StoreError> {
    let stored = store.get_chain_details(chain_id)?;
    if stored.value_chain.name != chain.name
        || stored.value_chain.title != chain.title
        || stored.document.info != chain.document
    {
        warn!(chain_id, "chain header edits are not persisted");
    }

    let plan = sync::diff(&stored, chain)?;
    if plan.is_empty() {
        debug!(chain_id, "nothing to save");
        return Ok(SaveReport::from_plan(chain_id, false, &plan));
    }

    let issued = store.apply_sync(chain_id, &plan)?;
    sync::reconcile(chain, &issued);
    Ok(SaveReport::from_plan(chain_id, false, &plan))
}
