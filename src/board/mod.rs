//! Client-side order board
//!
//! The board owns the order list and the per-order pending and approved
//! change-request maps for one session. Every refresh rebuilds the whole
//! snapshot and swaps it in one step:
//!
//! - each refresh takes a new generation and aborts the one in flight, and a
//!   result is published only while its generation is still current
//! - a submission for an order or request that is already being processed
//!   fails with `Busy` before any network call
//! - every successful write, and every state conflict, is followed by a
//!   refresh so stale affordances disappear

use crate::core::auth::{AuthContext, Session};
use crate::core::change_request::{ChangeRequest, Decision};
use crate::core::draft::OrderDraft;
use crate::core::error::{DyehouseError, ErrorKind, Result};
use crate::core::order::{Order, OrderItem};
use crate::core::permission::{self, EditPath, EditRoute, EditableFields, OrderPatch};
use crate::core::query::{ChangeRequestQuery, OrderFilter};
use crate::core::role::Role;
use crate::core::service::Backend;
use crate::core::status::Status;
use chrono::{DateTime, Utc};
use futures::future::{AbortHandle, abortable};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Everything the board shows, as of one refresh
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub generation: u64,
    pub orders: Vec<Order>,
    /// Pending request per order
    pub pending: HashMap<Uuid, ChangeRequest>,
    /// Earliest approved, unused request per order
    pub approved: HashMap<Uuid, ChangeRequest>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl BoardSnapshot {
    pub fn order(&self, id: &Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }

    fn requests(&self) -> Vec<ChangeRequest> {
        self.pending
            .values()
            .chain(self.approved.values())
            .cloned()
            .collect()
    }
}

/// Result of a refresh
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Applied(Arc<BoardSnapshot>),
    /// A newer refresh started before this one finished
    Superseded,
}

/// Result of asking for a change
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    Created(ChangeRequest),
    /// A request for this order is already waiting for an admin
    AlreadyPending { order_id: Uuid },
}

/// Removes its id from the processing set when dropped
struct ProcessingGuard {
    set: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.id);
        }
    }
}

/// Key used to guard order creation, which has no id yet
const NEW_ORDER: Uuid = Uuid::nil();

/// Order board for one logged-in user
pub struct OrderBoard<B: Backend + ?Sized> {
    backend: Arc<B>,
    session: Session,
    filter: RwLock<OrderFilter>,
    snapshot: RwLock<Arc<BoardSnapshot>>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
    processing: Arc<Mutex<HashSet<Uuid>>>,
}

impl<B: Backend + ?Sized> OrderBoard<B> {
    pub fn new(backend: Arc<B>, session: Session) -> Self {
        Self {
            backend,
            session,
            filter: RwLock::new(OrderFilter::default()),
            snapshot: RwLock::new(Arc::new(BoardSnapshot::default())),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            processing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn actor(&self) -> AuthContext {
        AuthContext::from(&self.session.user)
    }

    /// The last published snapshot
    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn filter(&self) -> OrderFilter {
        match self.filter.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_processing(&self, id: &Uuid) -> bool {
        self.processing
            .lock()
            .map(|set| set.contains(id))
            .unwrap_or(false)
    }

    /// Replace the filter and refresh, cancelling any refresh in flight
    pub async fn set_filter(&self, filter: OrderFilter) -> Result<RefreshOutcome> {
        *self
            .filter
            .write()
            .map_err(|e| DyehouseError::Internal(format!("Failed to acquire write lock: {}", e)))? = filter;
        self.refresh().await
    }

    /// Re-fetch orders and change requests and publish them as one snapshot
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (fetch, handle) = abortable(self.fetch(generation));

        {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|e| DyehouseError::Internal(format!("Failed to acquire lock: {}", e)))?;
            if let Some(previous) = in_flight.replace(handle) {
                previous.abort();
            }
        }

        let snapshot = match fetch.await {
            Ok(result) => result?,
            Err(_aborted) => {
                tracing::debug!(generation, "refresh aborted");
                return Ok(RefreshOutcome::Superseded);
            }
        };

        let mut current = self
            .snapshot
            .write()
            .map_err(|e| DyehouseError::Internal(format!("Failed to acquire write lock: {}", e)))?;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "refresh superseded");
            return Ok(RefreshOutcome::Superseded);
        }

        let snapshot = Arc::new(snapshot);
        *current = snapshot.clone();
        tracing::debug!(
            generation,
            orders = snapshot.orders.len(),
            pending = snapshot.pending.len(),
            approved = snapshot.approved.len(),
            "board refreshed"
        );
        Ok(RefreshOutcome::Applied(snapshot))
    }

    async fn fetch(&self, generation: u64) -> Result<BoardSnapshot> {
        let filter = self.filter();
        let orders = self.backend.list_orders(&self.session, &filter).await?;

        let mut pending = HashMap::new();
        let mut approved: HashMap<Uuid, ChangeRequest> = HashMap::new();
        if self.session.role() != Role::Sales {
            for request in self
                .backend
                .list_change_requests(&self.session, &ChangeRequestQuery::pending())
                .await?
            {
                pending.insert(request.order_id, request);
            }

            for request in self
                .backend
                .list_change_requests(&self.session, &ChangeRequestQuery::approved())
                .await?
                .into_iter()
                .filter(|r| r.is_approved_unused() && r.requester_id == self.session.user_id())
            {
                let earlier = approved
                    .get(&request.order_id)
                    .is_some_and(|kept| (kept.created_at, kept.id) <= (request.created_at, request.id));
                if !earlier {
                    approved.insert(request.order_id, request);
                }
            }
        }

        Ok(BoardSnapshot {
            generation,
            orders,
            pending,
            approved,
            refreshed_at: Some(Utc::now()),
        })
    }

    fn begin(&self, id: Uuid) -> Result<ProcessingGuard> {
        let mut set = self
            .processing
            .lock()
            .map_err(|e| DyehouseError::Internal(format!("Failed to acquire lock: {}", e)))?;
        if !set.insert(id) {
            return Err(DyehouseError::Busy { id });
        }
        Ok(ProcessingGuard {
            set: self.processing.clone(),
            id,
        })
    }

    /// Refresh after a write, or after a conflict so stale state disappears
    async fn settle<T>(&self, result: Result<T>) -> Result<T> {
        let needs_refresh = match &result {
            Ok(_) => true,
            Err(e) => e.kind() == ErrorKind::StateConflict,
        };
        if needs_refresh {
            if let Err(e) = self.refresh().await {
                tracing::warn!("refresh after write failed: {}", e);
            }
        }
        result
    }

    /// Editable fields for an order in the current snapshot
    pub fn editable_fields(&self, order_id: &Uuid) -> EditableFields {
        let snapshot = self.snapshot();
        match snapshot.order(order_id) {
            Some(order) => {
                permission::resolve_editable_fields(self.session.role(), order, snapshot.approved.get(order_id))
            }
            None => EditableFields::locked(),
        }
    }

    /// Which edit affordance to show for an order
    pub fn edit_route(&self, order_id: &Uuid) -> EditRoute {
        let snapshot = self.snapshot();
        match snapshot.order(order_id) {
            Some(order) => permission::route_edit(
                self.session.role(),
                self.session.user_id(),
                order,
                &snapshot.requests(),
            ),
            None => EditRoute::Unavailable,
        }
    }

    /// Validate locally, then create
    ///
    /// A validation failure never reaches the backend.
    pub async fn create_order(&self, draft: &OrderDraft) -> Result<Order> {
        draft
            .normalized()
            .validate(&self.actor(), Utc::now().date_naive())?;

        let _guard = self.begin(NEW_ORDER)?;
        let result = self.backend.create_order(&self.session, draft).await;
        self.settle(result).await
    }

    /// Ask an admin to reopen an order
    ///
    /// An existing pending request is not an error for the caller.
    pub async fn request_change(&self, order_id: &Uuid) -> Result<RequestOutcome> {
        if self.snapshot().pending.contains_key(order_id) {
            return Ok(RequestOutcome::AlreadyPending { order_id: *order_id });
        }

        let _guard = self.begin(*order_id)?;
        let result = self.backend.request_change(&self.session, order_id).await;
        match self.settle(result).await {
            Ok(request) => Ok(RequestOutcome::Created(request)),
            Err(DyehouseError::DuplicatePendingRequest { order_id }) => {
                Ok(RequestOutcome::AlreadyPending { order_id })
            }
            Err(e) => Err(e),
        }
    }

    /// Approve or reject a pending request
    pub async fn process(&self, request_id: &Uuid, decision: Decision, note: Option<String>) -> Result<ChangeRequest> {
        let _guard = self.begin(*request_id)?;
        let result = self
            .backend
            .process_change_request(&self.session, request_id, decision, note)
            .await;
        self.settle(result).await
    }

    /// Submit an edit through whichever path currently allows it
    pub async fn submit_edit(&self, order_id: &Uuid, patch: OrderPatch) -> Result<Order> {
        let editable = self.editable_fields(order_id);
        permission::check_patch(&editable, &patch)?;

        let mut patch = patch;
        if let EditPath::ChangeRequest(request_id) = editable.path {
            patch.change_request_id.get_or_insert(request_id);
        }

        let _guard = self.begin(*order_id)?;
        let result = self.backend.update_order(&self.session, order_id, &patch).await;
        self.settle(result).await
    }

    pub async fn change_item_status(&self, item_id: &Uuid, status: Status) -> Result<OrderItem> {
        let _guard = self.begin(*item_id)?;
        let result = self
            .backend
            .update_item_status(&self.session, item_id, status)
            .await;
        self.settle(result).await
    }

    pub async fn delete_order(&self, order_id: &Uuid) -> Result<()> {
        let _guard = self.begin(*order_id)?;
        let result = self.backend.delete_order(&self.session, order_id).await;
        self.settle(result).await
    }
}
