//! The shopping-list collection store.
//!
//! One store is constructed at process start and handed to the UI layer; it
//! is the only component screens talk to. Every mutation runs the same
//! four-phase protocol: validate, capture a snapshot of what the operation
//! may touch, apply optimistically where the operation allows it, then call
//! the server and either adopt its canonical response or restore the
//! snapshot verbatim.
//!
//! The store is single-threaded. State lives in a `RefCell` and no borrow is
//! ever held across an `.await`; the remote call is the one suspension point
//! inside an operation, and the UI observes the optimistic state during that
//! window.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::api::{ApiError, ListApi};
use crate::model::{ListStatistics, NewItem, NewList, ShoppingList};
use crate::persistence::{self, SNAPSHOT_KEY, SnapshotStore};
use crate::stats::list_statistics;

slotmap::new_key_type! {
    /// Handle returned by [`ListStore::subscribe`].
    pub struct ListenerKey;
}

/// Everything the UI reads, as one cloneable value. Lists and statistics
/// keep insertion order for display; order carries no other meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub lists: IndexMap<String, ShoppingList>,
    pub statistics: IndexMap<String, ListStatistics>,
    /// Back-reference to the list currently being viewed. A relation only,
    /// never ownership.
    pub current_list_id: Option<String>,
    pub is_loading: bool,
    /// Last failure reason. Cleared explicitly or by the next successful
    /// operation.
    pub error: Option<String>,
    pub success: bool,
    /// Last human-readable confirmation.
    pub message: Option<String>,
}

/// The part of the state that survives restarts. Transient flags stay out.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    lists: IndexMap<String, ShoppingList>,
    statistics: IndexMap<String, ListStatistics>,
    current_list_id: Option<String>,
}

/// Phase-2 capture of everything an optimistic mutation on one list can
/// touch. Restoring it verbatim undoes the optimistic apply; an entry that
/// was absent at capture time stays absent on restore.
struct ListSnapshot {
    list: Option<ShoppingList>,
    statistics: Option<ListStatistics>,
}

pub struct ListStore<A, S> {
    state: RefCell<StoreState>,
    // Latest reconciliation token issued per list id. Never persisted.
    generations: RefCell<FxHashMap<String, u64>>,
    listeners: RefCell<SlotMap<ListenerKey, Rc<dyn Fn()>>>,
    api: A,
    snapshots: S,
}

impl<A: ListApi, S: SnapshotStore> ListStore<A, S> {
    pub fn new(api: A, snapshots: S) -> Self {
        Self {
            state: RefCell::new(StoreState::default()),
            generations: RefCell::new(FxHashMap::default()),
            listeners: RefCell::new(SlotMap::with_key()),
            api,
            snapshots,
        }
    }

    /// Seed the in-memory state from the durable snapshot, if one exists.
    /// Called once at startup, before any remote call completes. A missing
    /// or unreadable snapshot leaves the collection empty.
    pub async fn hydrate(&self) {
        let blob = match self.snapshots.load(SNAPSHOT_KEY).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return,
            Err(e) => {
                log::error!("Failed to read store snapshot: {e}");
                return;
            }
        };
        let Some(persisted) = persistence::decode::<PersistedState>(&blob) else {
            return;
        };
        {
            let mut state = self.state.borrow_mut();
            state.lists = persisted.lists;
            state.statistics = persisted.statistics;
            state.current_list_id = persisted.current_list_id;
        }
        log::info!("Hydrated {} shopping lists from snapshot", self.state.borrow().lists.len());
        self.notify();
    }

    // =======
    // reads
    // =======

    /// Clone of the current state. Listeners read through this rather than
    /// holding a borrow into the store.
    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn list(&self, list_id: &str) -> Option<ShoppingList> {
        self.state.borrow().lists.get(list_id).cloned()
    }

    pub fn statistics(&self, list_id: &str) -> Option<ListStatistics> {
        self.state.borrow().statistics.get(list_id).copied()
    }

    pub fn current_list_id(&self) -> Option<String> {
        self.state.borrow().current_list_id.clone()
    }

    /// Resolve the focused list, if the back-reference still points at one.
    pub fn focused_list(&self) -> Option<ShoppingList> {
        let state = self.state.borrow();
        let id = state.current_list_id.as_ref()?;
        state.lists.get(id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn success(&self) -> bool {
        self.state.borrow().success
    }

    pub fn message(&self) -> Option<String> {
        self.state.borrow().message.clone()
    }

    // =======
    // subscriptions
    // =======

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerKey {
        self.listeners.borrow_mut().insert(Rc::new(listener))
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.listeners.borrow_mut().remove(key);
    }

    /// Run listeners with no borrow held; a listener will usually re-enter
    /// the store to read the new snapshot.
    fn notify(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }

    // =======
    // focused list
    // =======

    pub async fn set_current_list_id(&self, list_id: Option<String>) {
        {
            self.state.borrow_mut().current_list_id = list_id;
        }
        self.notify();
        self.persist().await;
    }

    // =======
    // flags
    // =======

    /// Dismiss the last failure reason.
    pub fn clear_error(&self) {
        {
            self.state.borrow_mut().error = None;
        }
        self.notify();
    }

    /// Dismiss the last confirmation message.
    pub fn clear_message(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.message = None;
            state.success = false;
        }
        self.notify();
    }

    // =======
    // queries
    // =======

    /// Replace the whole collection with the server's view of it. On failure
    /// the previous collection stays untouched; there is no partial
    /// replacement.
    pub async fn fetch_all(&self) {
        self.begin_loading();
        match self.api.fetch_lists().await {
            Ok(bundles) => {
                log::info!("Fetched {} shopping lists", bundles.len());
                {
                    let mut lists = IndexMap::new();
                    let mut statistics = IndexMap::new();
                    for bundle in bundles {
                        statistics.insert(bundle.list.id.clone(), bundle.statistics);
                        lists.insert(bundle.list.id.clone(), bundle.list);
                    }
                    let mut state = self.state.borrow_mut();
                    state.lists = lists;
                    state.statistics = statistics;
                    state.is_loading = false;
                    state.error = None;
                    state.success = true;
                    state.message = Some("Shopping lists loaded".to_string());
                }
                self.notify();
                self.persist().await;
            }
            Err(e) => self.settle_failed("Failed to fetch shopping lists", &e),
        }
    }

    /// Refresh one list by id, leaving the rest of the collection alone:
    /// replace if present, append if not.
    pub async fn fetch_one(&self, list_id: &str) {
        if list_id.trim().is_empty() {
            self.fail("A list id is required");
            return;
        }
        self.begin_loading();
        match self.api.fetch_list(list_id).await {
            Ok(bundle) => {
                {
                    let mut state = self.state.borrow_mut();
                    state
                        .statistics
                        .insert(bundle.list.id.clone(), bundle.statistics);
                    state.lists.insert(bundle.list.id.clone(), bundle.list);
                    state.is_loading = false;
                    state.error = None;
                    state.success = true;
                    state.message = Some("Shopping list loaded".to_string());
                }
                self.notify();
                self.persist().await;
            }
            Err(e) => self.settle_failed("Failed to fetch shopping list", &e),
        }
    }

    // =======
    // mutations
    // =======

    /// Create a list on the server, then add it to the collection. List
    /// identity is server-assigned, so nothing is inserted until the id
    /// exists; a failure leaves no local trace of the attempt.
    pub async fn create_list(&self, list: NewList) {
        if list.name.trim().is_empty() || list.description.trim().is_empty() {
            self.fail("A list needs a name and a description");
            return;
        }
        self.begin_loading();
        match self.api.create_list(&list).await {
            Ok(created) => {
                {
                    let mut state = self.state.borrow_mut();
                    for list in created {
                        state
                            .statistics
                            .insert(list.id.clone(), list_statistics(&list.items));
                        state.lists.insert(list.id.clone(), list);
                    }
                    state.is_loading = false;
                    state.error = None;
                    state.success = true;
                    state.message = Some("List created".to_string());
                }
                self.notify();
                self.persist().await;
            }
            Err(e) => self.settle_failed("Failed to create list", &e),
        }
    }

    /// Remove a list. Deletion waits for the server: hiding a list that
    /// still exists remotely is worse than a brief delay, so nothing is
    /// removed until the call confirms.
    pub async fn delete_list(&self, list_id: &str) {
        if list_id.trim().is_empty() {
            self.fail("A list id is required");
            return;
        }
        self.begin_loading();
        match self.api.delete_list(list_id).await {
            Ok(confirmation) => {
                {
                    let mut state = self.state.borrow_mut();
                    state.lists.shift_remove(list_id);
                    state.statistics.shift_remove(list_id);
                    if state.current_list_id.as_deref() == Some(list_id) {
                        state.current_list_id = None;
                    }
                    state.is_loading = false;
                    state.error = None;
                    state.success = true;
                    state.message = Some(confirmation);
                }
                // Retire the list's reconciliation tokens: an in-flight item
                // mutation must not resurrect a confirmed deletion.
                self.generations.borrow_mut().remove(list_id);
                self.notify();
                self.persist().await;
            }
            Err(e) => self.settle_failed("Failed to delete list", &e),
        }
    }

    /// Remove an item from a list immediately; the server call runs after
    /// the fact and its response wins.
    pub async fn delete_item(&self, list_id: &str, item_id: &str) {
        if list_id.trim().is_empty() || item_id.trim().is_empty() {
            self.fail("A list id and an item id are required");
            return;
        }

        let token = self.next_generation(list_id);
        let snapshot = self.capture(list_id);

        // Optimistic removal. A missing list or item is a no-op; the entity
        // may already be gone from a concurrent operation.
        let changed = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match state.lists.get_mut(list_id) {
                Some(list) => match list.items.iter().position(|item| item.id == item_id) {
                    Some(index) => {
                        list.items.remove(index);
                        state
                            .statistics
                            .insert(list_id.to_string(), list_statistics(&list.items));
                        true
                    }
                    None => false,
                },
                None => false,
            }
        };
        if changed {
            self.notify();
            self.persist().await;
        }

        match self.api.delete_item(list_id, item_id).await {
            Ok(update) => self.reconcile(list_id, token, update.list, update.message).await,
            Err(e) => {
                self.roll_back(list_id, token, snapshot, &e, "Failed to delete item")
                    .await
            }
        }
    }

    /// Flip an item's purchased flag immediately; reconcile or roll back
    /// once the server answers.
    pub async fn set_item_purchased(&self, list_id: &str, item_id: &str, purchased: bool) {
        if list_id.trim().is_empty() || item_id.trim().is_empty() {
            self.fail("A list id and an item id are required");
            return;
        }

        let token = self.next_generation(list_id);
        let snapshot = self.capture(list_id);

        let changed = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match state.lists.get_mut(list_id) {
                Some(list) => match list.items.iter().position(|item| item.id == item_id) {
                    Some(index) => {
                        if let Some(item) = list.items.get_mut(index) {
                            item.purchased = purchased;
                        }
                        state
                            .statistics
                            .insert(list_id.to_string(), list_statistics(&list.items));
                        true
                    }
                    None => false,
                },
                None => false,
            }
        };
        if changed {
            self.notify();
            self.persist().await;
        }

        match self.api.set_item_purchased(list_id, item_id, purchased).await {
            Ok(update) => self.reconcile(list_id, token, update.list, update.message).await,
            Err(e) => {
                self.roll_back(list_id, token, snapshot, &e, "Failed to update item")
                    .await
            }
        }
    }

    /// Add an item to a list. The item's id is server-assigned, so the list
    /// is only updated once the server returns it; a failure changes flags
    /// and nothing else.
    pub async fn add_item(&self, list_id: &str, item: NewItem) {
        if list_id.trim().is_empty() {
            self.fail("A list id is required");
            return;
        }
        if item.name.trim().is_empty() || item.unit.trim().is_empty() || item.quantity <= 0.0 {
            self.fail("An item needs a name, a positive quantity and a unit");
            return;
        }
        self.begin_loading();
        match self.api.add_item(list_id, &item).await {
            Ok(added) => {
                log::debug!("Added item {} to list {list_id}", added.item.id);
                {
                    let mut state = self.state.borrow_mut();
                    state
                        .statistics
                        .insert(added.list.id.clone(), list_statistics(&added.list.items));
                    state.lists.insert(added.list.id.clone(), added.list);
                    state.is_loading = false;
                    state.error = None;
                    state.success = true;
                    state.message = Some(added.message);
                }
                self.notify();
                self.persist().await;
            }
            Err(e) => self.settle_failed("Failed to add item", &e),
        }
    }

    // =======
    // protocol plumbing
    // =======

    /// Next reconciliation token for a list. An operation records the token
    /// it was issued; only the holder of the latest token may reconcile or
    /// roll back that list.
    fn next_generation(&self, list_id: &str) -> u64 {
        let mut generations = self.generations.borrow_mut();
        let counter = generations.entry(list_id.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn generation_is_current(&self, list_id: &str, token: u64) -> bool {
        self.generations.borrow().get(list_id).copied() == Some(token)
    }

    fn capture(&self, list_id: &str) -> ListSnapshot {
        let state = self.state.borrow();
        ListSnapshot {
            list: state.lists.get(list_id).cloned(),
            statistics: state.statistics.get(list_id).copied(),
        }
    }

    /// Phase-4 success: the server's returned list is authoritative and
    /// replaces whatever the optimistic guess produced.
    async fn reconcile(&self, list_id: &str, token: u64, list: ShoppingList, message: String) {
        if !self.generation_is_current(list_id, token) {
            log::debug!("Dropping stale reconciliation for list {list_id}");
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            state
                .statistics
                .insert(list.id.clone(), list_statistics(&list.items));
            state.lists.insert(list.id.clone(), list);
            state.error = None;
            state.success = true;
            state.message = Some(message);
        }
        self.notify();
        self.persist().await;
    }

    /// Phase-4 failure: restore the capture verbatim and surface the reason.
    /// With a stale token the restore is skipped entirely; a newer mutation
    /// owns the list and its optimistic state stays.
    async fn roll_back(
        &self,
        list_id: &str,
        token: u64,
        snapshot: ListSnapshot,
        e: &ApiError,
        context: &str,
    ) {
        log::warn!("{context}: {e}");
        if !self.generation_is_current(list_id, token) {
            log::debug!("Dropping stale rollback for list {list_id}");
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            // An id with no local entity left is a no-op restore, not an
            // error; the list may have gone away while the call was out.
            if state.lists.contains_key(list_id) {
                if let Some(list) = snapshot.list {
                    state.lists.insert(list_id.to_string(), list);
                }
                if let Some(statistics) = snapshot.statistics {
                    state.statistics.insert(list_id.to_string(), statistics);
                }
            }
            state.error = Some(e.to_string());
            state.success = false;
        }
        self.notify();
        self.persist().await;
    }

    fn begin_loading(&self) {
        {
            self.state.borrow_mut().is_loading = true;
        }
        self.notify();
    }

    /// Validation failure: surface the reason without touching the
    /// collection or calling the server.
    fn fail(&self, reason: impl Into<String>) {
        {
            let mut state = self.state.borrow_mut();
            state.error = Some(reason.into());
            state.success = false;
        }
        self.notify();
    }

    /// Remote failure on a non-optimistic operation: flags change, the
    /// collection does not.
    fn settle_failed(&self, context: &str, e: &ApiError) {
        log::warn!("{context}: {e}");
        {
            let mut state = self.state.borrow_mut();
            state.is_loading = false;
            state.error = Some(e.to_string());
            state.success = false;
        }
        self.notify();
    }

    /// Persistence hook: runs after every change to the persisted
    /// projection. A failed save is logged and does not fail the operation.
    async fn persist(&self) {
        let blob = {
            let state = self.state.borrow();
            persistence::encode(&PersistedState {
                lists: state.lists.clone(),
                statistics: state.statistics.clone(),
                current_list_id: state.current_list_id.clone(),
            })
        };
        match blob {
            Ok(blob) => {
                if let Err(e) = self.snapshots.save(SNAPSHOT_KEY, blob).await {
                    log::error!("Failed to persist store snapshot: {e}");
                }
            }
            Err(e) => log::error!("Failed to serialize store snapshot: {e}"),
        }
    }
}
