//! Local cache of calls, conversations and dashboard stats.
//!
//! Two writers feed the cache: REST snapshots fetched through [`CallsApi`]
//! and real-time events from the synchronizer. Both go through this store
//! and every mutation is a single write under one lock, so two events about
//! the same entity can never interleave a read-modify-write. Between a
//! snapshot and an event the last write observed wins.
//!
//! Each collection stamps its fetches with a sequence number. A response is
//! applied only if no newer fetch was issued since, which keeps a slow
//! response for old filters from overwriting a newer one.

use std::sync::Arc;

use callboard_api::{ApiError, CallsApi};
use callboard_core::clock::{Clock, SystemClock};
use callboard_core::ids::{CallId, ConversationId};
use callboard_core::types::{
    Call, CallFilters, Conversation, ConversationFilters, ConversationMessage, ConversationStatus,
    DashboardStats, Entity, Page, PageRequest, PaginationMeta,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::errors::SyncError;

/// Result of a list or stats fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was written to the cache.
    Applied,
    /// A newer fetch was issued meanwhile; the response was dropped.
    Superseded,
}

/// One ordered, id-unique collection plus its focused entry.
#[derive(Clone, Debug)]
pub struct Collection<T: Entity> {
    items: Vec<T>,
    active: Option<T>,
    loading: bool,
    error: Option<String>,
    pagination: Option<PaginationMeta>,
    page: PageRequest,
    fetch_seq: u64,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            active: None,
            loading: false,
            error: None,
            pagination: None,
            page: PageRequest::default(),
            fetch_seq: 0,
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Entries, newest insertions first.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Entry by id.
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Focused entry.
    pub fn active(&self) -> Option<&T> {
        self.active.as_ref()
    }

    /// A fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Pagination of the last applied page.
    pub fn pagination(&self) -> Option<&PaginationMeta> {
        self.pagination.as_ref()
    }

    /// Page selection of the last fetch.
    pub fn page_request(&self) -> &PageRequest {
        &self.page
    }

    /// Replace the entry with the same id, or insert at the front.
    ///
    /// The focused copy follows. Returns `true` if the entry was new.
    pub fn upsert(&mut self, item: T) -> bool {
        self.refresh_active(&item);
        if let Some(slot) = self.items.iter_mut().find(|e| e.id() == item.id()) {
            *slot = item;
            false
        } else {
            self.items.insert(0, item);
            true
        }
    }

    /// Replace the entry with the same id and the focused copy, if present.
    ///
    /// Never inserts. Returns `true` if anything was replaced.
    pub fn replace_existing(&mut self, item: T) -> bool {
        let focused = self.refresh_active(&item);
        if let Some(slot) = self.items.iter_mut().find(|e| e.id() == item.id()) {
            *slot = item;
            true
        } else {
            focused
        }
    }

    /// Mutate the entry with `id` and the focused copy in place.
    pub fn modify(&mut self, id: &T::Id, mut f: impl FnMut(&mut T)) -> bool {
        let mut touched = false;
        if let Some(slot) = self.items.iter_mut().find(|e| e.id() == id) {
            f(slot);
            touched = true;
        }
        if let Some(active) = self.active.as_mut().filter(|a| a.id() == id) {
            f(active);
            touched = true;
        }
        touched
    }

    fn refresh_active(&mut self, item: &T) -> bool {
        match self.active.as_mut() {
            Some(active) if active.id() == item.id() => {
                *active = item.clone();
                true
            }
            _ => false,
        }
    }

    fn set_active(&mut self, item: Option<T>) {
        self.active = item;
    }

    fn begin_fetch(&mut self, page: Option<PageRequest>) -> u64 {
        if let Some(page) = page {
            self.page = page;
        }
        self.fetch_seq += 1;
        self.loading = true;
        self.error = None;
        self.fetch_seq
    }

    fn is_current(&self, seq: u64) -> bool {
        self.fetch_seq == seq
    }

    fn apply_page(&mut self, page: Page<T>) {
        self.items = page.items;
        self.pagination = page.pagination;
        self.loading = false;
    }

    fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.loading = false;
    }

    /// Drop everything but keep the sequence moving so in-flight fetches
    /// from before the reset are discarded.
    fn reset(&mut self) {
        let seq = self.fetch_seq + 1;
        *self = Self::default();
        self.fetch_seq = seq;
    }
}

/// Dashboard stats snapshot.
#[derive(Clone, Debug, Default)]
pub struct StatsSlot {
    value: Option<DashboardStats>,
    loading: bool,
    error: Option<String>,
    fetch_seq: u64,
}

impl StatsSlot {
    /// Last fetched stats.
    pub fn value(&self) -> Option<&DashboardStats> {
        self.value.as_ref()
    }

    /// A fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Everything the store holds.
#[derive(Clone, Debug)]
pub struct CacheState {
    calls: Collection<Call>,
    conversations: Collection<Conversation>,
    stats: StatsSlot,
    call_filters: CallFilters,
    conversation_filters: ConversationFilters,
    realtime_enabled: bool,
}

impl Default for CacheState {
    fn default() -> Self {
        Self {
            calls: Collection::default(),
            conversations: Collection::default(),
            stats: StatsSlot::default(),
            call_filters: CallFilters::default(),
            conversation_filters: ConversationFilters::default(),
            realtime_enabled: true,
        }
    }
}

impl CacheState {
    /// Calls.
    pub fn calls(&self) -> &Collection<Call> {
        &self.calls
    }

    /// Conversations.
    pub fn conversations(&self) -> &Collection<Conversation> {
        &self.conversations
    }

    /// Dashboard stats.
    pub fn stats(&self) -> &StatsSlot {
        &self.stats
    }

    /// Applied call filters.
    pub fn call_filters(&self) -> &CallFilters {
        &self.call_filters
    }

    /// Applied conversation filters.
    pub fn conversation_filters(&self) -> &ConversationFilters {
        &self.conversation_filters
    }

    /// Whether real-time upserts are applied.
    pub fn realtime_enabled(&self) -> bool {
        self.realtime_enabled
    }
}

/// The entity cache.
pub struct CallStore {
    api: Arc<dyn CallsApi>,
    clock: Arc<dyn Clock>,
    state: RwLock<CacheState>,
    revision: watch::Sender<u64>,
}

impl std::fmt::Debug for CallStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallStore")
            .field("revision", &*self.revision.borrow())
            .finish_non_exhaustive()
    }
}

impl CallStore {
    /// Empty store fetching through `api`.
    pub fn new(api: Arc<dyn CallsApi>) -> Self {
        Self::with_clock(api, Arc::new(SystemClock))
    }

    /// Empty store stamping local changes with `clock`.
    pub fn with_clock(api: Arc<dyn CallsApi>, clock: Arc<dyn Clock>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            api,
            clock,
            state: RwLock::new(CacheState::default()),
            revision,
        }
    }

    /// Current time on the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Run `f` against a consistent view of the cache.
    pub fn read<R>(&self, f: impl FnOnce(&CacheState) -> R) -> R {
        f(&self.state.read())
    }

    /// Copy of the whole cache.
    pub fn snapshot(&self) -> CacheState {
        self.state.read().clone()
    }

    /// Cached calls.
    pub fn calls(&self) -> Vec<Call> {
        self.read(|s| s.calls.items.clone())
    }

    /// Cached call by id.
    pub fn call(&self, id: &CallId) -> Option<Call> {
        self.read(|s| s.calls.get(id).cloned())
    }

    /// Cached conversations.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.read(|s| s.conversations.items.clone())
    }

    /// Cached conversation by id.
    pub fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.read(|s| s.conversations.get(id).cloned())
    }

    /// Focused call.
    pub fn active_call(&self) -> Option<Call> {
        self.read(|s| s.calls.active.clone())
    }

    /// Focused conversation.
    pub fn active_conversation(&self) -> Option<Conversation> {
        self.read(|s| s.conversations.active.clone())
    }

    /// Last fetched dashboard stats.
    pub fn stats(&self) -> Option<DashboardStats> {
        self.read(|s| s.stats.value.clone())
    }

    /// Whether real-time upserts are applied.
    pub fn realtime_enabled(&self) -> bool {
        self.read(|s| s.realtime_enabled)
    }

    /// Observe cache changes. The value is a revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn write<R>(&self, f: impl FnOnce(&mut CacheState) -> R) -> R {
        let out = f(&mut self.state.write());
        self.revision.send_modify(|rev| *rev += 1);
        out
    }

    // ── Real-time writes ────────────────────────────────────────────────

    /// Upsert a call delivered by the event stream.
    ///
    /// Ignored while real-time updates are disabled.
    pub fn apply_call(&self, call: Call) -> bool {
        self.write(|s| {
            if !s.realtime_enabled {
                debug!(call_id = %call.id, "real-time disabled, ignoring call update");
                return false;
            }
            let inserted = s.calls.upsert(call);
            debug!(inserted, "call applied");
            true
        })
    }

    /// Upsert a conversation delivered by the event stream.
    pub fn apply_conversation(&self, conversation: Conversation) -> bool {
        self.write(|s| {
            if !s.realtime_enabled {
                debug!(conversation_id = %conversation.id, "real-time disabled, ignoring conversation update");
                return false;
            }
            let inserted = s.conversations.upsert(conversation);
            debug!(inserted, "conversation applied");
            true
        })
    }

    /// Append a streamed message to a cached conversation.
    ///
    /// Returns `false` if real-time is disabled or the conversation is not
    /// cached.
    pub fn append_message(&self, id: &ConversationId, message: ConversationMessage) -> bool {
        self.write(|s| {
            if !s.realtime_enabled {
                return false;
            }
            s.conversations.modify(id, |c| {
                let _ = c.push_message(message.clone());
            })
        })
    }

    /// Set the takeover flag on a cached conversation from a pushed event.
    pub fn mark_takeover_requested(&self, id: &ConversationId, at: DateTime<Utc>) -> bool {
        self.write(|s| {
            if !s.realtime_enabled {
                return false;
            }
            s.conversations
                .modify(id, |c| c.mark_takeover_requested(at))
        })
    }

    /// Turn real-time upserts on or off. Fetches always apply.
    pub fn set_realtime_enabled(&self, enabled: bool) {
        self.write(|s| s.realtime_enabled = enabled);
    }

    // ── Focus ───────────────────────────────────────────────────────────

    /// Set or clear the focused call.
    pub fn set_active_call(&self, call: Option<Call>) {
        self.write(|s| s.calls.set_active(call));
    }

    /// Set or clear the focused conversation.
    pub fn set_active_conversation(&self, conversation: Option<Conversation>) {
        self.write(|s| s.conversations.set_active(conversation));
    }

    /// Focus a cached call by id.
    pub fn focus_call(&self, id: &CallId) -> Result<Call, SyncError> {
        self.write(|s| {
            let call = s.calls.get(id).cloned().ok_or_else(|| SyncError::NotFound {
                kind: "call",
                id: id.to_string(),
            })?;
            s.calls.set_active(Some(call.clone()));
            Ok(call)
        })
    }

    /// Focus a cached conversation by id.
    pub fn focus_conversation(&self, id: &ConversationId) -> Result<Conversation, SyncError> {
        self.write(|s| {
            let conversation =
                s.conversations
                    .get(id)
                    .cloned()
                    .ok_or_else(|| SyncError::NotFound {
                        kind: "conversation",
                        id: id.to_string(),
                    })?;
            s.conversations.set_active(Some(conversation.clone()));
            Ok(conversation)
        })
    }

    // ── Filters ─────────────────────────────────────────────────────────

    /// Merge `patch` into the call filters.
    pub fn set_call_filters(&self, patch: CallFilters) {
        self.write(|s| s.call_filters.merge(patch));
    }

    /// Reset the call filters.
    pub fn clear_call_filters(&self) {
        self.write(|s| s.call_filters = CallFilters::default());
    }

    /// Merge `patch` into the conversation filters.
    pub fn set_conversation_filters(&self, patch: ConversationFilters) {
        self.write(|s| s.conversation_filters.merge(patch));
    }

    /// Reset the conversation filters.
    pub fn clear_conversation_filters(&self) {
        self.write(|s| s.conversation_filters = ConversationFilters::default());
    }

    // ── Fetches ─────────────────────────────────────────────────────────

    /// Fetch a page of calls with the current filters.
    #[instrument(skip_all, fields(page = page.page))]
    pub async fn fetch_calls(&self, page: PageRequest) -> Result<FetchOutcome, SyncError> {
        let (seq, filters, page) = self.write(|s| {
            let seq = s.calls.begin_fetch(Some(page));
            (seq, s.call_filters.clone(), s.calls.page.clone())
        });
        let result = self.api.list_calls(&filters, &page).await;
        self.finish_list(result, |s| &mut s.calls, seq, "calls")
    }

    /// Re-fetch calls with the current filters and last page selection.
    pub async fn refresh_calls(&self) -> Result<FetchOutcome, SyncError> {
        let page = self.read(|s| s.calls.page.clone());
        self.fetch_calls(page).await
    }

    /// Fetch a page of conversations with the current filters.
    #[instrument(skip_all, fields(page = page.page))]
    pub async fn fetch_conversations(&self, page: PageRequest) -> Result<FetchOutcome, SyncError> {
        let (seq, filters, page) = self.write(|s| {
            let seq = s.conversations.begin_fetch(Some(page));
            (
                seq,
                s.conversation_filters.clone(),
                s.conversations.page.clone(),
            )
        });
        let result = self.api.list_conversations(&filters, &page).await;
        self.finish_list(result, |s| &mut s.conversations, seq, "conversations")
    }

    /// Re-fetch conversations with the current filters and last page selection.
    pub async fn refresh_conversations(&self) -> Result<FetchOutcome, SyncError> {
        let page = self.read(|s| s.conversations.page.clone());
        self.fetch_conversations(page).await
    }

    fn finish_list<T: Entity>(
        &self,
        result: Result<Page<T>, ApiError>,
        collection: impl FnOnce(&mut CacheState) -> &mut Collection<T>,
        seq: u64,
        what: &'static str,
    ) -> Result<FetchOutcome, SyncError> {
        self.write(|s| {
            let collection = collection(s);
            let current = collection.is_current(seq);
            match result {
                Ok(_) if !current => {
                    debug!(what, seq, "dropping superseded response");
                    Ok(FetchOutcome::Superseded)
                }
                Ok(page) => {
                    collection.apply_page(page);
                    Ok(FetchOutcome::Applied)
                }
                Err(e) => {
                    warn!(what, error = %e, "fetch failed");
                    if current {
                        collection.fail(e.user_message());
                    }
                    Err(e.into())
                }
            }
        })
    }

    /// Fetch one call and replace its cached copies. Never inserts.
    #[instrument(skip_all, fields(call_id = %id))]
    pub async fn fetch_call(&self, id: &CallId) -> Result<Call, SyncError> {
        let call = self.api.get_call(id).await?;
        let _ = self.write(|s| s.calls.replace_existing(call.clone()));
        Ok(call)
    }

    /// Fetch one conversation and replace its cached copies. Never inserts.
    #[instrument(skip_all, fields(conversation_id = %id))]
    pub async fn fetch_conversation(&self, id: &ConversationId) -> Result<Conversation, SyncError> {
        let conversation = self.api.get_conversation(id).await?;
        let _ = self.write(|s| s.conversations.replace_existing(conversation.clone()));
        Ok(conversation)
    }

    /// Fetch dashboard stats.
    #[instrument(skip_all)]
    pub async fn fetch_stats(&self) -> Result<FetchOutcome, SyncError> {
        let seq = self.write(|s| {
            s.stats.fetch_seq += 1;
            s.stats.loading = true;
            s.stats.error = None;
            s.stats.fetch_seq
        });
        let result = self.api.dashboard_stats().await;
        self.write(|s| {
            let current = s.stats.fetch_seq == seq;
            match result {
                Ok(_) if !current => Ok(FetchOutcome::Superseded),
                Ok(stats) => {
                    s.stats.value = Some(stats);
                    s.stats.loading = false;
                    Ok(FetchOutcome::Applied)
                }
                Err(e) => {
                    warn!(error = %e, "stats fetch failed");
                    if current {
                        s.stats.error = Some(e.user_message());
                        s.stats.loading = false;
                    }
                    Err(e.into())
                }
            }
        })
    }

    /// Re-fetch calls, conversations and stats concurrently.
    ///
    /// Returns the first failure after all three have finished.
    pub async fn refresh_all(&self) -> Result<(), SyncError> {
        let (calls, conversations, stats) = tokio::join!(
            self.refresh_calls(),
            self.refresh_conversations(),
            self.fetch_stats()
        );
        calls?;
        conversations?;
        stats?;
        Ok(())
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Ask for a human to take over. On success the cached conversation is
    /// flagged; on failure the cache is unchanged.
    #[instrument(skip_all, fields(conversation_id = %id))]
    pub async fn request_takeover(&self, id: &ConversationId) -> Result<(), SyncError> {
        self.api.request_takeover(id).await?;
        let now = self.clock.now();
        let _ = self.write(|s| s.conversations.modify(id, |c| c.mark_takeover_requested(now)));
        Ok(())
    }

    /// Change a conversation's status.
    #[instrument(skip_all, fields(conversation_id = %id, ?status))]
    pub async fn update_conversation_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), SyncError> {
        self.api.update_conversation_status(id, status).await?;
        let _ = self.write(|s| s.conversations.modify(id, |c| c.status = status));
        Ok(())
    }

    /// Attach a note, then re-fetch the conversation.
    #[instrument(skip_all, fields(conversation_id = %id))]
    pub async fn add_conversation_note(&self, id: &ConversationId, note: &str) -> Result<(), SyncError> {
        self.api.add_conversation_note(id, note).await?;
        let _ = self.fetch_conversation(id).await?;
        Ok(())
    }

    // ── Reset ───────────────────────────────────────────────────────────

    /// Forget fetch errors.
    pub fn clear_errors(&self) {
        self.write(|s| {
            s.calls.error = None;
            s.conversations.error = None;
            s.stats.error = None;
        });
    }

    /// Drop every cached entity, focus, filter, stat and error.
    ///
    /// Fetches in flight when this runs are discarded on arrival.
    pub fn clear(&self) {
        self.write(|s| {
            s.calls.reset();
            s.conversations.reset();
            let stats_seq = s.stats.fetch_seq + 1;
            s.stats = StatsSlot {
                fetch_seq: stats_seq,
                ..StatsSlot::default()
            };
            s.call_filters = CallFilters::default();
            s.conversation_filters = ConversationFilters::default();
        });
        debug!("cache cleared");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
