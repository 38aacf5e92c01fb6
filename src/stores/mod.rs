//! Client-side state containers, one per entity family.
//!
//! Every async operation runs the same three-phase lifecycle: *pending*
//! (loading on, error cleared), then *fulfilled* (loading off, payload
//! merged) or *rejected* (loading off, error recorded). `loading` stays on
//! while any request of the store is in flight. A dispatch that replaces a
//! whole slot (the list, the selected entity) takes a ticket, and only the
//! newest ticket for that slot may write it, so a slow fetch can't overwrite
//! a newer one. Single-entity merges (append, replace, remove) always land.
//! Closing a store cancels its in-flight requests and drops any late
//! responses silently.

pub mod auth;
pub mod bookings;
pub mod payments;
pub mod reviews;
pub mod services;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::errors::StoreError;
use crate::models::{Booking, EntityId, Payment, Review, Role, Service};

pub use auth::{AuthState, AuthStore};
pub use bookings::{BookingScope, BookingStore, BookingsState};
pub use payments::{PaymentStore, PaymentsState};
pub use reviews::{ReviewStore, ReviewsState};
pub use services::{ServiceStore, ServicesState};

pub trait Keyed {
    fn key(&self) -> EntityId;
}

impl Keyed for Service {
    fn key(&self) -> EntityId {
        self.id
    }
}

impl Keyed for Booking {
    fn key(&self) -> EntityId {
        self.id
    }
}

impl Keyed for Review {
    fn key(&self) -> EntityId {
        self.id
    }
}

impl Keyed for Payment {
    fn key(&self) -> EntityId {
        self.id
    }
}

/// Id-addressable list that never reorders untouched entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> Collection<T> {
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    /// Swaps in `item` at the position of the entry with the same id.
    /// Returns false (and leaves the list alone) when there is none.
    pub fn replace(&mut self, item: T) -> bool {
        match self.items.iter().position(|x| x.key() == item.key()) {
            Some(idx) => {
                self.items[idx] = item;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let idx = self.items.iter().position(|x| x.key() == id)?;
        Some(self.items.remove(idx))
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|x| x.key() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.items.iter_mut().find(|x| x.key() == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Lifecycle {
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    in_flight: usize,
    #[serde(skip)]
    seq: u64,
    #[serde(skip)]
    latest: HashMap<&'static str, u64>,
}

/// How a fulfilled payload lands in state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Write {
    /// Overwrites a whole named slot. Only the newest dispatch for the slot
    /// may write it.
    Replace(&'static str),
    /// Appends, swaps or removes one entity.
    Merge,
}

impl Write {
    pub(crate) const LIST: Write = Write::Replace("list");
    pub(crate) const SELECTED: Write = Write::Replace("selected");
}

#[derive(Debug)]
#[must_use]
pub struct Ticket {
    seq: u64,
    write: Write,
}

impl Lifecycle {
    fn dispatch(&mut self, write: Write, clear_error: bool) -> Ticket {
        self.seq += 1;
        self.in_flight += 1;
        self.loading = true;
        if clear_error {
            self.error = None;
        }
        if let Write::Replace(slot) = write {
            self.latest.insert(slot, self.seq);
        }
        Ticket {
            seq: self.seq,
            write,
        }
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0;
    }

    fn is_stale(&self, ticket: &Ticket) -> bool {
        match ticket.write {
            Write::Merge => false,
            Write::Replace(slot) => self.latest.get(slot) != Some(&ticket.seq),
        }
    }

    /// Forgets outstanding requests, e.g. on logout.
    pub(crate) fn reset(&mut self) {
        self.loading = false;
        self.error = None;
        self.in_flight = 0;
        self.latest.clear();
    }
}

pub trait StoreState: Clone + Default {
    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;
}

pub(crate) struct StoreCore<S> {
    name: &'static str,
    state: Mutex<S>,
    closed: CancellationToken,
}

impl<S: StoreState> StoreCore<S> {
    pub(crate) fn new(name: &'static str, initial: S) -> Self {
        Self {
            name,
            state: Mutex::new(initial),
            closed: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> S {
        self.lock().clone()
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.lock())
    }

    /// Pending phase. `prepare` runs under the same lock, before any I/O.
    pub(crate) fn begin_with(&self, write: Write, prepare: impl FnOnce(&mut S)) -> Ticket {
        let mut state = self.lock();
        let ticket = state.lifecycle_mut().dispatch(write, true);
        prepare(&mut state);
        ticket
    }

    pub(crate) fn begin(&self, write: Write) -> Ticket {
        self.begin_with(write, |_| {})
    }

    /// Pending phase that leaves an existing error visible.
    pub(crate) fn begin_keep_error(&self, write: Write) -> Ticket {
        self.lock().lifecycle_mut().dispatch(write, false)
    }

    /// Token handed to each request so closing the store aborts it.
    pub(crate) fn request_token(&self) -> CancellationToken {
        self.closed.child_token()
    }

    /// Fulfilled/rejected phase.
    pub(crate) fn settle<T>(
        &self,
        ticket: Ticket,
        result: Result<T, StoreError>,
        apply: impl FnOnce(&mut S, &T),
    ) -> Result<T, StoreError> {
        if self.closed.is_cancelled() {
            tracing::debug!(store = self.name, "store closed, dropping response");
            return result;
        }

        let mut state = self.lock();
        let lifecycle = state.lifecycle_mut();
        lifecycle.finish();
        if lifecycle.is_stale(&ticket) {
            tracing::debug!(
                store = self.name,
                seq = ticket.seq,
                write = ?ticket.write,
                "discarding stale response"
            );
            return result;
        }

        match &result {
            Ok(payload) => apply(&mut state, payload),
            Err(e) => {
                tracing::warn!(store = self.name, error = %e, "store operation rejected");
                state.lifecycle_mut().error = Some(e.to_string());
            }
        }
        result
    }

    /// Runs pending then rejected without touching the network.
    pub(crate) fn reject<T>(&self, err: StoreError) -> Result<T, StoreError> {
        let ticket = self.begin(Write::Merge);
        self.settle(ticket, Err(err), |_, _: &T| {})
    }

    pub(crate) fn close(&self) {
        tracing::debug!(store = self.name, "closing store");
        self.closed.cancel();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Advisory role gate; the backend remains the authority.
pub(crate) fn require_role(
    role: Option<Role>,
    allowed: &[Role],
    message: &str,
) -> Result<(), StoreError> {
    match role {
        Some(r) if allowed.contains(&r) => Ok(()),
        _ => Err(StoreError::permission(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: EntityId,
        label: &'static str,
    }

    impl Keyed for Item {
        fn key(&self) -> EntityId {
            self.id
        }
    }

    #[derive(Debug, Clone, Default)]
    struct TestState {
        items: Collection<Item>,
        lifecycle: Lifecycle,
    }

    impl StoreState for TestState {
        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }
        fn lifecycle_mut(&mut self) -> &mut Lifecycle {
            &mut self.lifecycle
        }
    }

    fn item(id: EntityId, label: &'static str) -> Item {
        Item { id, label }
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut c = Collection::from(vec![item(1, "a"), item(2, "b"), item(3, "c")]);
        assert!(c.replace(item(2, "B")));
        let labels: Vec<_> = c.iter().map(|i| i.label).collect();
        assert_eq!(labels, ["a", "B", "c"]);

        assert!(!c.replace(item(9, "z")));
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_append_and_remove() {
        let mut c = Collection::from(vec![item(1, "a"), item(2, "b")]);
        c.append(item(3, "c"));
        assert_eq!(c.remove(1).map(|i| i.label), Some("a"));
        assert!(c.remove(1).is_none());
        let ids: Vec<_> = c.iter().map(|i| i.id).collect();
        assert_eq!(ids, [2, 3]);
    }

    #[test]
    fn test_lifecycle_phases() {
        let core = StoreCore::new("test", TestState::default());

        let ticket = core.begin(Write::LIST);
        assert!(core.snapshot().lifecycle.loading);

        let res = core.settle(ticket, Ok(vec![item(1, "a")]), |s, items| {
            s.items.replace_all(items.clone())
        });
        assert!(res.is_ok());
        let state = core.snapshot();
        assert!(!state.lifecycle.loading);
        assert_eq!(state.items.len(), 1);

        let ticket = core.begin(Write::LIST);
        let res: Result<(), _> =
            core.settle(ticket, Err(ApiError::http(500, "boom").into()), |_, _| {});
        assert!(res.is_err());
        let state = core.snapshot();
        assert!(!state.lifecycle.loading);
        assert_eq!(state.lifecycle.error.as_deref(), Some("boom"));

        // next pending clears the error
        let _ticket = core.begin(Write::LIST);
        assert!(core.snapshot().lifecycle.error.is_none());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let core = StoreCore::new("test", TestState::default());

        let first = core.begin(Write::LIST);
        let second = core.begin(Write::LIST);

        let _ = core.settle(second, Ok(vec![item(2, "new")]), |s, items| {
            s.items.replace_all(items.clone())
        });
        let _ = core.settle(first, Ok(vec![item(1, "old")]), |s, items| {
            s.items.replace_all(items.clone())
        });

        let state = core.snapshot();
        assert_eq!(state.items.as_slice(), &[item(2, "new")]);
        assert!(!state.lifecycle.loading);
    }

    #[test]
    fn test_stale_response_keeps_loading_for_newer_request() {
        let core = StoreCore::new("test", TestState::default());
        let first = core.begin(Write::LIST);
        let _second = core.begin(Write::LIST);

        let _ = core.settle(first, Ok(()), |_, _| {});
        assert!(core.snapshot().lifecycle.loading);
    }

    #[test]
    fn test_overlapping_merges_all_land() {
        let core = StoreCore::new("test", TestState::default());
        let first = core.begin(Write::Merge);
        let second = core.begin(Write::Merge);

        let _ = core.settle(second, Ok(item(11, "b")), |s, i| s.items.append(i.clone()));
        assert!(core.snapshot().lifecycle.loading);
        let _ = core.settle(first, Ok(item(10, "a")), |s, i| s.items.append(i.clone()));

        let state = core.snapshot();
        let ids: Vec<_> = state.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, [11, 10]);
        assert!(!state.lifecycle.loading);
    }

    #[test]
    fn test_merge_does_not_make_fetch_stale() {
        let core = StoreCore::new("test", TestState::default());
        let fetch = core.begin(Write::LIST);
        let create = core.begin(Write::Merge);

        let _ = core.settle(create, Ok(item(3, "c")), |s, i| s.items.append(i.clone()));
        let _ = core.settle(fetch, Ok(vec![item(1, "a"), item(3, "c")]), |s, items| {
            s.items.replace_all(items.clone())
        });

        let state = core.snapshot();
        assert_eq!(state.items.len(), 2);
        assert!(!state.lifecycle.loading);
    }

    #[test]
    fn test_slots_are_tracked_separately() {
        let core = StoreCore::new("test", TestState::default());
        let list = core.begin(Write::LIST);
        let selected = core.begin(Write::SELECTED);

        let _ = core.settle(selected, Ok(()), |_, _| {});
        let res = core.settle(list, Ok(vec![item(1, "a")]), |s, items| {
            s.items.replace_all(items.clone())
        });
        assert!(res.is_ok());
        assert_eq!(core.snapshot().items.len(), 1);
    }

    #[test]
    fn test_closed_store_ignores_responses() {
        let core = StoreCore::new("test", TestState::default());
        let ticket = core.begin(Write::LIST);
        let token = core.request_token();
        core.close();
        assert!(token.is_cancelled());
        assert!(core.is_closed());

        let res: Result<(), _> = core.settle(ticket, Err(ApiError::Cancelled.into()), |_, _| {});
        assert!(res.unwrap_err().is_cancelled());
        assert!(core.snapshot().lifecycle.error.is_none());
    }

    #[test]
    fn test_reject_sets_error_without_io() {
        let core = StoreCore::new("test", TestState::default());
        let res: Result<(), _> = core.reject(StoreError::permission("Only admin can delete service"));
        assert!(res.is_err());
        let state = core.snapshot();
        assert!(!state.lifecycle.loading);
        assert_eq!(
            state.lifecycle.error.as_deref(),
            Some("Only admin can delete service")
        );
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(Some(Role::Admin), &[Role::Admin, Role::Provider], "no").is_ok());
        assert!(require_role(Some(Role::Customer), &[Role::Admin], "no").is_err());
        assert!(require_role(None, &[Role::Admin], "no").is_err());
    }
}
