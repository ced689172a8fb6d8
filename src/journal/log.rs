//! Append-mostly event log for one season.

use super::event::{Event, EventDetail, EventKind, SideEffect};
use crate::core::{EventId, PlayerId, SeasonId, TrackId, TrackSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing order for [`EventLog::list`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filters accepted by [`EventLog::list`]. The default lists every live
/// event, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub player: Option<PlayerId>,
    pub track: Option<TrackId>,
    pub include_reversed: bool,
    pub order: Order,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn involving(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    pub fn track(mut self, track: TrackId) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_reversed(mut self) -> Self {
        self.include_reversed = true;
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.order = Order::OldestFirst;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.include_reversed || !event.is_reversed())
            && self.kind.is_none_or(|kind| event.kind() == kind)
            && self.player.is_none_or(|player| event.involves(player))
            && self.track.is_none_or(|track| event.touches(track))
    }
}

/// Ordered events of a single season. Entries are only ever appended or
/// flagged as reversed; ids increase strictly and are never reused.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Id the next appended event will receive.
    pub fn next_id(&self) -> EventId {
        EventId(self.next_id.max(1))
    }

    /// Draft and append an event stamped with the current time.
    pub fn record(
        &mut self,
        season: SeasonId,
        detail: EventDetail,
        pre: Vec<TrackSnapshot>,
        post: Vec<TrackSnapshot>,
        side_effects: Option<SideEffect>,
    ) -> EventId {
        let event = Event {
            id: self.next_id(),
            season,
            occurred_at: Utc::now(),
            detail,
            pre,
            post,
            side_effects,
            reversed_at: None,
        };
        self.push(event)
    }

    /// Append a fully formed event. Its id must not precede
    /// [`EventLog::next_id`].
    pub(crate) fn push(&mut self, event: Event) -> EventId {
        debug_assert!(event.id >= self.next_id(), "event ids must increase");
        let id = event.id;
        self.next_id = id.get() + 1;
        self.events.push(event);
        id
    }

    pub(crate) fn mark_reversed(&mut self, id: EventId, at: DateTime<Utc>) -> bool {
        match self.events.iter_mut().find(|event| event.id == id) {
            Some(event) if !event.is_reversed() => {
                event.reversed_at = Some(at);
                true
            }
            _ => false,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Newest entry, reversed or not.
    pub fn newest(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Newest entry that has not been undone; the undo target.
    pub fn newest_live(&self) -> Option<&Event> {
        self.events.iter().rev().find(|event| !event.is_reversed())
    }

    pub fn live(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|event| !event.is_reversed())
    }

    pub fn list(&self, filter: &EventFilter) -> Vec<&Event> {
        let matching = self.events.iter().filter(|event| filter.matches(event));
        let limit = filter.limit.unwrap_or(usize::MAX);
        match filter.order {
            Order::NewestFirst => matching.rev().take(limit).collect(),
            Order::OldestFirst => matching.take(limit).collect(),
        }
    }
}
