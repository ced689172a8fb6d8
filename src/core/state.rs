//! Track state and the ownership status triple.
//!
//! A track's status is the `(state, owner, threatened_by)` triple. Only the
//! combinations accepted by [`TrackStatus::violation`] are ever stored.

use super::ids::{PlayerId, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a track in the ownership state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackState {
    /// Unowned, or owned with no lock and no threat.
    Default,
    /// Owned, with a hunter recorded against it.
    AtRisk,
    /// Owned and locked; a challenger win only breaks the lock.
    Locked,
}

impl TrackState {
    /// Display name for logs and listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::AtRisk => "AtRisk",
            Self::Locked => "Locked",
        }
    }

    /// Integer encoding used by the `tracks.state` column.
    pub fn code(&self) -> i64 {
        match self {
            Self::Locked => 1,
            Self::Default => 0,
            Self::AtRisk => -1,
        }
    }

    /// Inverse of [`TrackState::code`].
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Locked),
            0 => Some(Self::Default),
            -1 => Some(Self::AtRisk),
            _ => None,
        }
    }

    /// Parse the labels accepted by track listing filters.
    ///
    /// ```rust
    /// use trackward::core::TrackState;
    ///
    /// assert_eq!(TrackState::parse_label("at-risk"), Some(TrackState::AtRisk));
    /// assert_eq!(TrackState::parse_label("LOCKED"), Some(TrackState::Locked));
    /// assert_eq!(TrackState::parse_label("any"), None);
    /// ```
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "locked" => Some(Self::Locked),
            "default" => Some(Self::Default),
            "at-risk" | "atrisk" | "at_risk" => Some(Self::AtRisk),
            _ => None,
        }
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ownership status of a single track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackStatus {
    pub state: TrackState,
    pub owner: Option<PlayerId>,
    /// The hunter. Present iff `state` is [`TrackState::AtRisk`].
    pub threatened_by: Option<PlayerId>,
}

impl Default for TrackStatus {
    fn default() -> Self {
        Self::unowned()
    }
}

impl TrackStatus {
    /// Neutral status every track starts a season in.
    pub const fn unowned() -> Self {
        Self {
            state: TrackState::Default,
            owner: None,
            threatened_by: None,
        }
    }

    pub const fn owned(owner: PlayerId) -> Self {
        Self {
            state: TrackState::Default,
            owner: Some(owner),
            threatened_by: None,
        }
    }

    pub const fn locked(owner: PlayerId) -> Self {
        Self {
            state: TrackState::Locked,
            owner: Some(owner),
            threatened_by: None,
        }
    }

    pub const fn at_risk(owner: PlayerId, hunter: PlayerId) -> Self {
        Self {
            state: TrackState::AtRisk,
            owner: Some(owner),
            threatened_by: Some(hunter),
        }
    }

    pub fn is_unowned(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    /// Describe the invariant this status breaks, if any.
    ///
    /// ```rust
    /// use trackward::core::{PlayerId, TrackState, TrackStatus};
    ///
    /// assert!(TrackStatus::at_risk(PlayerId(1), PlayerId(2)).violation().is_none());
    ///
    /// let broken = TrackStatus {
    ///     state: TrackState::Locked,
    ///     owner: None,
    ///     threatened_by: None,
    /// };
    /// assert!(broken.violation().is_some());
    /// ```
    pub fn violation(&self) -> Option<&'static str> {
        match (self.state, self.owner, self.threatened_by) {
            (TrackState::Default, _, None) => None,
            (TrackState::Default, _, Some(_)) => Some("default track carries a hunter"),
            (TrackState::Locked, Some(_), None) => None,
            (TrackState::Locked, None, _) => Some("locked track has no owner"),
            (TrackState::Locked, Some(_), Some(_)) => Some("locked track carries a hunter"),
            (TrackState::AtRisk, Some(owner), Some(hunter)) if owner == hunter => {
                Some("owner is hunting their own track")
            }
            (TrackState::AtRisk, Some(_), Some(_)) => None,
            (TrackState::AtRisk, None, _) => Some("at-risk track has no owner"),
            (TrackState::AtRisk, Some(_), None) => Some("at-risk track has no hunter"),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.violation().is_none()
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        if let Some(owner) = self.owner {
            write!(f, " owner={owner}")?;
        }
        if let Some(hunter) = self.threatened_by {
            write!(f, " hunter={hunter}")?;
        }
        Ok(())
    }
}

/// Value copy of one track's status at a point in time.
///
/// Events store snapshots, never live tracks, so later mutation of the
/// registry cannot rewrite what an event recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub track: TrackId,
    pub status: TrackStatus,
}

impl TrackSnapshot {
    pub fn new(track: TrackId, status: TrackStatus) -> Self {
        Self { track, status }
    }
}
