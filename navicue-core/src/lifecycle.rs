//! Content lifecycle state machine
//!
//! DRAFT → REVIEW → PUBLISHED → DEPRECATED, plus REVIEW → DRAFT (rejection).
//! DEPRECATED is terminal. The machine only validates; deciding when an item
//! moves is an administrative action outside the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InvalidTransitionError, LifecycleError};

/// Lifecycle status of a content item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Being written
    #[default]
    Draft,
    /// Awaiting clinical review
    Review,
    /// Live in the library
    Published,
    /// Sunset; kept for history, never removed
    Deprecated,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Draft,
        Status::Review,
        Status::Published,
        Status::Deprecated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Review => "review",
            Status::Published => "published",
            Status::Deprecated => "deprecated",
        }
    }

    /// Statuses reachable from this one in a single step
    pub fn successors(self) -> &'static [Status] {
        match self {
            Status::Draft => &[Status::Review],
            Status::Review => &[Status::Published, Status::Draft],
            Status::Published => &[Status::Deprecated],
            Status::Deprecated => &[],
        }
    }

    pub fn can_transition_to(self, to: Status) -> bool {
        self.successors().contains(&to)
    }

    /// Check if status is terminal
    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is asking for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Writes content and submits it for review
    Author,
    /// Approves or rejects submitted content
    Reviewer,
    /// May perform any valid transition, including sunsetting
    Administrator,
}

impl Role {
    fn permits(self, from: Status, to: Status) -> bool {
        match self {
            Role::Administrator => true,
            Role::Author => matches!((from, to), (Status::Draft, Status::Review)),
            Role::Reviewer => matches!(
                (from, to),
                (Status::Review, Status::Published) | (Status::Review, Status::Draft)
            ),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Administrator => "administrator",
        };
        f.write_str(name)
    }
}

/// Validate a single transition
///
/// Returns the new status so calls chain with `?`.
pub fn transition(from: Status, to: Status) -> Result<Status, InvalidTransitionError> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(InvalidTransitionError { from, to })
    }
}

/// Validate a transition for a specific role
///
/// Invalid transitions are reported as such regardless of role.
pub fn authorize(role: Role, from: Status, to: Status) -> Result<Status, LifecycleError> {
    let to = transition(from, to)?;
    if role.permits(from, to) {
        Ok(to)
    } else {
        Err(LifecycleError::Unauthorized { role, from, to })
    }
}

/// Record of an applied status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub item_id: String,
    pub from: Status,
    pub to: Status,
    pub role: Role,
    pub transitioned_at: DateTime<Utc>,
}
