//! Order lifecycle status and transition policy.
//!
//! All status knowledge lives here: stage order, display labels, parsing and
//! whether a move between two statuses is allowed. Callers ask
//! [`TransitionPolicy::allows`] instead of matching on statuses themselves.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a status or policy string cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

/// Fulfillment stage of an order.
///
/// Orders start as [`OrderStatus::New`] when checkout commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet picked.
    #[default]
    New,
    /// Being assembled in the warehouse.
    Assembling,
    /// Handed over to the customer.
    Completed,
}

impl OrderStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 3] = [Self::New, Self::Assembling, Self::Completed];

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Assembling => "Assembling",
            Self::Completed => "Completed",
        }
    }

    /// Machine name, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Assembling => "assembling",
            Self::Completed => "completed",
        }
    }

    /// The following stage, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::Assembling),
            Self::Assembling => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Returns `true` once the order needs no further handling.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether an order in this status may be moved to `to` under `policy`.
    #[must_use]
    pub fn can_transition_to(self, to: Self, policy: TransitionPolicy) -> bool {
        policy.allows(self, to)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "assembling" => Ok(Self::Assembling),
            "completed" => Ok(Self::Completed),
            _ => Err(StatusParseError {
                kind: "order status",
                value: s.to_owned(),
            }),
        }
    }
}

/// Rule deciding which status changes an operator may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPolicy {
    /// Any status may be set to any other status.
    #[default]
    Permissive,
    /// Status may only stay put or move to a later stage.
    ForwardOnly,
}

impl TransitionPolicy {
    /// Whether `from -> to` is allowed under this policy.
    #[must_use]
    pub fn allows(self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            Self::Permissive => true,
            Self::ForwardOnly => to >= from,
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permissive => f.write_str("permissive"),
            Self::ForwardOnly => f.write_str("forward-only"),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "forward-only" | "forward_only" => Ok(Self::ForwardOnly),
            _ => Err(StatusParseError {
                kind: "transition policy",
                value: s.to_owned(),
            }),
        }
    }
}
