//! Option sets for the class-wide ballots.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{ClassroomError, ClassroomResult};

/// A ballot option with a fixed declaration order.
pub trait VoteOption:
    Copy + Ord + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every option, in declaration order.
    const ALL: &'static [Self];

    /// Parse a wire value, rejecting anything outside [`Self::ALL`].
    fn parse(value: &str) -> ClassroomResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|option| option.to_string() == value)
            .ok_or_else(|| ClassroomError::InvalidChoice {
                value: value.to_string(),
                allowed: Self::ALL
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Phase 1 ballot: which legal framework fits the dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkChoice {
    Oppression,
    Dissolution,
    Partnership,
}

impl VoteOption for FrameworkChoice {
    const ALL: &'static [Self] = &[Self::Oppression, Self::Dissolution, Self::Partnership];
}

impl std::fmt::Display for FrameworkChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oppression => write!(f, "oppression"),
            Self::Dissolution => write!(f, "dissolution"),
            Self::Partnership => write!(f, "partnership"),
        }
    }
}

/// Phase 2 ballot: which remedy the class recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remedy {
    Buyout,
    Shotgun,
    #[serde(alias = "timedauction")]
    TimedAuction,
    Liquidation,
}

impl VoteOption for Remedy {
    const ALL: &'static [Self] = &[
        Self::Buyout,
        Self::Shotgun,
        Self::TimedAuction,
        Self::Liquidation,
    ];

    fn parse(value: &str) -> ClassroomResult<Self> {
        // Older clients send the collapsed spelling.
        let value = if value == "timedauction" {
            "timed_auction"
        } else {
            value
        };
        Self::ALL
            .iter()
            .copied()
            .find(|option| option.to_string() == value)
            .ok_or_else(|| ClassroomError::InvalidChoice {
                value: value.to_string(),
                allowed: "buyout, shotgun, timed_auction, liquidation".to_string(),
            })
    }
}

impl std::fmt::Display for Remedy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyout => write!(f, "buyout"),
            Self::Shotgun => write!(f, "shotgun"),
            Self::TimedAuction => write!(f, "timed_auction"),
            Self::Liquidation => write!(f, "liquidation"),
        }
    }
}
