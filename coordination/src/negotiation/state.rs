//! Pair negotiation statuses and transition rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClassroomError, ClassroomResult};

/// Negotiation status of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    /// Both members still have to pick a mechanism.
    ChoosingMechanism,
    /// Shotgun: side A has not offered yet. Timed: clock not started or running.
    WaitingForOffer,
    /// Shotgun offer on the table, side B to respond.
    Offered,
    /// Timed price locked, the other side to choose.
    WaitingForFinalChoice,
    /// Settled.
    Complete,
}

impl PairStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(self) -> &'static [PairStatus] {
        match self {
            Self::ChoosingMechanism => &[Self::WaitingForOffer],
            Self::WaitingForOffer => &[Self::Offered, Self::WaitingForFinalChoice],
            Self::Offered => &[Self::Complete],
            Self::WaitingForFinalChoice => &[Self::Complete],
            Self::Complete => &[],
        }
    }

    pub(crate) fn expect(self, expected: PairStatus, pair_id: &str) -> ClassroomResult<()> {
        if self == expected {
            Ok(())
        } else {
            Err(ClassroomError::InvalidState {
                pair_id: pair_id.to_string(),
                expected: expected.to_string(),
                actual: self.to_string(),
            })
        }
    }
}

impl std::fmt::Display for PairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChoosingMechanism => write!(f, "choosing_mechanism"),
            Self::WaitingForOffer => write!(f, "waiting_for_offer"),
            Self::Offered => write!(f, "offered"),
            Self::WaitingForFinalChoice => write!(f, "waiting_for_final_choice"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Negotiation mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// Immediate offer: side A names a price, side B buys or sells at it.
    Shotgun,
    /// Descending price clock: first to lock names the price.
    #[serde(alias = "timedauction")]
    TimedAuction,
}

impl Mechanism {
    pub const ALL: [Mechanism; 2] = [Mechanism::Shotgun, Mechanism::TimedAuction];

    pub fn parse(value: &str) -> ClassroomResult<Self> {
        match value {
            "shotgun" => Ok(Self::Shotgun),
            "timed_auction" | "timedauction" => Ok(Self::TimedAuction),
            other => Err(ClassroomError::InvalidChoice {
                value: other.to_string(),
                allowed: "shotgun, timed_auction".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shotgun => write!(f, "shotgun"),
            Self::TimedAuction => write!(f, "timed_auction"),
        }
    }
}

/// The responder's final decision at the agreed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeChoice {
    /// Responder buys the other side's stake.
    Buy,
    /// Responder sells their own stake.
    Sell,
}

impl TradeChoice {
    pub fn parse(value: &str) -> ClassroomResult<Self> {
        match value {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(ClassroomError::InvalidChoice {
                value: other.to_string(),
                allowed: "buy, sell".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TradeChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// A status transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairTransition {
    pub from: PairStatus,
    pub to: PairStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_is_terminal() {
        assert!(PairStatus::Complete.is_terminal());
        assert!(PairStatus::Complete.valid_transitions().is_empty());
        assert!(!PairStatus::Offered.is_terminal());
    }

    #[test]
    fn test_transitions_never_regress() {
        let order = [
            PairStatus::ChoosingMechanism,
            PairStatus::WaitingForOffer,
            PairStatus::Offered,
            PairStatus::WaitingForFinalChoice,
            PairStatus::Complete,
        ];
        let rank = |s: PairStatus| order.iter().position(|o| *o == s).unwrap();
        for status in order {
            for next in status.valid_transitions() {
                assert!(rank(*next) > rank(status), "{status} -> {next}");
            }
        }
    }

    #[test]
    fn test_expect() {
        assert!(PairStatus::Offered.expect(PairStatus::Offered, "p").is_ok());
        let err = PairStatus::Complete
            .expect(PairStatus::Offered, "pair-1")
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert!(err.to_string().contains("complete"));
    }

    #[test]
    fn test_parse_wire_values() {
        assert_eq!(Mechanism::parse("timedauction").unwrap(), Mechanism::TimedAuction);
        assert_eq!(Mechanism::parse("shotgun").unwrap(), Mechanism::Shotgun);
        assert!(Mechanism::parse("auction").is_err());
        assert_eq!(TradeChoice::parse("sell").unwrap(), TradeChoice::Sell);
        assert_eq!(TradeChoice::parse("hold").unwrap_err().code(), "INVALID_CHOICE");
    }

    #[test]
    fn test_display() {
        assert_eq!(PairStatus::WaitingForFinalChoice.to_string(), "waiting_for_final_choice");
        assert_eq!(Mechanism::TimedAuction.to_string(), "timed_auction");
        assert_eq!(TradeChoice::Buy.to_string(), "buy");
    }
}
