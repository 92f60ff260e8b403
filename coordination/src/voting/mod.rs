//! Vote tally engine for the two class-wide ballots.
//!
//! The framework ballot (phase 1) and the remedy ballot (phase 2) share one
//! ledger type and one pure tally. Results are derived on demand from the
//! ledger; a reveal freezes a snapshot including the per-voter breakdown.
//!
//! # Tie-break
//!
//! Plurality winner; ties go to the option declared first in the option
//! enum. Option enums derive `Ord` in declaration order, so the tally map
//! iterates in exactly that order.

pub mod ledger;
pub mod options;
pub mod tally;

pub use ledger::{Vote, VoteLedger, VoteResult, VoterChoice};
pub use options::{FrameworkChoice, Remedy, VoteOption};
pub use tally::{tally, winning_option, Tally};
