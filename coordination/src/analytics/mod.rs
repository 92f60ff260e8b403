//! Post-session analytics: ballots, pair outcomes and price statistics.

pub mod report;
pub mod stats;

pub use report::{AnalyticsReport, BallotSummary, PairOutcome};
pub use stats::{MechanismAdoption, PriceStats};
