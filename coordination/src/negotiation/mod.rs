//! Paired negotiation: the buy-sell exercise run by each pair.
//!
//! Each pair runs an explicit state machine. The mechanism (shotgun offer or
//! timed descending auction) is either voted on by the pair or fixed by the
//! session when the pair is created.
//!
//! # Pair Flow
//!
//! ```text
//! ChoosingMechanism ──(both voted)──▶ WaitingForOffer
//!                                         │
//!           shotgun: side A offers ───────┼──────── timed: both ready, clock runs,
//!                     │                   │                 first side locks
//!                     ▼                   │                       │
//!                  Offered                │                       ▼
//!                     │                   │            WaitingForFinalChoice
//!     side B buys/sells                   │                       │
//!                     │                   │        other side buys/sells
//!                     └──────────────▶ Complete ◀─────────────────┘
//! ```
//!
//! Statuses only move forward; a completed pair rejects every further call.

pub mod clock;
pub mod pair;
pub mod state;

pub use clock::{price_after, price_at};
pub use pair::{
    MechanismVote, MechanismVotes, Offer, Pair, PairMember, PriceLock, ReadyOutcome, Settlement,
    SideFlags,
};
pub use state::{Mechanism, PairStatus, PairTransition, TradeChoice};
