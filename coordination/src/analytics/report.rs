//! Session analytics report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats::{MechanismAdoption, PriceStats};
use crate::negotiation::{Mechanism, Pair, PairStatus, TradeChoice};
use crate::phase::Phase;
use crate::state::{PairId, Session, SessionId};
use crate::voting::{winning_option, FrameworkChoice, Remedy, Tally, VoteLedger, VoteOption, VoterChoice};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Ballot totals with the per-voter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "O: VoteOption")]
pub struct BallotSummary<O: VoteOption> {
    pub total_votes: usize,
    pub counts: Tally<O>,
    pub voters: Vec<VoterChoice<O>>,
}

impl<O: VoteOption> BallotSummary<O> {
    fn from_ledger(ledger: &VoteLedger<O>) -> Self {
        Self {
            total_votes: ledger.len(),
            counts: ledger.counts(),
            voters: ledger.breakdown(),
        }
    }
}

/// One row per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairOutcome {
    pub pair_id: PairId,
    pub side_a_name: String,
    pub side_b_name: String,
    pub status: PairStatus,
    pub mechanism: Option<Mechanism>,
    pub mechanism_agreed: Option<bool>,
    pub offer_price: Option<u64>,
    pub locked_price: Option<u64>,
    pub choice: Option<TradeChoice>,
    pub final_price: Option<u64>,
    pub buyer_name: Option<String>,
    pub seller_name: Option<String>,
    pub outcome: Option<String>,
}

impl PairOutcome {
    fn from_pair(pair: &Pair) -> Self {
        let settlement = pair.settlement.as_ref();
        let name_of = |id: &str| pair.member(id).ok().map(|m| m.name.clone());
        Self {
            pair_id: pair.id.clone(),
            side_a_name: pair.side_a.name.clone(),
            side_b_name: pair.side_b.name.clone(),
            status: pair.status,
            mechanism: pair.mechanism,
            mechanism_agreed: pair.mechanism_agreed,
            offer_price: pair.offer.as_ref().map(|o| o.price),
            locked_price: pair.lock.as_ref().map(|l| l.price),
            choice: settlement.map(|s| s.choice),
            final_price: settlement.map(|s| s.final_price),
            buyer_name: settlement.and_then(|s| name_of(&s.buyer_id)),
            seller_name: settlement.and_then(|s| name_of(&s.seller_id)),
            outcome: pair.outcome_line(),
        }
    }
}

/// Aggregate view of a session for the instructor's debrief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub session_id: SessionId,
    pub phase: Phase,
    pub participant_count: usize,
    pub framework: BallotSummary<FrameworkChoice>,
    pub remedy: BallotSummary<Remedy>,
    pub winning_remedy: Option<Remedy>,
    pub negotiation_mode: Option<Mechanism>,
    pub pairs: Vec<PairOutcome>,
    pub completed_pairs: usize,
    pub total_pairs: usize,
    pub price_stats: Option<PriceStats>,
    pub mechanism_adoption: MechanismAdoption,
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsReport {
    pub fn build(session: &Session, now: DateTime<Utc>) -> Self {
        // The frozen result wins; otherwise the live plurality, if anyone voted.
        let winning_remedy = if session.remedy_result.revealed {
            session.remedy_result.winner
        } else if session.remedy_votes.is_empty() {
            None
        } else {
            winning_option(&session.remedy_votes.counts())
        };

        let prices: Vec<u64> = session
            .pairs
            .iter()
            .filter_map(|p| p.settlement.as_ref().map(|s| s.final_price))
            .collect();

        Self {
            session_id: session.id.clone(),
            phase: session.phase,
            participant_count: session.participants.len(),
            framework: BallotSummary::from_ledger(&session.framework_votes),
            remedy: BallotSummary::from_ledger(&session.remedy_votes),
            winning_remedy,
            negotiation_mode: session.negotiation_mode,
            pairs: session.pairs.iter().map(PairOutcome::from_pair).collect(),
            completed_pairs: prices.len(),
            total_pairs: session.pairs.len(),
            price_stats: PriceStats::from_prices(&prices),
            mechanism_adoption: MechanismAdoption::from_pairs(&session.pairs),
            generated_at: now,
        }
    }
}
