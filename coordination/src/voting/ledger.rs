//! Vote ledgers and frozen results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::VoteOption;
use super::tally::{tally, winning_option, Tally};
use crate::state::ParticipantId;

/// One participant's ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "O: VoteOption")]
pub struct Vote<O: VoteOption> {
    pub participant_id: ParticipantId,
    pub name: String,
    pub choice: O,
    pub submitted_at: DateTime<Utc>,
}

/// Name and choice, as shown in a revealed breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "O: VoteOption")]
pub struct VoterChoice<O: VoteOption> {
    pub name: String,
    pub choice: O,
}

/// One vote per participant; resubmission overwrites in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "O: VoteOption")]
pub struct VoteLedger<O: VoteOption> {
    votes: Vec<Vote<O>>,
}

impl<O: VoteOption> VoteLedger<O> {
    pub fn new() -> Self {
        Self { votes: Vec::new() }
    }

    /// Record a vote. Returns `true` when it replaced an earlier one.
    pub fn record(
        &mut self,
        participant_id: &str,
        name: &str,
        choice: O,
        submitted_at: DateTime<Utc>,
    ) -> bool {
        if let Some(existing) = self
            .votes
            .iter_mut()
            .find(|v| v.participant_id == participant_id)
        {
            existing.choice = choice;
            existing.submitted_at = submitted_at;
            return true;
        }
        self.votes.push(Vote {
            participant_id: participant_id.to_string(),
            name: name.to_string(),
            choice,
            submitted_at,
        });
        false
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn votes(&self) -> &[Vote<O>] {
        &self.votes
    }

    pub fn choice_of(&self, participant_id: &str) -> Option<O> {
        self.votes
            .iter()
            .find(|v| v.participant_id == participant_id)
            .map(|v| v.choice)
    }

    /// Live counts over every option.
    pub fn counts(&self) -> Tally<O> {
        tally(self.votes.iter().map(|v| v.choice), O::ALL)
    }

    pub fn breakdown(&self) -> Vec<VoterChoice<O>> {
        self.votes
            .iter()
            .map(|v| VoterChoice {
                name: v.name.clone(),
                choice: v.choice,
            })
            .collect()
    }
}

impl<O: VoteOption> Default for VoteLedger<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result summary for one ballot.
///
/// Stays hidden (zero counts, no breakdown) until revealed; a reveal freezes
/// the ledger at that instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "O: VoteOption")]
pub struct VoteResult<O: VoteOption> {
    pub counts: Tally<O>,
    pub revealed: bool,
    /// Plurality winner. Only computed for ballots that pick a winner.
    pub winner: Option<O>,
    pub breakdown: Vec<VoterChoice<O>>,
    pub revealed_at: Option<DateTime<Utc>>,
}

impl<O: VoteOption> VoteResult<O> {
    pub fn hidden() -> Self {
        Self {
            counts: Tally::zeroed(),
            revealed: false,
            winner: None,
            breakdown: Vec::new(),
            revealed_at: None,
        }
    }

    /// Freeze `ledger` into a revealed result.
    pub fn freeze(ledger: &VoteLedger<O>, with_winner: bool, at: DateTime<Utc>) -> Self {
        let counts = ledger.counts();
        let winner = if with_winner {
            winning_option(&counts)
        } else {
            None
        };
        Self {
            counts,
            revealed: true,
            winner,
            breakdown: ledger.breakdown(),
            revealed_at: Some(at),
        }
    }
}

impl<O: VoteOption> Default for VoteResult<O> {
    fn default() -> Self {
        Self::hidden()
    }
}
