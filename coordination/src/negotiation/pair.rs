//! A pair and its negotiation state machine.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clock::price_at;
use super::state::{Mechanism, PairStatus, PairTransition, TradeChoice};
use crate::config::LockPricePolicy;
use crate::error::{ClassroomError, ClassroomResult};
use crate::state::{PairId, ParticipantId, Side};

/// One member of a pair, fixed at pairing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMember {
    pub id: ParticipantId,
    pub name: String,
    pub side: Side,
}

/// Mechanism preference per side. Never serialized; observers see
/// [`Pair::mechanism_voted`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MechanismVotes {
    pub side_a: Option<Mechanism>,
    pub side_b: Option<Mechanism>,
}

impl MechanismVotes {
    fn slot(&mut self, side: Side) -> &mut Option<Mechanism> {
        match side {
            Side::A => &mut self.side_a,
            Side::B => &mut self.side_b,
        }
    }
}

/// One boolean per side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideFlags {
    pub side_a: bool,
    pub side_b: bool,
}

impl SideFlags {
    fn set(&mut self, side: Side) {
        match side {
            Side::A => self.side_a = true,
            Side::B => self.side_b = true,
        }
    }

    pub fn both(&self) -> bool {
        self.side_a && self.side_b
    }
}

/// A shotgun offer on the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub price: u64,
    pub offeror_id: ParticipantId,
    pub made_at: DateTime<Utc>,
}

/// A locked timed-auction price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLock {
    pub price: u64,
    pub locked_by: ParticipantId,
    pub locked_at: DateTime<Utc>,
    /// Whose clock produced `price`.
    pub source: LockPricePolicy,
}

/// The completed transaction. Set once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub final_price: u64,
    pub choice: TradeChoice,
    pub responder_id: ParticipantId,
    pub buyer_id: ParticipantId,
    pub seller_id: ParticipantId,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of a mechanism preference vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MechanismVote {
    /// Stored; the partner has not voted yet.
    Recorded,
    /// Both sides have voted and the mechanism is fixed.
    Decided { mechanism: Mechanism, agreed: bool },
}

/// Outcome of a readiness signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// Stored; the partner is not ready yet.
    Waiting,
    /// This signal completed the handshake and started the clock.
    Started { started_at: DateTime<Utc> },
    /// The clock was already running.
    AlreadyRunning { started_at: DateTime<Utc> },
}

/// Two participants from opposite sides negotiating a buy-sell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub id: PairId,
    pub side_a: PairMember,
    pub side_b: PairMember,
    pub status: PairStatus,
    /// Chosen mechanism; `None` while the pair is still voting.
    pub mechanism: Option<Mechanism>,
    #[serde(skip)]
    pub mechanism_votes: MechanismVotes,
    /// Which sides have voted; the preferences themselves stay private.
    pub mechanism_voted: SideFlags,
    /// `Some(true)` when both sides voted the same way, `Some(false)` after a coin flip.
    pub mechanism_agreed: Option<bool>,
    pub offer: Option<Offer>,
    pub ready: SideFlags,
    pub auction_started_at: Option<DateTime<Utc>>,
    pub lock: Option<PriceLock>,
    pub settlement: Option<Settlement>,
    pub transitions: Vec<PairTransition>,
    pub created_at: DateTime<Utc>,
}

impl Pair {
    /// Create a pair. With `mechanism` set the pair skips the mechanism vote.
    pub fn new(
        id: PairId,
        side_a: PairMember,
        side_b: PairMember,
        mechanism: Option<Mechanism>,
        now: DateTime<Utc>,
    ) -> Self {
        let status = if mechanism.is_some() {
            PairStatus::WaitingForOffer
        } else {
            PairStatus::ChoosingMechanism
        };
        Self {
            id,
            side_a,
            side_b,
            status,
            mechanism,
            mechanism_votes: MechanismVotes::default(),
            mechanism_voted: SideFlags::default(),
            mechanism_agreed: None,
            offer: None,
            ready: SideFlags::default(),
            auction_started_at: None,
            lock: None,
            settlement: None,
            transitions: Vec::new(),
            created_at: now,
        }
    }

    pub fn new_id() -> PairId {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("pair-{}", &id[..8])
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.side_a.id == participant_id || self.side_b.id == participant_id
    }

    /// The member acting as `participant_id`, or `NotFound` if they are not in this pair.
    pub fn member(&self, participant_id: &str) -> ClassroomResult<&PairMember> {
        if self.side_a.id == participant_id {
            Ok(&self.side_a)
        } else if self.side_b.id == participant_id {
            Ok(&self.side_b)
        } else {
            Err(ClassroomError::NotFound {
                kind: "participant in pair",
                id: participant_id.to_string(),
            })
        }
    }

    pub fn partner_of(&self, participant_id: &str) -> Option<&PairMember> {
        if self.side_a.id == participant_id {
            Some(&self.side_b)
        } else if self.side_b.id == participant_id {
            Some(&self.side_a)
        } else {
            None
        }
    }

    pub fn member_on(&self, side: Side) -> &PairMember {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    /// Displayed timed-auction price at `at`, once the clock runs.
    pub fn current_price(&self, start_price: u64, drop_per_second: u64, at: DateTime<Utc>) -> Option<u64> {
        self.auction_started_at
            .map(|started_at| price_at(start_price, drop_per_second, started_at, at))
    }

    fn transition(&mut self, to: PairStatus, reason: &str, now: DateTime<Utc>) -> ClassroomResult<()> {
        if !self.status.valid_transitions().contains(&to) {
            return Err(ClassroomError::InvalidState {
                pair_id: self.id.clone(),
                expected: format!("a status that may move to {}", to),
                actual: self.status.to_string(),
            });
        }
        self.transitions.push(PairTransition {
            from: self.status,
            to,
            timestamp: now,
            reason: reason.to_string(),
        });
        debug!(pair_id = %self.id, from = %self.status, to = %to, reason, "Pair transition");
        self.status = to;
        Ok(())
    }

    fn expect_mechanism(&self, expected: Mechanism) -> ClassroomResult<()> {
        match self.mechanism {
            Some(m) if m == expected => Ok(()),
            other => Err(ClassroomError::InvalidState {
                pair_id: self.id.clone(),
                expected: format!("{} ({})", self.status, expected),
                actual: format!(
                    "{} ({})",
                    self.status,
                    other.map_or_else(|| "undecided".to_string(), |m| m.to_string())
                ),
            }),
        }
    }

    // =========================================================================
    // Mechanism selection
    // =========================================================================

    /// Record a mechanism preference.
    ///
    /// A repeat vote from the same side overwrites the earlier one. When the
    /// second side votes, matching preferences are adopted as agreed; a
    /// mismatch is settled by a fair coin from `rng`.
    pub fn vote_mechanism<R: Rng + ?Sized>(
        &mut self,
        participant_id: &str,
        mechanism: Mechanism,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> ClassroomResult<MechanismVote> {
        self.status.expect(PairStatus::ChoosingMechanism, &self.id)?;
        let side = self.member(participant_id)?.side;

        *self.mechanism_votes.slot(side) = Some(mechanism);
        self.mechanism_voted.set(side);

        let (Some(a), Some(b)) = (self.mechanism_votes.side_a, self.mechanism_votes.side_b) else {
            debug!(pair_id = %self.id, participant_id, %mechanism, "Mechanism vote recorded");
            return Ok(MechanismVote::Recorded);
        };

        let (chosen, agreed) = if a == b {
            (a, true)
        } else if rng.gen_bool(0.5) {
            (Mechanism::Shotgun, false)
        } else {
            (Mechanism::TimedAuction, false)
        };

        self.mechanism = Some(chosen);
        self.mechanism_agreed = Some(agreed);
        let reason = if agreed {
            "mechanism agreed"
        } else {
            "mechanism drawn"
        };
        self.transition(PairStatus::WaitingForOffer, reason, now)?;
        info!(pair_id = %self.id, mechanism = %chosen, agreed, "Mechanism decided");

        Ok(MechanismVote::Decided {
            mechanism: chosen,
            agreed,
        })
    }

    // =========================================================================
    // Shotgun
    // =========================================================================

    /// Side A names a price.
    pub fn make_offer(
        &mut self,
        participant_id: &str,
        price: u64,
        now: DateTime<Utc>,
    ) -> ClassroomResult<Offer> {
        self.status.expect(PairStatus::WaitingForOffer, &self.id)?;
        self.expect_mechanism(Mechanism::Shotgun)?;
        let member = self.member(participant_id)?;
        if member.side != Side::A {
            return Err(ClassroomError::Validation(format!(
                "only side A makes the offer in pair {}",
                self.id
            )));
        }
        if price == 0 {
            return Err(ClassroomError::Validation("price must be positive".to_string()));
        }

        let offer = Offer {
            price,
            offeror_id: participant_id.to_string(),
            made_at: now,
        };
        self.offer = Some(offer.clone());
        self.transition(PairStatus::Offered, "offer made", now)?;
        info!(pair_id = %self.id, participant_id, price, "Offer made");
        Ok(offer)
    }

    /// Side B buys or sells at the offered price.
    pub fn respond(
        &mut self,
        participant_id: &str,
        choice: TradeChoice,
        now: DateTime<Utc>,
    ) -> ClassroomResult<Settlement> {
        self.status.expect(PairStatus::Offered, &self.id)?;
        let offer = self.offer.clone().ok_or_else(|| ClassroomError::InvalidState {
            pair_id: self.id.clone(),
            expected: "an offer on the table".to_string(),
            actual: "no offer".to_string(),
        })?;
        self.member(participant_id)?;
        if participant_id == offer.offeror_id {
            return Err(ClassroomError::Validation(
                "the offeror cannot respond to their own offer".to_string(),
            ));
        }

        self.settle(participant_id, &offer.offeror_id, offer.price, choice, now)
    }

    // =========================================================================
    // Timed auction
    // =========================================================================

    /// Mark a side ready. The clock starts when both sides are ready.
    pub fn signal_ready(
        &mut self,
        participant_id: &str,
        now: DateTime<Utc>,
    ) -> ClassroomResult<ReadyOutcome> {
        self.status.expect(PairStatus::WaitingForOffer, &self.id)?;
        self.expect_mechanism(Mechanism::TimedAuction)?;
        let side = self.member(participant_id)?.side;

        if let Some(started_at) = self.auction_started_at {
            return Ok(ReadyOutcome::AlreadyRunning { started_at });
        }

        self.ready.set(side);
        if !self.ready.both() {
            debug!(pair_id = %self.id, participant_id, "Auction ready signal");
            return Ok(ReadyOutcome::Waiting);
        }

        self.auction_started_at = Some(now);
        info!(pair_id = %self.id, started_at = %now, "Auction clock started");
        Ok(ReadyOutcome::Started { started_at: now })
    }

    /// Lock the descending price.
    ///
    /// With [`LockPricePolicy::ClientReported`] the price the client saw is
    /// stored as-is; with [`LockPricePolicy::ServerClock`] it is recomputed
    /// from the shared start time at `now`.
    #[allow(clippy::too_many_arguments)]
    pub fn lock_price(
        &mut self,
        participant_id: &str,
        reported_price: Option<u64>,
        policy: LockPricePolicy,
        start_price: u64,
        drop_per_second: u64,
        now: DateTime<Utc>,
    ) -> ClassroomResult<PriceLock> {
        self.status.expect(PairStatus::WaitingForOffer, &self.id)?;
        self.expect_mechanism(Mechanism::TimedAuction)?;
        let started_at = self.auction_started_at.ok_or_else(|| ClassroomError::InvalidState {
            pair_id: self.id.clone(),
            expected: "auction running".to_string(),
            actual: "auction not started".to_string(),
        })?;
        self.member(participant_id)?;

        let price = match policy {
            LockPricePolicy::ClientReported => reported_price.ok_or_else(|| {
                ClassroomError::Validation("price is required".to_string())
            })?,
            LockPricePolicy::ServerClock => price_at(start_price, drop_per_second, started_at, now),
        };
        if price == 0 {
            return Err(ClassroomError::Validation("price must be positive".to_string()));
        }

        let lock = PriceLock {
            price,
            locked_by: participant_id.to_string(),
            locked_at: now,
            source: policy,
        };
        self.lock = Some(lock.clone());
        self.transition(PairStatus::WaitingForFinalChoice, "price locked", now)?;
        info!(pair_id = %self.id, participant_id, price, "Price locked");
        Ok(lock)
    }

    /// The side that did not lock buys or sells at the locked price.
    pub fn final_choice(
        &mut self,
        participant_id: &str,
        choice: TradeChoice,
        now: DateTime<Utc>,
    ) -> ClassroomResult<Settlement> {
        self.status.expect(PairStatus::WaitingForFinalChoice, &self.id)?;
        let lock = self.lock.clone().ok_or_else(|| ClassroomError::InvalidState {
            pair_id: self.id.clone(),
            expected: "a locked price".to_string(),
            actual: "no lock".to_string(),
        })?;
        self.member(participant_id)?;
        if participant_id == lock.locked_by {
            return Err(ClassroomError::Validation(
                "the locking side cannot make the final choice".to_string(),
            ));
        }

        self.settle(participant_id, &lock.locked_by, lock.price, choice, now)
    }

    fn settle(
        &mut self,
        responder_id: &str,
        counterparty_id: &str,
        price: u64,
        choice: TradeChoice,
        now: DateTime<Utc>,
    ) -> ClassroomResult<Settlement> {
        let (buyer_id, seller_id) = match choice {
            TradeChoice::Buy => (responder_id, counterparty_id),
            TradeChoice::Sell => (counterparty_id, responder_id),
        };
        let settlement = Settlement {
            final_price: price,
            choice,
            responder_id: responder_id.to_string(),
            buyer_id: buyer_id.to_string(),
            seller_id: seller_id.to_string(),
            completed_at: now,
        };
        self.transition(PairStatus::Complete, "settled", now)?;
        self.settlement = Some(settlement.clone());
        info!(
            pair_id = %self.id,
            final_price = price,
            %choice,
            buyer_id,
            seller_id,
            "Negotiation complete"
        );
        Ok(settlement)
    }

    /// "<buyer> bought <seller>'s shares at $<price>", once settled.
    pub fn outcome_line(&self) -> Option<String> {
        let settlement = self.settlement.as_ref()?;
        let buyer = self.member(&settlement.buyer_id).ok()?;
        let seller = self.member(&settlement.seller_id).ok()?;
        Some(format!(
            "{} bought {}'s shares at ${}",
            buyer.name,
            seller.name,
            format_price(settlement.final_price)
        ))
    }
}

fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
