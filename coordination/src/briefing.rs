//! Role briefings: the private dossier each side receives in the buy-sell phase.
//!
//! A briefing only ever contains the caller's own side dossier and own
//! private valuation. The partner appears by name and side label only.

use serde::{Deserialize, Serialize};

use crate::error::{ClassroomError, ClassroomResult};
use crate::state::{PairId, ParticipantId, Session, Side};

/// A labelled piece of information only one side knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub label: String,
    pub text: String,
}

/// Character dossier for one side of the dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dossier {
    pub name: String,
    pub position: String,
    pub goal: String,
    pub strengths: String,
    pub weaknesses: String,
    pub secrets: Vec<Secret>,
}

/// Dossiers for both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBriefings {
    pub side_a: Dossier,
    pub side_b: Dossier,
}

impl RoleBriefings {
    pub fn for_side(&self, side: Side) -> &Dossier {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }
}

impl Default for RoleBriefings {
    fn default() -> Self {
        Self {
            side_a: Dossier {
                name: "Lucia Bellamonte".to_string(),
                position: "Co-owner holding 50%. Runs the vineyard and cellar; the Bellamonte name is on every label.".to_string(),
                goal: "Keep the winery in the family, or leave with a price that reflects the brand you built.".to_string(),
                strengths: "Deep knowledge of the vineyard, relationships with growers, personal attachment that buyers respect.".to_string(),
                weaknesses: "Limited liquid capital; a high buyout price would need outside financing.".to_string(),
                secrets: vec![
                    Secret {
                        label: "Financing".to_string(),
                        text: "Your bank has pre-approved a loan, but only up to a ceiling well below the top of the valuation range.".to_string(),
                    },
                    Secret {
                        label: "Vintage".to_string(),
                        text: "The barrel tasting of the newest vintage is exceptional; nobody outside the cellar knows yet.".to_string(),
                    },
                ],
            },
            side_b: Dossier {
                name: "Marco Ferrante".to_string(),
                position: "Co-owner holding 50%. Handles distribution, export contracts and the books.".to_string(),
                goal: "Exit at a strong price or take full control and scale distribution.".to_string(),
                strengths: "Cash on hand, control of the distributor relationships, clear view of the financials.".to_string(),
                weaknesses: "Little operational knowledge of winemaking; staff loyalty sits with the other side.".to_string(),
                secrets: vec![
                    Secret {
                        label: "Export deal".to_string(),
                        text: "A distributor has informally offered a multi-year export contract that depends on the current leadership staying in place.".to_string(),
                    },
                    Secret {
                        label: "Debt".to_string(),
                        text: "Your other venture is losing money; a quick sale would solve a cash problem you have not disclosed.".to_string(),
                    },
                ],
            },
        }
    }
}

/// Public identity of the partner, as seen from a briefing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerInfo {
    pub participant_id: ParticipantId,
    pub name: String,
    pub side: Side,
    pub side_label: String,
}

/// What one participant is allowed to know about their own role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Briefing {
    pub participant_id: ParticipantId,
    pub side: Side,
    pub side_label: String,
    pub dossier: Dossier,
    pub valuation: Option<u64>,
    pub pair_id: Option<PairId>,
    pub partner: Option<PartnerInfo>,
}

/// Build the briefing for `participant_id`.
///
/// Fails with `InvalidPhase` while the participant has no side yet.
pub fn briefing_for(session: &Session, participant_id: &str) -> ClassroomResult<Briefing> {
    let participant = session.participant(participant_id)?;
    let side = participant.role.ok_or_else(|| ClassroomError::InvalidPhase {
        operation: "briefing",
        expected: "a phase with roles assigned".to_string(),
        actual: session.phase.to_string(),
    })?;

    let pair = session.pair_of(participant_id);
    let partner = pair.and_then(|pair| pair.partner_of(participant_id)).map(|member| {
        PartnerInfo {
            participant_id: member.id.clone(),
            name: member.name.clone(),
            side: member.side,
            side_label: session.config.side_label(member.side).to_string(),
        }
    });

    Ok(Briefing {
        participant_id: participant.id.clone(),
        side,
        side_label: session.config.side_label(side).to_string(),
        dossier: session.config.briefings.for_side(side).clone(),
        valuation: participant.valuation,
        pair_id: pair.map(|p| p.id.clone()),
        partner,
    })
}
