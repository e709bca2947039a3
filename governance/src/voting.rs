//! Reputation-weighted vote accounting
//!
//! Every percentage uses the total reputation at the proposal's creation
//! block as denominator, so later mints and burns do not move old numbers.

use log::warn;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::Serialize;

use crate::config::{SLIDER_MAX, SLIDER_MIN};
use crate::error::{Diagnostic, EventKind, GovernanceError, Result};
use crate::events::{Decision, ProposalEventLog, ReputationSnapshot};
use crate::proposal::{Address, ProposalSnapshot};
use crate::units::{amount, Percentage, Rounding};

/// One voter's line under the for/against columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoterLine {
    pub voter: Address,
    #[serde(with = "amount")]
    pub amount: BigUint,
    pub percentage: Percentage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub positive_percentage: Percentage,
    pub negative_percentage: Percentage,
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive: Vec<VoterLine>,
    pub negative: Vec<VoterLine>,
}

/// The viewer's effective vote on a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerVote {
    pub decision: Decision,
    #[serde(with = "amount")]
    pub amount: BigUint,
    pub percentage: Percentage,
}

/// Total reputation at creation, checked to be non-zero.
#[derive(Debug, Clone, Copy)]
pub struct RepDenominator<'a>(&'a BigUint);

impl<'a> RepDenominator<'a> {
    pub fn new(proposal_id: &str, reputation: &'a ReputationSnapshot) -> Result<Self> {
        if reputation.total_supply.is_zero() {
            return Err(GovernanceError::InvalidReputationSnapshot {
                proposal_id: proposal_id.to_string(),
            });
        }
        Ok(Self(&reputation.total_supply))
    }

    pub fn value(&self) -> &BigUint {
        self.0
    }

    /// `part` as a percentage of the total.
    pub fn share(&self, part: &BigUint, rounding: Rounding) -> Percentage {
        // The constructor rejects a zero total, so `of` always returns Some.
        Percentage::of(part, self.0, rounding).unwrap_or_else(Percentage::zero)
    }
}

/// Tally the vote columns.
///
/// Column totals are truncated to hundredths so the two sides never add up
/// to more than 100% when the votes fit in the total supply. Voter lines
/// are rounded half-up. Events with a vote code other than 1 or 2 are left
/// out and reported in `diagnostics`.
pub fn tally_votes(
    snapshot: &ProposalSnapshot,
    events: &ProposalEventLog,
    total_rep: RepDenominator<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> VoteTally {
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    for (index, event) in events.votes.iter().enumerate() {
        let Some(decision) = event.decision() else {
            warn!(
                "proposal {}: ignoring vote #{} from {} with code {}",
                snapshot.id, index, event.voter, event.vote
            );
            diagnostics.push(Diagnostic::MalformedEvent {
                kind: EventKind::Vote,
                index,
                code: event.vote,
            });
            continue;
        };

        let line = VoterLine {
            voter: event.voter.clone(),
            amount: event.amount.clone(),
            percentage: total_rep.share(&event.amount, Rounding::HalfUp),
        };
        match decision {
            Decision::For => positive.push(line),
            Decision::Against => negative.push(line),
        }
    }

    VoteTally {
        positive_percentage: total_rep.share(&snapshot.positive_votes, Rounding::Down),
        negative_percentage: total_rep.share(&snapshot.negative_votes, Rounding::Down),
        positive_count: positive.len(),
        negative_count: negative.len(),
        positive,
        negative,
    }
}

/// The viewer's vote; a later vote replaces an earlier one.
pub fn viewer_vote(
    events: &ProposalEventLog,
    viewer: &Address,
    total_rep: RepDenominator<'_>,
) -> Option<ViewerVote> {
    let latest = events
        .votes
        .iter()
        .filter(|event| &event.voter == viewer)
        .filter_map(|event| event.decision().map(|decision| (decision, event)))
        .last();

    latest.map(|(decision, event)| ViewerVote {
        decision,
        amount: event.amount.clone(),
        percentage: total_rep.share(&event.amount, Rounding::HalfUp),
    })
}

/// Share of total reputation a vote slider position would cast.
///
/// `slider` runs from -100 (fully against) to 100 (fully for).
pub fn vote_preview(user_rep: &BigUint, slider: i32, total_rep: RepDenominator<'_>) -> Percentage {
    let weight = slider.clamp(SLIDER_MIN, SLIDER_MAX).unsigned_abs();
    let cast = user_rep * weight;
    Percentage::of(&cast, &(total_rep.value() * 100u32), Rounding::HalfUp)
        .unwrap_or_else(Percentage::zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VoteEvent;
    use crate::proposal::ProposalStatus;

    fn snapshot(positive: u32, negative: u32) -> ProposalSnapshot {
        serde_json::from_value(serde_json::json!({
            "id": "0x01",
            "status": ProposalStatus::Boosted,
            "priority": 5,
            "positive_votes": positive,
            "negative_votes": negative,
            "positive_stakes": 0,
            "negative_stakes": 0,
            "proposer": "0xproposer",
        }))
        .unwrap()
    }

    fn reputation(total: u32) -> ReputationSnapshot {
        ReputationSnapshot {
            user_rep: BigUint::zero(),
            total_supply: BigUint::from(total),
        }
    }

    fn vote(voter: &str, code: u8, amount: u32) -> VoteEvent {
        VoteEvent {
            voter: Address::new(voter),
            vote: code,
            amount: BigUint::from(amount),
        }
    }

    #[test]
    fn test_revote_last_wins() {
        let events = ProposalEventLog {
            votes: vec![vote("0xa", 1, 10), vote("0xa", 2, 5)],
            ..Default::default()
        };
        let rep = reputation(100);
        let total = RepDenominator::new("0x01", &rep).unwrap();
        let result = viewer_vote(&events, &Address::new("0xA"), total).unwrap();

        assert_eq!(result.decision, Decision::Against);
        assert_eq!(result.amount, BigUint::from(5u32));
        assert_eq!(result.percentage.to_string(), "5.00");
    }

    #[test]
    fn test_viewer_without_votes() {
        let events = ProposalEventLog {
            votes: vec![vote("0xb", 1, 10)],
            ..Default::default()
        };
        let rep = reputation(100);
        let total = RepDenominator::new("0x01", &rep).unwrap();
        assert!(viewer_vote(&events, &Address::new("0xa"), total).is_none());
    }

    #[test]
    fn test_tally_percentages_and_columns() {
        let events = ProposalEventLog {
            votes: vec![vote("0xa", 1, 1), vote("0xb", 2, 2), vote("0xc", 1, 0)],
            ..Default::default()
        };
        let mut diagnostics = Vec::new();
        let rep = reputation(3);
        let total = RepDenominator::new("0x01", &rep).unwrap();
        let tally = tally_votes(&snapshot(1, 2), &events, total, &mut diagnostics);

        assert_eq!(tally.positive_percentage.to_string(), "33.33");
        assert_eq!(tally.negative_percentage.to_string(), "66.66");
        assert_eq!(tally.positive_count, 2);
        assert_eq!(tally.negative_count, 1);
        assert_eq!(tally.negative[0].percentage.to_string(), "66.67");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_column_totals_never_exceed_hundred() {
        // Half-up rounding would give 0.01 + 100.00 here.
        let rep = reputation(20_000);
        let total = RepDenominator::new("0x01", &rep).unwrap();
        let mut diagnostics = Vec::new();
        let tally = tally_votes(
            &snapshot(1, 19_999),
            &ProposalEventLog::default(),
            total,
            &mut diagnostics,
        );

        let sum = &tally.positive_percentage + &tally.negative_percentage;
        assert!(sum.hundredths() <= &BigUint::from(10_000u32));
    }

    #[test]
    fn test_malformed_vote_reported_and_excluded() {
        let events = ProposalEventLog {
            votes: vec![vote("0xa", 3, 50), vote("0xb", 1, 10)],
            ..Default::default()
        };
        let mut diagnostics = Vec::new();
        let rep = reputation(100);
        let total = RepDenominator::new("0x01", &rep).unwrap();
        let tally = tally_votes(&snapshot(10, 0), &events, total, &mut diagnostics);

        assert_eq!(tally.positive_count, 1);
        assert_eq!(tally.negative_count, 0);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::MalformedEvent {
                kind: EventKind::Vote,
                index: 0,
                code: 3
            }]
        );
        assert!(viewer_vote(&events, &Address::new("0xa"), total).is_none());
    }

    #[test]
    fn test_zero_total_supply_fails_closed() {
        let empty = ReputationSnapshot::default();
        assert!(matches!(
            RepDenominator::new("0x01", &empty),
            Err(GovernanceError::InvalidReputationSnapshot { .. })
        ));
    }

    #[test]
    fn test_vote_preview() {
        let user_rep = BigUint::from(50u32);
        let rep = reputation(200);
        let total = RepDenominator::new("0x01", &rep).unwrap();
        assert_eq!(vote_preview(&user_rep, 100, total).to_string(), "25.00");
        assert_eq!(vote_preview(&user_rep, -50, total).to_string(), "12.50");
        assert_eq!(vote_preview(&user_rep, 400, total).to_string(), "25.00");
    }
}
