//! Token stake accounting and boost thresholds
//!
//! Unlike votes, a staker's deposits accumulate: the viewer's position is
//! the running sum of for-stakes minus against-stakes.

use log::warn;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use serde::Serialize;

use crate::error::{Diagnostic, EventKind, GovernanceError, Result};
use crate::events::{Decision, ProposalEventLog};
use crate::proposal::{Address, ProposalSnapshot, SchemeParameters};
use crate::units::{amount, from_base_units};

/// Width of the on-chain threshold value
pub const MAX_THRESHOLD_BITS: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakerLine {
    pub staker: Address,
    #[serde(with = "amount")]
    pub amount: BigUint,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakeTally {
    pub positive_display: String,
    pub negative_display: String,
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive: Vec<StakerLine>,
    pub negative: Vec<StakerLine>,
}

/// Extra stake needed to move a proposal across a boost boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StakeRequirement {
    /// Nothing more is needed (the computed amount was zero or negative)
    Satisfied,
    Required {
        #[serde(with = "amount")]
        amount: BigUint,
        /// Amount in token denomination, 2 decimals
        display: String,
    },
}

impl StakeRequirement {
    fn from_signed(value: BigInt, decimals: u32) -> Self {
        match value.into_parts() {
            (Sign::Plus, amount) => StakeRequirement::Required {
                display: from_base_units(&amount, decimals),
                amount,
            },
            _ => StakeRequirement::Satisfied,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, StakeRequirement::Satisfied)
    }
}

/// Tally stake columns; malformed vote codes are excluded and reported.
pub fn tally_stakes(
    snapshot: &ProposalSnapshot,
    events: &ProposalEventLog,
    decimals: u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> StakeTally {
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    for (index, event) in events.stakes.iter().enumerate() {
        let Some(decision) = event.decision() else {
            warn!(
                "proposal {}: ignoring stake #{} from {} with code {}",
                snapshot.id, index, event.staker, event.vote
            );
            diagnostics.push(Diagnostic::MalformedEvent {
                kind: EventKind::Stake,
                index,
                code: event.vote,
            });
            continue;
        };

        let line = StakerLine {
            staker: event.staker.clone(),
            amount: event.amount.clone(),
            display: from_base_units(&event.amount, decimals),
        };
        match decision {
            Decision::For => positive.push(line),
            Decision::Against => negative.push(line),
        }
    }

    StakeTally {
        positive_display: from_base_units(&snapshot.positive_stakes, decimals),
        negative_display: from_base_units(&snapshot.negative_stakes, decimals),
        positive_count: positive.len(),
        negative_count: negative.len(),
        positive,
        negative,
    }
}

/// Viewer's net stake: for-stakes minus against-stakes.
pub fn viewer_net_stake(events: &ProposalEventLog, viewer: &Address) -> BigInt {
    events
        .stakes
        .iter()
        .filter(|event| &event.staker == viewer)
        .fold(BigInt::zero(), |net, event| match event.decision() {
            Some(Decision::For) => net + BigInt::from(event.amount.clone()),
            Some(Decision::Against) => net - BigInt::from(event.amount.clone()),
            None => net,
        })
}

/// `threshold_const ^ min(boosted, limit) - positive + negative`
///
/// The threshold is a uint256 on chain; parameters whose power cannot fit
/// in 256 bits are rejected with `InvalidSnapshot` before exponentiation.
pub fn stake_to_boost(
    parameters: &SchemeParameters,
    boosted_proposals: u32,
    snapshot: &ProposalSnapshot,
    decimals: u32,
) -> Result<StakeRequirement> {
    let exponent = boosted_proposals.min(parameters.limit_exponent_value);
    let threshold = boost_threshold(&parameters.threshold_const, exponent).ok_or_else(|| {
        GovernanceError::InvalidSnapshot(format!(
            "proposal {}: boost threshold {}^{} exceeds {} bits",
            snapshot.id, parameters.threshold_const, exponent, MAX_THRESHOLD_BITS
        ))
    })?;
    let needed = BigInt::from(threshold) - BigInt::from(snapshot.positive_stakes.clone())
        + BigInt::from(snapshot.negative_stakes.clone());
    Ok(StakeRequirement::from_signed(needed, decimals))
}

/// `base ^ exponent`, or `None` when the result would not fit in
/// `MAX_THRESHOLD_BITS`.
fn boost_threshold(base: &BigUint, exponent: u32) -> Option<BigUint> {
    let bits = base.bits();
    // a base of 0 or 1 never grows; otherwise the result has at least
    // (bits - 1) * exponent + 1 bits
    if bits > 1 && (bits - 1).saturating_mul(u64::from(exponent)) >= MAX_THRESHOLD_BITS {
        return None;
    }
    let threshold = base.pow(exponent);
    (threshold.bits() <= MAX_THRESHOLD_BITS).then_some(threshold)
}

/// `positive - negative`: against-stake that would drop the proposal back.
pub fn stake_to_unboost(snapshot: &ProposalSnapshot, decimals: u32) -> StakeRequirement {
    let needed = BigInt::from(snapshot.positive_stakes.clone())
        - BigInt::from(snapshot.negative_stakes.clone());
    StakeRequirement::from_signed(needed, decimals)
}
