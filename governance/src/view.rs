//! Proposal derivation engine
//!
//! `derive_view` turns one proposal's contract reads into the model the
//! proposal page renders. It borrows its inputs, performs no I/O and keeps
//! no state, so views for many proposals can be built in parallel with
//! `derive_views`.

use log::debug;
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use rayon::prelude::*;
use serde::Serialize;

use crate::calls::{describe_calls, CallDecoder, CallDescription};
use crate::error::{Diagnostic, GovernanceError, Result};
use crate::events::{Decision, ProposalEventLog, ReputationSnapshot};
use crate::intents::Intent;
use crate::proposal::{
    Address, Capability, Phase, ProposalSnapshot, ProposalStatus, SchemeSnapshot,
};
use crate::staking::{
    stake_to_boost, stake_to_unboost, tally_stakes, viewer_net_stake, StakeRequirement,
    StakeTally,
};
use crate::timefmt::{format_relative, format_timestamp};
use crate::units::{amount, from_signed_base_units, serialize_signed, Percentage};
use crate::voting::{tally_votes, viewer_vote, vote_preview, RepDenominator, ViewerVote, VoteTally};

/// Deployment-wide values shared by every derivation.
#[derive(Clone, Copy)]
pub struct DeriveContext<'a> {
    /// The organization's controller contract
    pub controller: &'a Address,
    /// Decimal places of the staking token
    pub decimals: u32,
    pub decoder: &'a dyn CallDecoder,
}

/// Reads for one proposal. `snapshot` is `None` when the id is unknown.
#[derive(Debug, Clone, Copy)]
pub struct ProposalInputs<'a> {
    pub id: &'a str,
    pub snapshot: Option<&'a ProposalSnapshot>,
    pub scheme: &'a SchemeSnapshot,
    pub events: &'a ProposalEventLog,
    pub reputation: &'a ReputationSnapshot,
}

/// The connected account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub address: Address,
    /// Staking-token allowance granted to the voting machine
    pub token_allowance: BigUint,
}

impl Viewer {
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            token_allowance: BigUint::zero(),
        }
    }

    pub fn with_allowance(mut self, allowance: BigUint) -> Self {
        self.token_allowance = allowance;
        self
    }
}

/// Primary button on the proposal sidebar; both submit an execute call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProposalAction {
    Boost,
    Execute,
}

impl ProposalAction {
    pub fn intent(self, proposal_id: &str) -> Intent {
        Intent::Execute {
            proposal_id: proposal_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    /// "in 2 hours" while the boost time is ahead
    pub time_to_boost: Option<String>,
    /// "in 3 days" while the finish time is ahead
    pub time_to_finish: Option<String>,
    /// Finish time only starts counting once the proposal is boosted
    pub finish_after_boost: bool,
    pub submitted: String,
    /// "-" until the boosted phase starts
    pub boosted: String,
    pub finish: String,
}

/// Per-viewer state, rebuilt from the event logs on every derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerState {
    #[serde(with = "amount")]
    pub voted_amount: BigUint,
    pub voted_decision: Option<Decision>,
    pub vote: Option<ViewerVote>,
    #[serde(serialize_with = "serialize_signed")]
    pub staked_net_amount: BigInt,
    pub staked_display: String,
    pub can_redeem: bool,
    /// Redeem button shown: resolved proposal and `can_redeem`
    pub redeem_available: bool,
    pub can_vote: bool,
    pub can_stake: bool,
    /// Staking needs an `approveToken` first
    pub needs_approval: bool,
    /// Share of total reputation a full-strength vote would cast
    pub vote_power: Percentage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalView {
    pub id: String,
    pub title: String,
    pub status: ProposalStatus,
    pub phase: Phase,
    pub action: Option<ProposalAction>,
    pub proposer: Address,
    pub timeline: Timeline,
    pub calls: Vec<CallDescription>,
    pub history: Vec<String>,
    pub votes: VoteTally,
    pub stakes: StakeTally,
    /// Only computed while the proposal is queued
    pub stake_to_boost: Option<StakeRequirement>,
    pub stake_to_unboost: Option<StakeRequirement>,
    pub viewer: Option<ViewerState>,
    pub diagnostics: Vec<Diagnostic>,
}

fn primary_action(snapshot: &ProposalSnapshot, displayed: ProposalStatus) -> Option<ProposalAction> {
    if snapshot.status == ProposalStatus::PendingBoost {
        Some(ProposalAction::Boost)
    } else if displayed == ProposalStatus::PendingExecution {
        Some(ProposalAction::Execute)
    } else {
        None
    }
}

fn timeline(snapshot: &ProposalSnapshot, now: u64) -> Timeline {
    let ahead = |timestamp: u64| (timestamp > now).then(|| format_relative(timestamp, now));

    Timeline {
        time_to_boost: ahead(snapshot.boost_time),
        time_to_finish: ahead(snapshot.finish_time),
        finish_after_boost: matches!(
            snapshot.status,
            ProposalStatus::PendingBoost | ProposalStatus::PreBoosted
        ),
        submitted: format_timestamp(snapshot.submitted_time),
        boosted: if snapshot.boosted_phase_time > 0 {
            format_timestamp(snapshot.boosted_phase_time)
        } else {
            "-".to_string()
        },
        finish: format_timestamp(snapshot.finish_time),
    }
}

fn viewer_state(
    viewer: &Viewer,
    phase: Phase,
    events: &ProposalEventLog,
    reputation: &ReputationSnapshot,
    total_rep: RepDenominator<'_>,
    decimals: u32,
) -> ViewerState {
    let vote = viewer_vote(events, &viewer.address, total_rep);
    let voted_amount = vote
        .as_ref()
        .map(|vote| vote.amount.clone())
        .unwrap_or_default();
    let staked_net_amount = viewer_net_stake(events, &viewer.address);

    let can_redeem = !events.has_redeemed(&viewer.address)
        && (!staked_net_amount.is_zero() || !voted_amount.is_zero());
    let can_stake = phase.allows(Capability::Stake);

    ViewerState {
        voted_decision: vote.as_ref().map(|vote| vote.decision),
        can_vote: voted_amount.is_zero() && phase.allows(Capability::Vote),
        staked_display: from_signed_base_units(&staked_net_amount, decimals),
        redeem_available: can_redeem && phase.allows(Capability::Redeem),
        can_redeem,
        can_stake,
        needs_approval: can_stake && viewer.token_allowance.is_zero(),
        vote_power: vote_preview(&reputation.user_rep, 100, total_rep),
        vote,
        voted_amount,
        staked_net_amount,
    }
}

/// Build the view model for one proposal.
///
/// Fails with `NotFound` when there is no snapshot, `InvalidSnapshot` when
/// the call arrays disagree in length, the priority is out of range or the
/// boost threshold overflows 256 bits, and
/// `InvalidReputationSnapshot` when the creation-block supply is zero.
/// Malformed events and undecodable calls only add diagnostics.
pub fn derive_view(
    inputs: ProposalInputs<'_>,
    viewer: Option<&Viewer>,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<ProposalView> {
    let snapshot = inputs
        .snapshot
        .ok_or_else(|| GovernanceError::NotFound(inputs.id.to_string()))?;
    snapshot.validate()?;
    let phase = snapshot.phase()?;
    let total_rep = RepDenominator::new(&snapshot.id, inputs.reputation)?;

    let mut diagnostics = Vec::new();
    let status = snapshot.displayed_status(now);
    let votes = tally_votes(snapshot, inputs.events, total_rep, &mut diagnostics);
    let stakes = tally_stakes(snapshot, inputs.events, ctx.decimals, &mut diagnostics);
    // generic calls are only decodable when the scheme acts through the
    // network's controller
    let decoding_controller =
        (&inputs.scheme.controller_address == ctx.controller).then_some(ctx.controller);
    let calls = describe_calls(
        snapshot,
        decoding_controller,
        ctx.decoder,
        ctx.decimals,
        &mut diagnostics,
    );

    let (stake_to_boost, stake_to_unboost) = if phase == Phase::Queued {
        (
            Some(stake_to_boost(
                &inputs.scheme.parameters,
                inputs.scheme.boosted_proposals,
                snapshot,
                ctx.decimals,
            )?),
            Some(stake_to_unboost(snapshot, ctx.decimals)),
        )
    } else {
        (None, None)
    };

    let viewer = viewer.map(|viewer| {
        viewer_state(
            viewer,
            phase,
            inputs.events,
            inputs.reputation,
            total_rep,
            ctx.decimals,
        )
    });

    debug!(
        "derived proposal {}: status={}, phase={:?}, {} diagnostics",
        snapshot.id,
        status,
        phase,
        diagnostics.len()
    );

    Ok(ProposalView {
        id: snapshot.id.clone(),
        title: snapshot.title.clone(),
        status,
        phase,
        action: primary_action(snapshot, status),
        proposer: snapshot.proposer.clone(),
        timeline: timeline(snapshot, now),
        calls,
        history: inputs
            .events
            .history
            .iter()
            .map(|event| event.text.clone())
            .collect(),
        votes,
        stakes,
        stake_to_boost,
        stake_to_unboost,
        viewer,
        diagnostics,
    })
}

/// Derive views for a batch of proposals in parallel, preserving order.
pub fn derive_views(
    batch: &[ProposalInputs<'_>],
    viewer: Option<&Viewer>,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Vec<Result<ProposalView>> {
    batch
        .par_iter()
        .map(|inputs| derive_view(*inputs, viewer, now, ctx))
        .collect()
}
