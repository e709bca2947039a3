//! Guild-level configuration reads and their sidebar summary

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::proposal::Address;
use crate::timefmt::{format_date, humanize_duration};
use crate::units::{amount, from_base_units};

/// Values read from the ERC20Guild contract's getters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSnapshot {
    pub address: Address,
    pub name: String,
    pub token: Address,
    pub permission_registry: Address,
    /// Seconds a proposal stays open
    pub proposal_time: u64,
    /// Seconds an accepted proposal can be executed in
    pub time_for_execution: u64,
    pub max_active_proposals: u64,
    #[serde(default)]
    pub lock_time: u64,
    #[serde(default, with = "amount")]
    pub total_locked: BigUint,
    #[serde(default, with = "amount")]
    pub voting_power_for_proposal_creation: BigUint,
    #[serde(default, with = "amount")]
    pub voting_power_for_proposal_execution: BigUint,
}

/// The connected account's standing in the guild
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoterSnapshot {
    #[serde(with = "amount")]
    pub voting_power: BigUint,
    #[serde(default)]
    pub lock_timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildSummary {
    pub name: String,
    pub token: Address,
    /// Registry the guild checks call permissions against
    pub permission_registry: Address,
    /// "7 days proposal duration"
    pub proposal_duration: String,
    /// "(3 days for execution)"
    pub execution_window: String,
    pub max_active_proposals: u64,
    pub lock_time: Option<String>,
    pub total_locked: Option<String>,
    pub voting_power_for_proposal_creation: String,
    pub voting_power_for_proposal_execution: String,
    pub voting_power: Option<String>,
    /// Date the voter's tokens unlock
    pub unlock_date: Option<String>,
}

pub fn summarize_guild(
    guild: &GuildSnapshot,
    voter: Option<&VoterSnapshot>,
    token_symbol: &str,
    decimals: u32,
) -> GuildSummary {
    let tokens = |value: &BigUint| format!("{} {}", from_base_units(value, decimals), token_symbol);

    GuildSummary {
        name: guild.name.clone(),
        token: guild.token.clone(),
        permission_registry: guild.permission_registry.clone(),
        proposal_duration: format!("{} proposal duration", humanize_duration(guild.proposal_time)),
        execution_window: format!("({} for execution)", humanize_duration(guild.time_for_execution)),
        max_active_proposals: guild.max_active_proposals,
        lock_time: (guild.lock_time > 0).then(|| humanize_duration(guild.lock_time)),
        total_locked: (!guild.total_locked.is_zero()).then(|| tokens(&guild.total_locked)),
        voting_power_for_proposal_creation: tokens(&guild.voting_power_for_proposal_creation),
        voting_power_for_proposal_execution: tokens(&guild.voting_power_for_proposal_execution),
        voting_power: voter.map(|voter| tokens(&voter.voting_power)),
        unlock_date: voter
            .filter(|voter| voter.lock_timestamp > 0)
            .map(|voter| format_date(voter.lock_timestamp)),
    }
}
