//! Proposal snapshot types and lifecycle labels

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};
use crate::units::{amount, amounts};

/// Account or contract identifier, stored lowercase so checksummed and
/// plain hex spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state as reported by the voting machine contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProposalStatus {
    ExpiredInQueue,
    Pending,
    PendingBoost,
    PreBoosted,
    Boosted,
    QuietEndingPeriod,
    PendingExecution,
    Executed,
    Passed,
    Rejected,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 10] = [
        ProposalStatus::ExpiredInQueue,
        ProposalStatus::Pending,
        ProposalStatus::PendingBoost,
        ProposalStatus::PreBoosted,
        ProposalStatus::Boosted,
        ProposalStatus::QuietEndingPeriod,
        ProposalStatus::PendingExecution,
        ProposalStatus::Executed,
        ProposalStatus::Passed,
        ProposalStatus::Rejected,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProposalStatus::ExpiredInQueue => "Expired in Queue",
            ProposalStatus::Pending => "Pending",
            ProposalStatus::PendingBoost => "Pending Boost",
            ProposalStatus::PreBoosted => "Pre Boosted",
            ProposalStatus::Boosted => "Boosted",
            ProposalStatus::QuietEndingPeriod => "Quiet Ending Period",
            ProposalStatus::PendingExecution => "Pending Execution",
            ProposalStatus::Executed => "Executed",
            ProposalStatus::Passed => "Passed",
            ProposalStatus::Rejected => "Rejected",
        }
    }

    /// Status shown to the user at `now`.
    ///
    /// A quiet ending period whose finish time has passed is waiting on an
    /// execute call, so it is shown as pending execution.
    pub fn displayed(self, finish_time: u64, now: u64) -> ProposalStatus {
        if self == ProposalStatus::QuietEndingPeriod && finish_time <= now {
            ProposalStatus::PendingExecution
        } else {
            self
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for ProposalStatus {
    type Err = GovernanceError;

    /// Accepts the label ("Quiet Ending Period") or the variant name
    /// ("QuietEndingPeriod"), case-insensitively.
    fn from_str(value: &str) -> Result<Self> {
        let wanted = squash(value);
        ProposalStatus::ALL
            .into_iter()
            .find(|status| squash(status.label()) == wanted)
            .ok_or_else(|| GovernanceError::InvalidSnapshot(format!("unknown status: {}", value)))
    }
}

impl TryFrom<String> for ProposalStatus {
    type Error = GovernanceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProposalStatus> for String {
    fn from(status: ProposalStatus) -> Self {
        status.label().to_string()
    }
}

/// Named replacement for the contract's numeric priority buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// Priority 0-2: finished, only redemption remains
    Resolved,
    /// Priority 3-4: in the queue, open to votes and stakes
    Queued,
    /// Priority 5-6: boosted, open to votes only
    Boosted,
}

/// Something a viewer may do on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Capability {
    Vote,
    Stake,
    Redeem,
}

const PHASE_CAPABILITIES: [(Phase, &[Capability]); 3] = [
    (Phase::Resolved, &[Capability::Redeem]),
    (Phase::Queued, &[Capability::Vote, Capability::Stake]),
    (Phase::Boosted, &[Capability::Vote]),
];

/// Highest priority bucket the contract reports
pub const MAX_PRIORITY: u8 = 6;

impl Phase {
    pub fn from_priority(priority: u8) -> Option<Phase> {
        match priority {
            0..=2 => Some(Phase::Resolved),
            3..=4 => Some(Phase::Queued),
            5..=MAX_PRIORITY => Some(Phase::Boosted),
            _ => None,
        }
    }

    pub fn allows(self, capability: Capability) -> bool {
        PHASE_CAPABILITIES
            .iter()
            .find(|(phase, _)| *phase == self)
            .map(|(_, allowed)| allowed.contains(&capability))
            .unwrap_or(false)
    }
}

/// Proposal fields as read from the guild contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSnapshot {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description_hash: String,
    pub status: ProposalStatus,
    pub priority: u8,
    #[serde(with = "amount")]
    pub positive_votes: BigUint,
    #[serde(with = "amount")]
    pub negative_votes: BigUint,
    #[serde(with = "amount")]
    pub positive_stakes: BigUint,
    #[serde(with = "amount")]
    pub negative_stakes: BigUint,
    #[serde(default)]
    pub boost_time: u64,
    #[serde(default)]
    pub finish_time: u64,
    #[serde(default)]
    pub submitted_time: u64,
    #[serde(default)]
    pub boosted_phase_time: u64,
    #[serde(default)]
    pub creation_block: u64,
    pub proposer: Address,
    #[serde(default)]
    pub to: Vec<Address>,
    #[serde(default)]
    pub call_data: Vec<String>,
    #[serde(default, with = "amounts")]
    pub values: Vec<BigUint>,
}

impl ProposalSnapshot {
    /// Check the structural invariants a contract read must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.to.len() != self.call_data.len() || self.to.len() != self.values.len() {
            return Err(GovernanceError::InvalidSnapshot(format!(
                "proposal {} has {} targets, {} call data entries and {} values",
                self.id,
                self.to.len(),
                self.call_data.len(),
                self.values.len()
            )));
        }
        self.phase().map(|_| ())
    }

    pub fn phase(&self) -> Result<Phase> {
        Phase::from_priority(self.priority).ok_or_else(|| {
            GovernanceError::InvalidSnapshot(format!(
                "proposal {} has priority {} (max {})",
                self.id, self.priority, MAX_PRIORITY
            ))
        })
    }

    pub fn displayed_status(&self, now: u64) -> ProposalStatus {
        self.status.displayed(self.finish_time, now)
    }
}

/// Boost parameters of the voting machine scheme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemeParameters {
    #[serde(with = "amount")]
    pub threshold_const: BigUint,
    pub limit_exponent_value: u32,
}

/// Scheme a proposal was submitted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemeSnapshot {
    pub address: Address,
    pub controller_address: Address,
    #[serde(default)]
    pub boosted_proposals: u32,
    pub parameters: SchemeParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_labels_and_names() {
        for status in ProposalStatus::ALL {
            assert_eq!(status.label().parse::<ProposalStatus>().unwrap(), status);
            assert_eq!(format!("{:?}", status).parse::<ProposalStatus>().unwrap(), status);
        }
        assert!("Canceled".parse::<ProposalStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&ProposalStatus::QuietEndingPeriod).unwrap();
        assert_eq!(json, "\"Quiet Ending Period\"");
        let back: ProposalStatus = serde_json::from_str("\"PendingBoost\"").unwrap();
        assert_eq!(back, ProposalStatus::PendingBoost);
    }

    #[test]
    fn test_status_display_honours_width() {
        assert_eq!(format!("{:<15}|", ProposalStatus::PendingBoost), "Pending Boost  |");
        assert_eq!(format!("{:>8}", ProposalStatus::Passed), "  Passed");
    }

    #[test]
    fn test_quiet_ending_override() {
        let now = 1_000;
        let status = ProposalStatus::QuietEndingPeriod;
        assert_eq!(status.displayed(now - 1, now), ProposalStatus::PendingExecution);
        assert_eq!(status.displayed(now, now), ProposalStatus::PendingExecution);
        assert_eq!(status.displayed(now + 100, now), ProposalStatus::QuietEndingPeriod);
        assert_eq!(
            ProposalStatus::Boosted.displayed(now - 1, now),
            ProposalStatus::Boosted
        );
    }

    #[test]
    fn test_phase_table() {
        assert_eq!(Phase::from_priority(0), Some(Phase::Resolved));
        assert_eq!(Phase::from_priority(2), Some(Phase::Resolved));
        assert_eq!(Phase::from_priority(3), Some(Phase::Queued));
        assert_eq!(Phase::from_priority(4), Some(Phase::Queued));
        assert_eq!(Phase::from_priority(6), Some(Phase::Boosted));
        assert_eq!(Phase::from_priority(7), None);

        assert!(Phase::Queued.allows(Capability::Stake));
        assert!(Phase::Queued.allows(Capability::Vote));
        assert!(Phase::Boosted.allows(Capability::Vote));
        assert!(!Phase::Boosted.allows(Capability::Stake));
        assert!(Phase::Resolved.allows(Capability::Redeem));
        assert!(!Phase::Resolved.allows(Capability::Vote));
    }

    #[test]
    fn test_address_normalization() {
        assert_eq!(Address::new("0xAbCd"), Address::new("0xabcd"));
        let parsed: Address = serde_json::from_str("\"0xDEAD\"").unwrap();
        assert_eq!(parsed.as_str(), "0xdead");
    }
}
