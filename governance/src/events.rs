//! Append-only proposal event log and reputation snapshot

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::proposal::Address;
use crate::units::amount;

/// Side taken by a vote or stake. Contract codes: 1 = for, 2 = against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    For,
    Against,
}

impl Decision {
    pub fn from_code(code: u8) -> Option<Decision> {
        match code {
            1 => Some(Decision::For),
            2 => Some(Decision::Against),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Decision::For => 1,
            Decision::Against => 2,
        }
    }

    pub fn word(self) -> &'static str {
        match self {
            Decision::For => "for",
            Decision::Against => "against",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteEvent {
    pub voter: Address,
    /// Raw contract code, kept unchecked so malformed entries can be reported
    pub vote: u8,
    #[serde(with = "amount")]
    pub amount: BigUint,
}

impl VoteEvent {
    pub fn decision(&self) -> Option<Decision> {
        Decision::from_code(self.vote)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeEvent {
    pub staker: Address,
    pub vote: u8,
    #[serde(with = "amount")]
    pub amount: BigUint,
}

impl StakeEvent {
    pub fn decision(&self) -> Option<Decision> {
        Decision::from_code(self.vote)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemEvent {
    pub beneficiary: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub text: String,
}

/// Events emitted for one proposal, in chain order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalEventLog {
    #[serde(default)]
    pub votes: Vec<VoteEvent>,
    #[serde(default)]
    pub stakes: Vec<StakeEvent>,
    #[serde(default)]
    pub redeems: Vec<RedeemEvent>,
    #[serde(default)]
    pub history: Vec<HistoryEvent>,
}

impl ProposalEventLog {
    pub fn has_redeemed(&self, account: &Address) -> bool {
        self.redeems.iter().any(|redeem| &redeem.beneficiary == account)
    }
}

/// Reputation balances at the block the proposal was created in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationSnapshot {
    #[serde(with = "amount")]
    pub user_rep: BigUint,
    #[serde(with = "amount")]
    pub total_supply: BigUint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_codes() {
        assert_eq!(Decision::from_code(1), Some(Decision::For));
        assert_eq!(Decision::from_code(2), Some(Decision::Against));
        assert_eq!(Decision::from_code(0), None);
        assert_eq!(Decision::from_code(3), None);
        assert_eq!(Decision::Against.code(), 2);
    }

    #[test]
    fn test_has_redeemed_ignores_case() {
        let log: ProposalEventLog = serde_json::from_str(
            r#"{"redeems": [{"beneficiary": "0xABC"}]}"#,
        )
        .unwrap();
        assert!(log.has_redeemed(&Address::new("0xabc")));
        assert!(!log.has_redeemed(&Address::new("0xdef")));
        assert!(log.votes.is_empty());
    }
}
