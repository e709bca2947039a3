//! User intents and the transaction dispatcher seam
//!
//! The engine never tracks a submitted transaction. It only builds the
//! intent; the next snapshot refresh reflects whatever landed on chain.

use num_bigint::{BigUint, Sign};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::config::{SLIDER_MAX, SLIDER_MIN};
use crate::error::{DispatchError, GovernanceError, Result};
use crate::events::Decision;
use crate::proposal::Address;
use crate::units::{amount, format_units, parse_units, REPUTATION_DECIMALS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    Vote {
        decision: Decision,
        #[serde(with = "amount")]
        amount: BigUint,
        proposal_id: String,
    },
    Stake {
        decision: Decision,
        #[serde(with = "amount")]
        amount: BigUint,
        proposal_id: String,
    },
    Redeem {
        proposal_id: String,
        account: Address,
    },
    ApproveToken,
    Execute {
        proposal_id: String,
    },
}

impl Intent {
    /// Vote with `|slider|`% of the viewer's reputation at creation.
    ///
    /// Positive slider positions vote for, the rest against.
    pub fn vote_from_slider(proposal_id: &str, slider: i32, user_rep: &BigUint) -> Result<Intent> {
        let weight = slider.clamp(SLIDER_MIN, SLIDER_MAX).unsigned_abs();
        let amount = user_rep * weight / 100u32;
        if amount.is_zero() {
            return Err(GovernanceError::InvalidAmount(format!(
                "slider position {} casts no reputation",
                slider
            )));
        }
        Ok(Intent::Vote {
            decision: if slider > 0 {
                Decision::For
            } else {
                Decision::Against
            },
            amount,
            proposal_id: proposal_id.to_string(),
        })
    }

    /// Stake the amount typed by the user; a negative amount stakes against.
    pub fn stake_from_input(proposal_id: &str, input: &str, decimals: u32) -> Result<Intent> {
        let (sign, amount) = parse_units(input, decimals)?.into_parts();
        let decision = match sign {
            Sign::Plus => Decision::For,
            Sign::Minus => Decision::Against,
            Sign::NoSign => {
                return Err(GovernanceError::InvalidAmount(format!(
                    "cannot stake {}",
                    input
                )))
            }
        };
        Ok(Intent::Stake {
            decision,
            amount,
            proposal_id: proposal_id.to_string(),
        })
    }

    /// Text shown while the wallet asks for confirmation.
    pub fn message(&self, token_symbol: &str, decimals: u32) -> String {
        match self {
            Intent::Vote {
                decision,
                amount,
                proposal_id,
            } => format!(
                "Voting {} proposal {} with {} REP",
                decision.word(),
                proposal_id,
                format_units(amount, REPUTATION_DECIMALS)
            ),
            Intent::Stake {
                decision,
                amount,
                proposal_id,
            } => format!(
                "Staking {} {} {} proposal {}",
                format_units(amount, decimals),
                token_symbol,
                decision.word(),
                proposal_id
            ),
            Intent::Redeem {
                proposal_id,
                account,
            } => format!("Redeeming proposal {} for {}", proposal_id, account),
            Intent::ApproveToken => format!("Approving {} for staking", token_symbol),
            Intent::Execute { proposal_id } => format!("Executing proposal {}", proposal_id),
        }
    }
}

/// Handle for a submitted, not yet confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub hash: String,
    pub intent: Intent,
}

/// Signs and submits intents. Confirmation is observed through the next
/// snapshot, never through this trait.
pub trait ActionDispatcher {
    fn dispatch(&mut self, intent: Intent) -> std::result::Result<PendingTransaction, DispatchError>;
}

/// Dispatcher that records intents instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    submitted: Vec<PendingTransaction>,
    reject: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose wallet rejects every request
    pub fn rejecting() -> Self {
        Self {
            submitted: Vec::new(),
            reject: true,
        }
    }

    pub fn submitted(&self) -> &[PendingTransaction] {
        &self.submitted
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, intent: Intent) -> std::result::Result<PendingTransaction, DispatchError> {
        if self.reject {
            return Err(DispatchError::Rejected);
        }
        let pending = PendingTransaction {
            hash: format!("0x{:064x}", self.submitted.len() + 1),
            intent,
        };
        self.submitted.push(pending.clone());
        Ok(pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionModalView {
    Confirm,
    Submit,
    Reject,
}

impl TransactionModalView {
    pub fn from_state(tx_cancelled: bool, tx_hash: Option<&str>) -> Self {
        if tx_cancelled {
            TransactionModalView::Reject
        } else if tx_hash.is_some_and(|hash| !hash.is_empty()) {
            TransactionModalView::Submit
        } else {
            TransactionModalView::Confirm
        }
    }
}

/// Text content of the transaction modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionModal {
    pub view: TransactionModalView,
    pub title: String,
    pub detail: Option<String>,
    pub explorer_link: Option<String>,
    pub footer: Option<String>,
}

pub fn explorer_link(explorer: &str, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer.trim_end_matches('/'), tx_hash)
}

pub fn transaction_modal(
    message: &str,
    tx_hash: Option<&str>,
    tx_cancelled: bool,
    explorer: &str,
) -> TransactionModal {
    match TransactionModalView::from_state(tx_cancelled, tx_hash) {
        TransactionModalView::Confirm => TransactionModal {
            view: TransactionModalView::Confirm,
            title: "Waiting For Confirmation".to_string(),
            detail: Some(format!("{}. Confirm this Transaction in your Wallet", message)),
            explorer_link: None,
            footer: None,
        },
        TransactionModalView::Submit => TransactionModal {
            view: TransactionModalView::Submit,
            title: "Transaction Submitted".to_string(),
            detail: None,
            explorer_link: tx_hash.map(|hash| explorer_link(explorer, hash)),
            footer: Some("Close".to_string()),
        },
        TransactionModalView::Reject => TransactionModal {
            view: TransactionModalView::Reject,
            title: "Transaction Rejected".to_string(),
            detail: None,
            explorer_link: None,
            footer: Some("Dismiss".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_from_slider() {
        let rep = BigUint::from(200u32);
        assert_eq!(
            Intent::vote_from_slider("0x1", 50, &rep).unwrap(),
            Intent::Vote {
                decision: Decision::For,
                amount: BigUint::from(100u32),
                proposal_id: "0x1".to_string(),
            }
        );
        match Intent::vote_from_slider("0x1", -100, &rep).unwrap() {
            Intent::Vote {
                decision, amount, ..
            } => {
                assert_eq!(decision, Decision::Against);
                assert_eq!(amount, rep);
            }
            other => panic!("unexpected intent {:?}", other),
        }
        assert!(Intent::vote_from_slider("0x1", 0, &rep).is_err());
    }

    #[test]
    fn test_stake_from_input() {
        match Intent::stake_from_input("0x1", "-1.5", 18).unwrap() {
            Intent::Stake {
                decision, amount, ..
            } => {
                assert_eq!(decision, Decision::Against);
                assert_eq!(amount, BigUint::from(1_500_000_000_000_000_000u64));
            }
            other => panic!("unexpected intent {:?}", other),
        }
        assert!(Intent::stake_from_input("0x1", "0", 18).is_err());
        assert!(Intent::stake_from_input("0x1", "ten", 18).is_err());
    }

    #[test]
    fn test_messages_use_token_units() {
        let vote = Intent::Vote {
            decision: Decision::For,
            amount: BigUint::from(420_000_000_000_000_000_000u128),
            proposal_id: "0x1".to_string(),
        };
        assert_eq!(vote.message("DXD", 18), "Voting for proposal 0x1 with 420 REP");

        let stake = Intent::stake_from_input("0x1", "-0.5", 18).unwrap();
        assert_eq!(stake.message("DXD", 18), "Staking 0.5 DXD against proposal 0x1");
    }

    #[test]
    fn test_intent_json_shape() {
        let json = serde_json::to_value(Intent::Execute {
            proposal_id: "0x9".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "execute", "proposal_id": "0x9"}));
    }

    #[test]
    fn test_recording_dispatcher() {
        let mut dispatcher = RecordingDispatcher::new();
        let pending = dispatcher.dispatch(Intent::ApproveToken).unwrap();
        assert_eq!(pending.hash.len(), 66);
        assert_eq!(dispatcher.submitted().len(), 1);

        let mut rejecting = RecordingDispatcher::rejecting();
        assert_eq!(
            rejecting.dispatch(Intent::ApproveToken),
            Err(DispatchError::Rejected)
        );
        assert!(rejecting.submitted().is_empty());
    }

    #[test]
    fn test_modal_views() {
        assert_eq!(
            TransactionModalView::from_state(true, Some("0xabc")),
            TransactionModalView::Reject
        );
        assert_eq!(
            TransactionModalView::from_state(false, Some("0xabc")),
            TransactionModalView::Submit
        );
        assert_eq!(
            TransactionModalView::from_state(false, Some("")),
            TransactionModalView::Confirm
        );

        let modal = transaction_modal("Voting", Some("0xabc"), false, "https://etherscan.io/");
        assert_eq!(
            modal.explorer_link.as_deref(),
            Some("https://etherscan.io/tx/0xabc")
        );
        assert_eq!(modal.footer.as_deref(), Some("Close"));
    }
}
