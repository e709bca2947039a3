//! Guild Governance View Module
//!
//! Derives what a proposal page shows from ERC20Guild contract reads:
//! status labels, vote and stake tallies, boost thresholds, redemption
//! eligibility and call descriptions. Contract reads and transaction
//! submission are supplied from outside through the `ProposalSource`,
//! `CallDecoder` and `ActionDispatcher` traits.

pub mod calls;
pub mod error;
pub mod events;
pub mod guild;
pub mod intents;
pub mod proposal;
pub mod settings;
pub mod source;
pub mod staking;
pub mod timefmt;
pub mod units;
pub mod view;
pub mod voting;

pub use calls::{CallDecoder, CallDescription, NoDecoder};
pub use error::{DecodeError, Diagnostic, DispatchError, EventKind, GovernanceError, Result};
pub use events::{
    Decision, HistoryEvent, ProposalEventLog, RedeemEvent, ReputationSnapshot, StakeEvent,
    VoteEvent,
};
pub use guild::{summarize_guild, GuildSnapshot, GuildSummary, VoterSnapshot};
pub use intents::{
    transaction_modal, ActionDispatcher, Intent, PendingTransaction, RecordingDispatcher,
    TransactionModal, TransactionModalView,
};
pub use proposal::{
    Address, Capability, Phase, ProposalSnapshot, ProposalStatus, SchemeParameters,
    SchemeSnapshot,
};
pub use settings::Settings;
pub use source::{derive_from_source, load_proposals, GuildFixture, MemorySource, ProposalSource};
pub use staking::StakeRequirement;
pub use units::{from_base_units, format_units, parse_units, Percentage};
pub use view::{
    derive_view, derive_views, DeriveContext, ProposalAction, ProposalInputs, ProposalView,
    Viewer, ViewerState,
};

/// Vote-slider bounds, in percent of the viewer's reputation
pub mod config {
    /// Slider position for a full vote against
    pub const SLIDER_MIN: i32 = -100;

    /// Slider position for a full vote for
    pub const SLIDER_MAX: i32 = 100;
}
