//! Read-side collaborator: where snapshots and event logs come from
//!
//! Production reads go through a chain client implementing
//! [`ProposalSource`]. [`MemorySource`] serves a JSON fixture of the same
//! reads for tooling and tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, info};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};
use crate::events::{ProposalEventLog, ReputationSnapshot};
use crate::guild::{GuildSnapshot, VoterSnapshot};
use crate::proposal::{Address, ProposalSnapshot, SchemeSnapshot};
use crate::units::amount;
use crate::view::{derive_view, DeriveContext, ProposalInputs, ProposalView, Viewer};

pub trait ProposalSource {
    fn guild(&self) -> Result<GuildSnapshot>;
    fn scheme(&self) -> Result<SchemeSnapshot>;
    fn proposal_ids(&self) -> Result<Vec<String>>;
    /// `Ok(None)` when the guild has no proposal with this id
    fn proposal(&self, id: &str) -> Result<Option<ProposalSnapshot>>;
    fn events(&self, id: &str) -> Result<ProposalEventLog>;
    /// Reputation of `account` and total supply at `block`.
    fn reputation_at(&self, block: u64, account: Option<&Address>) -> Result<ReputationSnapshot>;
    fn voter(&self, account: &Address) -> Result<VoterSnapshot>;
}

/// Fetch every proposal the guild lists, in listing order.
pub fn load_proposals(source: &dyn ProposalSource) -> Result<Vec<ProposalSnapshot>> {
    let ids = source.proposal_ids()?;
    debug!("loading {} proposals", ids.len());
    ids.iter()
        .map(|id| {
            source
                .proposal(id)?
                .ok_or_else(|| GovernanceError::NotFound(id.clone()))
        })
        .collect()
}

/// Read everything one proposal needs from `source` and derive its view.
pub fn derive_from_source(
    source: &dyn ProposalSource,
    id: &str,
    viewer: Option<&Viewer>,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<ProposalView> {
    let snapshot = source.proposal(id)?;
    let events = match &snapshot {
        Some(_) => source.events(id)?,
        None => ProposalEventLog::default(),
    };
    let reputation = match &snapshot {
        Some(snapshot) => source.reputation_at(
            snapshot.creation_block,
            viewer.map(|viewer| &viewer.address),
        )?,
        None => ReputationSnapshot::default(),
    };
    let scheme = source.scheme()?;

    derive_view(
        ProposalInputs {
            id,
            snapshot: snapshot.as_ref(),
            scheme: &scheme,
            events: &events,
            reputation: &reputation,
        },
        viewer,
        now,
        ctx,
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub account: Address,
    #[serde(with = "amount")]
    pub amount: BigUint,
}

/// Reputation balances recorded at one block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub block: u64,
    #[serde(with = "amount")]
    pub total_supply: BigUint,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub snapshot: ProposalSnapshot,
    #[serde(default)]
    pub events: ProposalEventLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterRecord {
    pub account: Address,
    #[serde(flatten)]
    pub snapshot: VoterSnapshot,
}

/// On-disk fixture layout read by [`MemorySource`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildFixture {
    pub guild: GuildSnapshot,
    pub scheme: SchemeSnapshot,
    #[serde(default)]
    pub proposals: Vec<ProposalRecord>,
    #[serde(default)]
    pub reputation: Vec<ReputationRecord>,
    #[serde(default)]
    pub voters: Vec<VoterRecord>,
}

#[derive(Debug, Clone)]
pub struct MemorySource {
    fixture: GuildFixture,
    index: HashMap<String, usize>,
}

impl MemorySource {
    pub fn new(fixture: GuildFixture) -> Self {
        let index = fixture
            .proposals
            .iter()
            .enumerate()
            .map(|(i, record)| (record.snapshot.id.clone(), i))
            .collect();
        Self { fixture, index }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(contents)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = Self::from_json(&fs::read_to_string(path)?)?;
        info!(
            "Loaded {} proposals for guild {} from {}",
            source.fixture.proposals.len(),
            source.fixture.guild.name,
            path.display()
        );
        Ok(source)
    }

    fn record(&self, id: &str) -> Option<&ProposalRecord> {
        self.index.get(id).map(|&i| &self.fixture.proposals[i])
    }
}

impl ProposalSource for MemorySource {
    fn guild(&self) -> Result<GuildSnapshot> {
        Ok(self.fixture.guild.clone())
    }

    fn scheme(&self) -> Result<SchemeSnapshot> {
        Ok(self.fixture.scheme.clone())
    }

    fn proposal_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .fixture
            .proposals
            .iter()
            .map(|record| record.snapshot.id.clone())
            .collect())
    }

    fn proposal(&self, id: &str) -> Result<Option<ProposalSnapshot>> {
        Ok(self.record(id).map(|record| record.snapshot.clone()))
    }

    fn events(&self, id: &str) -> Result<ProposalEventLog> {
        self.record(id)
            .map(|record| record.events.clone())
            .ok_or_else(|| GovernanceError::NotFound(id.to_string()))
    }

    /// Uses the latest record at or before `block`; with none, reports a
    /// zero supply so derivation fails closed.
    fn reputation_at(&self, block: u64, account: Option<&Address>) -> Result<ReputationSnapshot> {
        let record = self
            .fixture
            .reputation
            .iter()
            .filter(|record| record.block <= block)
            .max_by_key(|record| record.block);

        let Some(record) = record else {
            return Ok(ReputationSnapshot::default());
        };
        let user_rep = account
            .and_then(|account| {
                record
                    .balances
                    .iter()
                    .find(|balance| &balance.account == account)
            })
            .map(|balance| balance.amount.clone())
            .unwrap_or_else(BigUint::zero);

        Ok(ReputationSnapshot {
            user_rep,
            total_supply: record.total_supply.clone(),
        })
    }

    fn voter(&self, account: &Address) -> Result<VoterSnapshot> {
        Ok(self
            .fixture
            .voters
            .iter()
            .find(|voter| &voter.account == account)
            .map(|voter| voter.snapshot.clone())
            .unwrap_or_default())
    }
}
