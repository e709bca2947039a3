use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use governance::units::REPUTATION_DECIMALS;
use governance::{
    derive_from_source, derive_views, format_units, load_proposals, parse_units, summarize_guild,
    transaction_modal, ActionDispatcher, Address, DeriveContext, Intent, MemorySource, NoDecoder,
    ProposalInputs, ProposalSource, ProposalView, RecordingDispatcher, Settings, StakeRequirement,
    TransactionModal, Viewer, ViewerState,
};
use log::{info, warn};
use num_bigint::BigUint;

#[derive(Parser)]
#[command(name = "proposal-cli")]
#[command(about = "Guild proposal inspection CLI")]
struct Cli {
    /// Guild fixture (JSON) to read proposals from
    #[arg(short, long, default_value = "fixtures/guild.json")]
    fixture: PathBuf,

    /// Network and token settings (TOML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Unix time used as "now"; defaults to the system clock
    #[arg(long)]
    now: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all proposals
    List {
        #[arg(long)]
        viewer: Option<String>,
    },

    /// Get proposal details
    Show {
        #[arg(short, long)]
        id: String,

        #[arg(long)]
        viewer: Option<String>,

        /// Staking token allowance of the viewer, in token units
        #[arg(long, default_value = "0")]
        allowance: String,
    },

    /// Show guild configuration
    Guild {
        #[arg(long)]
        viewer: Option<String>,
    },

    /// Vote with a share of the viewer's reputation (-100..=100)
    Vote {
        #[arg(short, long)]
        id: String,

        #[arg(long)]
        viewer: String,

        #[arg(long, allow_hyphen_values = true)]
        slider: i32,

        /// Simulate a wallet that rejects the request
        #[arg(long)]
        reject: bool,
    },

    /// Stake tokens; a negative amount stakes against
    Stake {
        #[arg(short, long)]
        id: String,

        #[arg(long)]
        viewer: String,

        #[arg(short, long, allow_hyphen_values = true)]
        amount: String,

        /// Staking token allowance of the viewer; approval is requested
        /// first when it is zero
        #[arg(long, default_value = "0")]
        allowance: String,

        #[arg(long)]
        reject: bool,
    },

    /// Redeem a resolved proposal for the viewer
    Redeem {
        #[arg(short, long)]
        id: String,

        #[arg(long)]
        viewer: String,

        #[arg(long)]
        reject: bool,
    },

    /// Boost or execute a proposal that is ready for it
    Execute {
        #[arg(short, long)]
        id: String,

        #[arg(long)]
        reject: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let source = MemorySource::load(&cli.fixture)
        .with_context(|| format!("failed to load fixture {}", cli.fixture.display()))?;
    let now = cli.now.unwrap_or_else(current_time);
    let ctx = DeriveContext {
        controller: &settings.network.controller,
        decimals: settings.token.decimals,
        decoder: &NoDecoder,
    };

    match cli.command {
        Commands::List { viewer } => {
            let viewer = viewer.map(Viewer::new);
            let views = list_views(&source, viewer.as_ref(), now, &ctx)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                for view in &views {
                    println!(
                        "{}  {:<18} {:?}  {}",
                        view.id, view.status, view.phase, view.title
                    );
                }
            }
        }
        Commands::Show {
            id,
            viewer,
            allowance,
        } => {
            let allowance = parse_allowance(&allowance, settings.token.decimals)?;
            let viewer = viewer.map(|address| Viewer::new(address).with_allowance(allowance));
            let view = derive_from_source(&source, &id, viewer.as_ref(), now, &ctx)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", render_view(&view, &settings.token.symbol));
            }
        }
        Commands::Guild { viewer } => {
            let guild = source.guild()?;
            let voter = match viewer {
                Some(address) => Some(source.voter(&Address::new(address))?),
                None => None,
            };
            let summary = summarize_guild(
                &guild,
                voter.as_ref(),
                &settings.token.symbol,
                settings.token.decimals,
            );
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{} ({})", summary.name, summary.token);
                println!("{} {}", summary.proposal_duration, summary.execution_window);
                println!("Permission registry: {}", summary.permission_registry);
                println!("Max active proposals: {}", summary.max_active_proposals);
                println!(
                    "Voting power to create / execute: {} / {}",
                    summary.voting_power_for_proposal_creation,
                    summary.voting_power_for_proposal_execution
                );
                if let Some(locked) = &summary.total_locked {
                    println!("Total locked: {}", locked);
                }
                if let Some(power) = &summary.voting_power {
                    println!("Your voting power: {}", power);
                }
                if let Some(date) = &summary.unlock_date {
                    println!("Unlocks on {}", date);
                }
            }
        }
        Commands::Vote {
            id,
            viewer,
            slider,
            reject,
        } => {
            let intent = vote_intent(&source, &id, &Viewer::new(viewer), slider, now, &ctx)?;
            submit(vec![intent], reject, &settings, cli.json)?;
        }
        Commands::Stake {
            id,
            viewer,
            amount,
            allowance,
            reject,
        } => {
            let allowance = parse_allowance(&allowance, settings.token.decimals)?;
            let viewer = Viewer::new(viewer).with_allowance(allowance);
            let intents = stake_intents(&source, &id, &viewer, &amount, now, &ctx)?;
            submit(intents, reject, &settings, cli.json)?;
        }
        Commands::Redeem { id, viewer, reject } => {
            let intent = redeem_intent(&source, &id, Viewer::new(viewer), now, &ctx)?;
            submit(vec![intent], reject, &settings, cli.json)?;
        }
        Commands::Execute { id, reject } => {
            let intent = execute_intent(&source, &id, now, &ctx)?;
            submit(vec![intent], reject, &settings, cli.json)?;
        }
    }

    Ok(())
}

fn current_time() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

fn parse_allowance(input: &str, decimals: u32) -> Result<BigUint> {
    parse_units(input, decimals)?
        .to_biguint()
        .with_context(|| format!("allowance {} is negative", input))
}

/// Viewer state of `id` as `viewer` would see it now.
fn viewer_state(
    source: &dyn ProposalSource,
    id: &str,
    viewer: &Viewer,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<(ProposalView, ViewerState)> {
    let mut view = derive_from_source(source, id, Some(viewer), now, ctx)?;
    let state = view
        .viewer
        .take()
        .with_context(|| format!("no viewer state for proposal {}", id))?;
    Ok((view, state))
}

fn vote_intent(
    source: &dyn ProposalSource,
    id: &str,
    viewer: &Viewer,
    slider: i32,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<Intent> {
    let (view, state) = viewer_state(source, id, viewer, now, ctx)?;
    if !state.can_vote {
        bail!(
            "{} cannot vote on proposal {} ({}, voted {} REP)",
            viewer.address,
            id,
            view.status,
            format_units(&state.voted_amount, REPUTATION_DECIMALS)
        );
    }
    let snapshot = source
        .proposal(id)?
        .with_context(|| format!("proposal {} not found", id))?;
    let reputation = source.reputation_at(snapshot.creation_block, Some(&viewer.address))?;
    Ok(Intent::vote_from_slider(id, slider, &reputation.user_rep)?)
}

/// The stake intent, preceded by a token approval when the viewer has no
/// allowance yet.
fn stake_intents(
    source: &dyn ProposalSource,
    id: &str,
    viewer: &Viewer,
    amount: &str,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<Vec<Intent>> {
    let (view, state) = viewer_state(source, id, viewer, now, ctx)?;
    if !state.can_stake {
        bail!("proposal {} is not accepting stakes ({})", id, view.status);
    }
    let stake = Intent::stake_from_input(id, amount, ctx.decimals)?;
    if state.needs_approval {
        Ok(vec![Intent::ApproveToken, stake])
    } else {
        Ok(vec![stake])
    }
}

fn redeem_intent(
    source: &dyn ProposalSource,
    id: &str,
    viewer: Viewer,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<Intent> {
    let (_, state) = viewer_state(source, id, &viewer, now, ctx)?;
    if !state.redeem_available {
        bail!("nothing to redeem on proposal {} for {}", id, viewer.address);
    }
    Ok(Intent::Redeem {
        proposal_id: id.to_string(),
        account: viewer.address,
    })
}

fn execute_intent(
    source: &dyn ProposalSource,
    id: &str,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<Intent> {
    let view = derive_from_source(source, id, None, now, ctx)?;
    let Some(action) = view.action else {
        bail!("proposal {} has no pending action ({})", id, view.status);
    };
    Ok(action.intent(id))
}

/// Derive every listed proposal, skipping the ones that fail to derive.
fn list_views(
    source: &dyn ProposalSource,
    viewer: Option<&Viewer>,
    now: u64,
    ctx: &DeriveContext<'_>,
) -> Result<Vec<ProposalView>> {
    let proposals = load_proposals(source)?;
    let scheme = source.scheme()?;
    let address = viewer.map(|viewer| &viewer.address);

    let mut reads = Vec::with_capacity(proposals.len());
    for snapshot in &proposals {
        let events = source.events(&snapshot.id)?;
        let reputation = source.reputation_at(snapshot.creation_block, address)?;
        reads.push((events, reputation));
    }

    let batch: Vec<ProposalInputs<'_>> = proposals
        .iter()
        .zip(&reads)
        .map(|(snapshot, (events, reputation))| ProposalInputs {
            id: &snapshot.id,
            snapshot: Some(snapshot),
            scheme: &scheme,
            events,
            reputation,
        })
        .collect();

    let mut views = Vec::with_capacity(batch.len());
    for (inputs, result) in batch.iter().zip(derive_views(&batch, viewer, now, ctx)) {
        match result {
            Ok(view) => views.push(view),
            Err(e) => warn!("skipping proposal {}: {}", inputs.id, e),
        }
    }
    Ok(views)
}

/// Dispatch `intents` in order and collect the modals shown for each.
/// A rejected request stops the sequence.
fn dispatch_all(
    dispatcher: &mut dyn ActionDispatcher,
    intents: Vec<Intent>,
    settings: &Settings,
) -> Vec<TransactionModal> {
    let explorer = &settings.network.explorer;
    let mut modals = Vec::with_capacity(intents.len() * 2);

    for intent in intents {
        let message = intent.message(&settings.token.symbol, settings.token.decimals);
        modals.push(transaction_modal(&message, None, false, explorer));
        match dispatcher.dispatch(intent) {
            Ok(pending) => {
                info!("submitted {}", pending.hash);
                modals.push(transaction_modal(
                    &message,
                    Some(pending.hash.as_str()),
                    false,
                    explorer,
                ));
            }
            Err(e) => {
                warn!("dispatch failed: {}", e);
                modals.push(transaction_modal(&message, None, true, explorer));
                break;
            }
        }
    }
    modals
}

fn submit(intents: Vec<Intent>, reject: bool, settings: &Settings, json: bool) -> Result<()> {
    let mut dispatcher = if reject {
        RecordingDispatcher::rejecting()
    } else {
        RecordingDispatcher::new()
    };
    let modals = dispatch_all(&mut dispatcher, intents, settings);

    if json {
        println!("{}", serde_json::to_string_pretty(&modals)?);
    } else {
        for modal in &modals {
            print!("{}", render_modal(modal));
        }
    }
    Ok(())
}

fn render_modal(modal: &TransactionModal) -> String {
    let mut out = format!("[{}]\n", modal.title);
    for line in [&modal.detail, &modal.explorer_link, &modal.footer]
        .into_iter()
        .flatten()
    {
        out.push_str(&format!("  {}\n", line));
    }
    out
}

fn render_requirement(label: &str, requirement: Option<&StakeRequirement>, symbol: &str) -> String {
    match requirement {
        Some(StakeRequirement::Required { display, .. }) => {
            format!("{}: {} {}\n", label, display, symbol)
        }
        Some(StakeRequirement::Satisfied) => format!("{}: reached\n", label),
        None => String::new(),
    }
}

fn render_view(view: &ProposalView, symbol: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", view.title, view.id));
    out.push_str(&format!("Status: {} [{:?}]\n", view.status, view.phase));
    out.push_str(&format!("Proposer: {}\n", view.proposer));
    out.push_str(&format!("Submitted: {}\n", view.timeline.submitted));
    out.push_str(&format!("Boosted: {}\n", view.timeline.boosted));
    out.push_str(&format!("Finish: {}\n", view.timeline.finish));
    if let Some(boost) = &view.timeline.time_to_boost {
        out.push_str(&format!("Boost {}\n", boost));
    }
    if let Some(finish) = &view.timeline.time_to_finish {
        let suffix = if view.timeline.finish_after_boost {
            " after boost"
        } else {
            ""
        };
        out.push_str(&format!("Finish {}{}\n", finish, suffix));
    }

    out.push_str(&format!(
        "Votes: {}% for ({}), {}% against ({})\n",
        view.votes.positive_percentage,
        view.votes.positive_count,
        view.votes.negative_percentage,
        view.votes.negative_count
    ));
    out.push_str(&format!(
        "Stakes: {} {} for ({}), {} {} against ({})\n",
        view.stakes.positive_display,
        symbol,
        view.stakes.positive_count,
        view.stakes.negative_display,
        symbol,
        view.stakes.negative_count
    ));
    out.push_str(&render_requirement("Stake to boost", view.stake_to_boost.as_ref(), symbol));
    out.push_str(&render_requirement("Stake to unboost", view.stake_to_unboost.as_ref(), symbol));

    for (i, call) in view.calls.iter().enumerate() {
        out.push_str(&format!("Call {}: {}\n", i + 1, call.text));
    }
    for entry in &view.history {
        out.push_str(&format!("- {}\n", entry));
    }
    if let Some(action) = view.action {
        out.push_str(&format!("Action: {:?}\n", action));
    }
    if let Some(state) = &view.viewer {
        out.push_str(&format!(
            "You: voted {} REP, staked {} {}, vote power {}%\n",
            format_units(&state.voted_amount, REPUTATION_DECIMALS),
            state.staked_display,
            symbol,
            state.vote_power
        ));
        out.push_str(&format!(
            "  can vote: {}, can stake: {}, can redeem: {}, needs approval: {}\n",
            state.can_vote, state.can_stake, state.redeem_available, state.needs_approval
        ));
    }
    for diagnostic in &view.diagnostics {
        out.push_str(&format!("warning: {}\n", diagnostic));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../fixtures/guild.json");

    fn ctx(controller: &Address) -> DeriveContext<'_> {
        DeriveContext {
            controller,
            decimals: 18,
            decoder: &NoDecoder,
        }
    }

    const NOW: u64 = 1_617_000_000;
    const QUEUED: &str = "0x8a1e6f3c2b4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f";
    const BOOSTED: &str = "0x1f2e3d4c5b6a79880796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";
    const RESOLVED: &str = "0x0c0d0e0f101112131415161718191a1b1c1d1e1f202122232425262728292a2b";
    const ALICE: &str = "0x3e1a4b2c5d6e7f8091a2b3c4d5e6f708192a3b4c";
    const CONTROLLER: &str = "0x9f828ac3baa9003e8a4e0b24bcae7b027b6740b0";

    fn settings() -> Settings {
        Settings::from_toml_str(include_str!("../fixtures/settings.toml")).unwrap()
    }

    #[test]
    fn test_resolved_proposal_rejects_vote_and_stake() {
        let source = MemorySource::from_json(FIXTURE).unwrap();
        let controller = Address::new(CONTROLLER);
        let alice = Viewer::new(ALICE);

        let vote = vote_intent(&source, RESOLVED, &alice, 100, NOW, &ctx(&controller));
        assert!(vote.unwrap_err().to_string().contains("cannot vote"));

        let stake = stake_intents(&source, RESOLVED, &alice, "5", NOW, &ctx(&controller));
        assert!(stake.unwrap_err().to_string().contains("not accepting stakes"));
    }

    #[test]
    fn test_vote_requires_not_having_voted() {
        let source = MemorySource::from_json(FIXTURE).unwrap();
        let controller = Address::new(CONTROLLER);
        let alice = Viewer::new(ALICE);

        assert!(vote_intent(&source, QUEUED, &alice, 50, NOW, &ctx(&controller)).is_err());

        let intent = vote_intent(&source, BOOSTED, &alice, 50, NOW, &ctx(&controller)).unwrap();
        assert_eq!(
            intent,
            Intent::Vote {
                decision: governance::Decision::For,
                amount: BigUint::from(210_000_000_000_000_000_000u128),
                proposal_id: BOOSTED.to_string(),
            }
        );
    }

    #[test]
    fn test_stake_asks_for_approval_without_allowance() {
        let source = MemorySource::from_json(FIXTURE).unwrap();
        let controller = Address::new(CONTROLLER);

        let intents = stake_intents(&source, QUEUED, &Viewer::new(ALICE), "1", NOW, &ctx(&controller)).unwrap();
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0], Intent::ApproveToken);

        let approved = Viewer::new(ALICE).with_allowance(BigUint::from(1u32));
        let intents = stake_intents(&source, QUEUED, &approved, "-1", NOW, &ctx(&controller)).unwrap();
        assert!(matches!(
            intents.as_slice(),
            [Intent::Stake {
                decision: governance::Decision::Against,
                ..
            }]
        ));
    }

    #[test]
    fn test_redeem_and_execute_gates() {
        let source = MemorySource::from_json(FIXTURE).unwrap();
        let controller = Address::new(CONTROLLER);

        // alice already redeemed the resolved proposal
        assert!(redeem_intent(&source, RESOLVED, Viewer::new(ALICE), NOW, &ctx(&controller)).is_err());
        assert!(execute_intent(&source, RESOLVED, NOW, &ctx(&controller)).is_err());
        assert_eq!(
            execute_intent(&source, QUEUED, NOW, &ctx(&controller)).unwrap(),
            Intent::Execute {
                proposal_id: QUEUED.to_string()
            }
        );
    }

    #[test]
    fn test_rejection_stops_the_sequence() {
        let mut dispatcher = RecordingDispatcher::rejecting();
        let intents = vec![
            Intent::ApproveToken,
            Intent::Execute {
                proposal_id: QUEUED.to_string(),
            },
        ];
        let modals = dispatch_all(&mut dispatcher, intents, &settings());
        assert_eq!(modals.len(), 2);
        assert_eq!(modals[1].title, "Transaction Rejected");
    }

    #[test]
    fn test_parse_allowance() {
        assert_eq!(
            parse_allowance("1.5", 18).unwrap(),
            BigUint::from(1_500_000_000_000_000_000u64)
        );
        assert!(parse_allowance("-1", 18).is_err());
        assert!(parse_allowance("lots", 18).is_err());
    }

    #[test]
    fn test_list_views_covers_fixture() {
        let source = MemorySource::from_json(FIXTURE).unwrap();
        let controller = Address::new("0x9f828ac3baa9003e8a4e0b24bcae7b027b6740b0");
        let views = list_views(&source, None, 1_617_000_000, &ctx(&controller)).unwrap();
        let ids: Vec<&str> = views.iter().map(|view| view.id.as_str()).collect();
        assert_eq!(ids, source.proposal_ids().unwrap());
    }

    #[test]
    fn test_render_view_mentions_votes_and_calls() {
        let source = MemorySource::from_json(FIXTURE).unwrap();
        let controller = Address::new("0x9f828ac3baa9003e8a4e0b24bcae7b027b6740b0");
        let id = source.proposal_ids().unwrap()[0].clone();
        let view = derive_from_source(&source, &id, None, 1_617_000_000, &ctx(&controller)).unwrap();

        let text = render_view(&view, "DXD");
        assert!(text.starts_with(&view.title));
        assert!(text.contains("Votes: "));
        assert!(text.contains("Call 1: "));
        assert!(text.contains("Stake to boost: "));
        assert!(text.contains("Stake to unboost: 1.00 DXD"));
    }

    #[test]
    fn test_render_modal() {
        let modal = transaction_modal("Executing proposal 0x1", Some("0xabc"), false, "https://etherscan.io");
        assert_eq!(
            render_modal(&modal),
            "[Transaction Submitted]\n  https://etherscan.io/tx/0xabc\n  Close\n"
        );
    }
}
