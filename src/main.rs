use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use scrutin::coordinator::{WorkflowApi, WorkflowCoordinator};
use scrutin::scenario::{run_scenario, Scenario, StepStatus};
use scrutin::workflow::Phase;
use scrutin::{ScrutinConfig, VoterAddress};

#[derive(Parser)]
#[command(name = "scrutin")]
#[command(about = "Voting workflow engine - phases, proposals, votes, tally")]
#[command(
    long_about = "Scrutin drives a six-phase voting workflow: voter registration, \
                  proposal registration, a voting session, and a final tally. \
                  Run 'scrutin demo' for a complete lifecycle, or 'scrutin run' \
                  to replay a scenario file of workflow operations."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the lifecycle phases in their only legal order
    Phases,
    /// Run a built-in two-voter lifecycle from registration to winner
    Demo,
    /// Replay a scenario file of workflow operations
    Run {
        /// Path to the scenario JSON file
        file: PathBuf,
        /// Print the full replay report as JSON
        #[arg(long, help = "Emit the step-by-step report as JSON")]
        json: bool,
    },
}

fn main() -> Result<()> {
    ScrutinConfig::load_env_file()?;
    let config = ScrutinConfig::load()?;
    scrutin::init_telemetry(&config.observability)?;

    let cli = Cli::parse();

    match cli.command {
        // Default behavior: explain what scrutin does and how to drive it
        None => {
            show_usage_guidance();
            Ok(())
        }
        Some(Commands::Phases) => {
            phases_command();
            Ok(())
        }
        Some(Commands::Demo) => {
            tokio::runtime::Runtime::new()?.block_on(async { demo_command(&config).await })
        }
        Some(Commands::Run { file, json }) => tokio::runtime::Runtime::new()?
            .block_on(async { run_command(&config, &file, json).await }),
    }
}

fn show_usage_guidance() {
    println!("SCRUTIN - Voting Workflow Engine");
    println!("================================");
    println!();
    println!("One admin opens the phases, registered voters each submit one");
    println!("proposal and cast one vote, and the tally fixes the winner.");
    println!();
    println!("📊 Quick start:");
    println!("   scrutin phases          # the six lifecycle phases");
    println!("   scrutin demo            # complete lifecycle with two voters");
    println!("   scrutin run demo.json   # replay your own scenario file");
    println!();
    println!("EXAMPLE WORKFLOW:");
    println!("   1. register_voter for each participant (admin only)");
    println!("   2. start_proposals_registration, collect proposals, end it");
    println!("   3. start_voting_session, collect votes, end it");
    println!("   4. tally_votes, then get_winner");
    println!();
    println!("Admin address comes from scrutin.toml or SCRUTIN_ADMIN__ADDRESS.");
}

fn phases_command() {
    println!("🗳️  WORKFLOW PHASES");
    for (index, phase) in Phase::ALL.iter().enumerate() {
        println!("   {}. {}", index + 1, phase);
    }
    println!();
    println!("Transitions are admin-only and strictly forward; reset_workflow");
    println!("returns to {} from any phase.", Phase::RegisteringVoters);
}

fn parse_admin(config: &ScrutinConfig) -> Result<VoterAddress> {
    VoterAddress::parse(&config.admin.address)
        .with_context(|| format!("configured admin address {:?} is invalid", config.admin.address))
}

async fn demo_command(config: &ScrutinConfig) -> Result<()> {
    let admin = parse_admin(config)?;
    let alice = VoterAddress::parse("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")?;
    let bob = VoterAddress::parse("0x3C44CdDdB6a900fA2b585dd299e03d12FA4293BC")?;

    let coordinator = WorkflowCoordinator::new(admin.clone());

    println!("🗳️  SCRUTIN DEMO - full lifecycle with two voters");
    println!();

    coordinator.register_voter(&admin, &alice).await?;
    coordinator.register_voter(&admin, &bob).await?;
    println!("✅ Registered voters: {alice}, {bob}");

    coordinator.start_proposals_registration(&admin).await?;
    let first = coordinator
        .submit_proposal(&alice, "Extend the community garden")
        .await?;
    let second = coordinator
        .submit_proposal(&bob, "Fund the repair workshop")
        .await?;
    coordinator.end_proposals_registration(&admin).await?;
    println!("✅ Proposals collected: ids {first} and {second}");

    coordinator.start_voting_session(&admin).await?;
    coordinator.vote(&alice, first).await?;
    coordinator.vote(&bob, second).await?;
    coordinator.end_voting_session(&admin).await?;
    println!("✅ Votes cast: one each");

    coordinator.tally_votes(&admin).await?;
    let winner = coordinator.get_winner().await?;
    println!();
    println!(
        "🏆 Winner: proposal {} - {:?} ({} vote(s), ties go to the lowest id)",
        winner.id, winner.description, winner.vote_count
    );

    let report = coordinator.status_report().await;
    println!();
    println!("📊 FINAL STATE");
    println!("   Phase:      {}", report.phase);
    println!("   Voters:     {}", report.registered_voters);
    println!("   Proposals:  {}", report.proposals);
    println!("   Transitions recorded: {}", report.transitions);
    Ok(())
}

async fn run_command(config: &ScrutinConfig, file: &PathBuf, json: bool) -> Result<()> {
    let scenario = Scenario::from_path(file)?;
    let admin = match &scenario.admin {
        Some(address) => address.clone(),
        None => parse_admin(config)?,
    };

    let coordinator = WorkflowCoordinator::new(admin);
    let report = run_scenario(&coordinator, &scenario).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(description) = &scenario.description {
            println!("🗳️  SCENARIO: {description}");
        }
        for step in &report.steps {
            match &step.status {
                StepStatus::Ok { detail } => {
                    println!("   ✅ [{}] {} - {}", step.index, step.operation, detail);
                }
                StepStatus::ExpectedError { error } => {
                    println!(
                        "   ✅ [{}] {} - rejected as expected: {}",
                        step.index, step.operation, error
                    );
                }
                StepStatus::UnexpectedError { error } => {
                    println!("   ❌ [{}] {} - {}", step.index, step.operation, error);
                }
                StepStatus::ExpectedErrorButSucceeded { detail } => {
                    println!(
                        "   ❌ [{}] {} - succeeded but an error was expected: {}",
                        step.index, step.operation, detail
                    );
                }
            }
        }
        println!();
        println!("Final phase: {}", report.final_phase);
    }

    if !report.passed {
        bail!("scenario {} did not pass", file.display());
    }
    Ok(())
}
