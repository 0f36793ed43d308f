//! QGate - quality-gate pipeline CLI
//!
//! The `qgate` command drives a workspace's gate document from scripts and
//! CI jobs. Every command prints its result as JSON on stdout; logs go to
//! stderr.
//!
//! ## Commands
//!
//! - `submit` / `vote`: submit a change and record its blind vote
//! - `resident`: register or inspect residents
//! - `claim`: claim a change for QA
//! - `test`: propose tests, vote on them, record results
//! - `batch`: form and resolve integration batches
//! - `e2e`: record the final end-to-end result
//! - `show` / `list` / `state`: read-only views

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, Level};

use qgate_core::{ChangeStatus, GateConfig, QualityGateManager, TestType, Vote};

#[derive(Parser)]
#[command(name = "qgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Quality-gate pipeline for proposed changes", long_about = None)]
struct Cli {
    /// Path to the workspace gate document
    #[arg(long, global = true, env = "QGATE_STATE_PATH")]
    state: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a change for the blind vote
    Submit {
        /// Short title of the change
        #[arg(short, long)]
        title: String,

        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Resident or agent that authored the change
        #[arg(short, long)]
        author: String,
    },

    /// Record the blind vote on a change (approved|rejected)
    Vote {
        change_id: String,
        #[arg(value_parser = parse_vote)]
        vote: Vote,
    },

    /// Manage residents
    Resident {
        #[command(subcommand)]
        action: ResidentAction,
    },

    /// Claim a change for QA
    Claim {
        change_id: String,

        /// Resident taking the claim (must carry the `qa` specialization)
        #[arg(short, long)]
        resident: String,
    },

    /// Test proposals and results
    Test {
        #[command(subcommand)]
        action: TestAction,
    },

    /// Integration batches
    Batch {
        #[command(subcommand)]
        action: BatchAction,
    },

    /// Record the end-to-end result for a change
    E2e {
        change_id: String,
        #[command(flatten)]
        outcome: Outcome,
    },

    /// Show one change
    Show { change_id: String },

    /// List changes in creation order
    List {
        /// Only changes in this status (e.g. needs_integration)
        #[arg(short, long, value_parser = parse_status)]
        status: Option<ChangeStatus>,
    },

    /// Print the whole gate document
    State,
}

#[derive(Subcommand)]
enum ResidentAction {
    /// Register or update a resident
    Register {
        resident_id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Capability tags (comma-separated, e.g. qa,review)
        #[arg(short, long, value_delimiter = ',')]
        specializations: Vec<String>,

        /// What the resident focuses on
        #[arg(short, long)]
        focus: Option<String>,
    },

    /// Show a resident
    Show { resident_id: String },
}

#[derive(Subcommand)]
enum TestAction {
    /// Propose a test for a claimed change
    Propose {
        change_id: String,

        /// Resident proposing the test
        #[arg(short, long)]
        resident: String,

        /// unit|integration|e2e
        #[arg(short = 't', long = "type", value_parser = parse_test_type)]
        test_type: TestType,
    },

    /// Peer vote on a proposed test (approved|rejected)
    Vote {
        test_id: String,
        #[arg(value_parser = parse_vote)]
        vote: Vote,
    },

    /// Record a reported test result
    Result {
        change_id: String,

        /// unit|e2e
        #[arg(short = 't', long = "type", value_parser = parse_test_type)]
        test_type: TestType,

        #[command(flatten)]
        outcome: Outcome,
    },

    /// List tests proposed for a change
    List { change_id: String },
}

#[derive(Subcommand)]
enum BatchAction {
    /// Group eligible changes into new integration batches
    Create {
        /// Maximum changes per batch (default: policy value)
        #[arg(short, long)]
        max_batch_size: Option<usize>,
    },

    /// Record the outcome of an integration batch
    Result {
        batch_id: String,
        #[command(flatten)]
        outcome: Outcome,
    },

    /// List unresolved batches
    Pending,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Outcome {
    /// The gate passed
    #[arg(long)]
    passed: bool,

    /// The gate failed
    #[arg(long)]
    failed: bool,
}

impl Outcome {
    fn passed(&self) -> bool {
        self.passed && !self.failed
    }
}

fn parse_vote(s: &str) -> std::result::Result<Vote, String> {
    s.parse().map_err(|e: qgate_core::QualityGateError| e.to_string())
}

fn parse_test_type(s: &str) -> std::result::Result<TestType, String> {
    s.parse().map_err(|e: qgate_core::QualityGateError| e.to_string())
}

fn parse_status(s: &str) -> std::result::Result<ChangeStatus, String> {
    s.parse().map_err(|e: qgate_core::QualityGateError| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    qgate_core::init_tracing(cli.json, level);

    let mut config = GateConfig::from_env().context("Invalid QGATE_* environment")?;
    if let Some(state) = cli.state {
        config.state_path = state;
    }
    debug!(state = %config.state_path.display(), "opening workspace");
    let gm = QualityGateManager::from_config(&config).with_context(|| {
        format!(
            "Failed to open gate document at {}",
            config.state_path.display()
        )
    })?;

    run(&gm, cli.command)
}

fn run(gm: &QualityGateManager, command: Commands) -> Result<()> {
    match command {
        Commands::Submit {
            title,
            description,
            author,
        } => {
            let change_id = gm.submit_change_for_vote(&title, &description, &author)?;
            print_json(&serde_json::json!({ "change_id": change_id }))
        }
        Commands::Vote { change_id, vote } => print_json(&gm.record_change_vote(&change_id, vote)?),
        Commands::Resident { action } => match action {
            ResidentAction::Register {
                resident_id,
                name,
                specializations,
                focus,
            } => print_json(&gm.register_resident(&resident_id, &name, specializations, focus)?),
            ResidentAction::Show { resident_id } => print_json(&gm.get_resident(&resident_id)?),
        },
        Commands::Claim {
            change_id,
            resident,
        } => print_json(&gm.claim_qa(&change_id, &resident)?),
        Commands::Test { action } => match action {
            TestAction::Propose {
                change_id,
                resident,
                test_type,
            } => {
                let test_id = gm.submit_test_for_vote(&change_id, &resident, test_type)?;
                print_json(&serde_json::json!({ "test_id": test_id }))
            }
            TestAction::Vote { test_id, vote } => print_json(&gm.record_test_vote(&test_id, vote)?),
            TestAction::Result {
                change_id,
                test_type,
                outcome,
            } => print_json(&gm.record_test_result(&change_id, test_type, outcome.passed())?),
            TestAction::List { change_id } => print_json(&gm.tests_for_change(&change_id)?),
        },
        Commands::Batch { action } => match action {
            BatchAction::Create { max_batch_size } => {
                let size = max_batch_size.unwrap_or(gm.policy().default_max_batch_size);
                print_json(&gm.create_integration_batches(size)?)
            }
            BatchAction::Result { batch_id, outcome } => {
                print_json(&gm.record_integration_batch_result(&batch_id, outcome.passed())?)
            }
            BatchAction::Pending => print_json(&gm.pending_batches()?),
        },
        Commands::E2e { change_id, outcome } => {
            print_json(&gm.record_e2e_result(&change_id, outcome.passed())?)
        }
        Commands::Show { change_id } => print_json(&gm.get_change(&change_id)?),
        Commands::List { status } => print_json(&gm.list_changes(status)?),
        Commands::State => print_json(&gm.load_state()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}
