//! Prerequisite planner CLI.
//!
//! Answers whether a target status is ready to test (`ready`), shows the
//! candidate transition paths (`paths`), auto-executes missing prerequisites
//! (`run`), and prints the audit trail of a run (`log`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use planner::analyze::{PlannerEnv, analyze_target, candidate_paths};
use planner::execute::{
    ExecuteConfig, RunStop, StalledError, render_action_command, run_to_target,
};
use planner::exit_codes;
use planner::io::actions::{ActionRegistry, CommandAction};
use planner::io::prompt::choose_path;
use planner::io::snapshot::Snapshot;
use planner::logging;
use planner::report::render_report;

#[derive(Parser)]
#[command(
    name = "planner",
    version,
    about = "Prerequisite resolution and execution planner for implication suites"
)]
struct Cli {
    /// Discovered transitions file.
    #[arg(long, global = true, default_value = ".planner/discovery.json")]
    discovery: PathBuf,
    /// Implication registry file.
    #[arg(long, global = true, default_value = ".planner/registry.json")]
    registry: PathBuf,
    /// Planner configuration file.
    #[arg(long, global = true, default_value = ".planner/planner.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report whether a target status is ready to test.
    Ready {
        /// Run data snapshot.
        #[arg(long)]
        data: PathBuf,
        /// Target status.
        #[arg(long)]
        target: String,
        /// Emit the analysis as JSON instead of the report.
        #[arg(long)]
        json: bool,
    },
    /// List ranked candidate paths to a target status.
    Paths {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        target: String,
    },
    /// Execute missing prerequisites until the target is ready.
    Run {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        target: String,
        /// Take the top-ranked path without prompting.
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the change log of a run snapshot.
    Log {
        #[arg(long)]
        data: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Ready { data, target, json } => {
            let env = PlannerEnv::load(&cli.discovery, &cli.registry, &cli.config)?;
            cmd_ready(&env, &data, &target, json)
        }
        Command::Paths { data, target } => {
            let env = PlannerEnv::load(&cli.discovery, &cli.registry, &cli.config)?;
            cmd_paths(&env, &data, &target)
        }
        Command::Run { data, target, yes } => {
            let env = PlannerEnv::load(&cli.discovery, &cli.registry, &cli.config)?;
            cmd_run(&env, &data, &target, yes)
        }
        Command::Log { data } => cmd_log(&data),
    }
}

fn cmd_ready(env: &PlannerEnv, data: &Path, target: &str, json: bool) -> Result<i32> {
    let snapshot = Snapshot::load(data)?;
    let analysis = analyze_target(env, &snapshot, target, None)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        let next_command = analysis
            .next_step
            .as_ref()
            .map(|step| render_action_command(env, step, data));
        print!(
            "{}",
            render_report(&analysis, &[], next_command.as_deref())?
        );
    }
    Ok(if analysis.ready {
        exit_codes::OK
    } else {
        exit_codes::NOT_READY
    })
}

fn cmd_paths(env: &PlannerEnv, data: &Path, target: &str) -> Result<i32> {
    let snapshot = Snapshot::load(data)?;
    let candidates = candidate_paths(env, &snapshot, target)?;
    if candidates.is_empty() {
        println!("no transition path reaches '{target}'");
        return Ok(exit_codes::NOT_READY);
    }
    for (idx, candidate) in candidates.iter().enumerate() {
        let statuses: Vec<&str> = candidate.steps.iter().map(|s| s.status.as_str()).collect();
        let marker = if candidate.has_cross_platform {
            " (cross-platform)"
        } else {
            ""
        };
        println!(
            "[{idx}] {} (score {}){marker}",
            statuses.join(" -> "),
            candidate.score
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_run(env: &PlannerEnv, data: &Path, target: &str, yes: bool) -> Result<i32> {
    let snapshot = Snapshot::load(data)?;
    let candidates = candidate_paths(env, &snapshot, target)?;
    let choice = if yes {
        0
    } else {
        choose_path(&candidates, env.config.prompt_timeout())?
    };
    let route = candidates.get(choice);

    let mut actions = ActionRegistry::new();
    for spec in env.registry.iter() {
        actions.register(
            &spec.action,
            Box::new(CommandAction::new(
                env.config.action.command.clone(),
                &spec.test_file,
            )),
        );
    }

    let workdir = std::env::current_dir().context("resolve working directory")?;
    let exec = ExecuteConfig {
        workdir,
        log_dir: Some(PathBuf::from(".planner/logs")),
        action_timeout: env.config.action_timeout(),
        output_limit_bytes: env.config.action.output_limit_bytes,
    };

    let outcome = match run_to_target(env, &actions, data, target, route, &exec) {
        Ok(outcome) => outcome,
        Err(err) => {
            if err.downcast_ref::<StalledError>().is_some() {
                eprintln!("{err:#}");
                return Ok(exit_codes::STALLED);
            }
            return Err(err);
        }
    };

    match outcome.stop {
        RunStop::Ready => {
            print!("{}", render_report(&outcome.analysis, &[], None)?);
            println!(
                "target '{target}' ready after {} executed step(s)",
                outcome.steps_executed
            );
            Ok(exit_codes::OK)
        }
        RunStop::Blocked { manual } => {
            print!("{}", render_report(&outcome.analysis, &manual, None)?);
            Ok(exit_codes::BLOCKED)
        }
        RunStop::MissingFields { .. } => {
            print!("{}", render_report(&outcome.analysis, &[], None)?);
            Ok(exit_codes::NOT_READY)
        }
    }
}

fn cmd_log(data: &Path) -> Result<i32> {
    let snapshot = Snapshot::load(data)?;
    if snapshot.change_log().is_empty() {
        println!("no changes recorded for {}", data.display());
        return Ok(exit_codes::OK);
    }
    for entry in snapshot.change_log() {
        let keys: Vec<&str> = entry.delta.keys().map(String::as_str).collect();
        println!(
            "{} {} ({}) [{}]",
            entry.timestamp,
            entry.label,
            entry.test_file,
            keys.join(", ")
        );
    }
    Ok(exit_codes::OK)
}
