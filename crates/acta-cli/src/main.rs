//! `acta` command line client

use acta_client::{ApiOutcome, DocumentFormat, UserAction};
use acta_core::{Acta, ActaConfig, Stage, StepResult, WorkflowState};
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("acta")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate, download and send Acta project documents")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("skip-auth")
                .long("skip-auth")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Use the synthetic development identity"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("health").about("Check that the API is reachable"))
        .subcommand(
            Command::new("projects")
                .about("List projects")
                .arg(
                    Arg::new("pm")
                        .long("pm")
                        .help("Only projects managed by this e-mail (admin-all-access lists all)"),
                ),
        )
        .subcommand(
            Command::new("summary")
                .about("Show a project summary")
                .arg(Arg::new("project").required(true).help("Project id")),
        )
        .subcommand(
            Command::new("timeline")
                .about("Show a project timeline")
                .arg(Arg::new("project").required(true).help("Project id")),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate a project document and print its download link")
                .arg(Arg::new("project").required(true).help("Project id"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_parser(value_parser!(DocumentFormat))
                        .help("pdf or docx (default from configuration)"),
                ),
        )
        .subcommand(
            Command::new("approve")
                .about("E-mail an approval request for a document")
                .arg(Arg::new("document").required(true).help("Document id"))
                .arg(Arg::new("email").required(true).help("Recipient e-mail")),
        )
        .subcommand(
            Command::new("bulk-summaries")
                .about("Regenerate summaries for every project of a manager")
                .arg(Arg::new("pm").long("pm").help("Manager e-mail")),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ActaConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ActaConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ActaConfig::new(),
    };
    let mut config = config.with_env_overrides()?;
    if matches.get_flag("skip-auth") {
        config = config.with_skip_auth(true);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = load_config(&matches)?;
    let acta = Acta::from_config(config).context("initializing client")?;

    match matches.subcommand() {
        Some(("health", _)) => match acta.api().health().await {
            Ok(health) => {
                println!(
                    "API reachable (HTTP {}, status {})",
                    health.http_status,
                    health.status.as_deref().unwrap_or("unknown")
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(outcome) => Ok(failure(&outcome)),
        },
        Some(("projects", args)) => projects(&acta, args.get_one::<String>("pm")).await,
        Some(("summary", args)) => {
            let project = required(args, "project")?;
            print_result(acta.api().project_summary(project).await)
        }
        Some(("timeline", args)) => {
            let project = required(args, "project")?;
            print_result(acta.api().timeline(project).await)
        }
        Some(("generate", args)) => {
            let project = required(args, "project")?;
            let format = args
                .get_one::<DocumentFormat>("format")
                .copied()
                .unwrap_or(acta.config().default_format);
            generate(&acta, project, format).await
        }
        Some(("approve", args)) => {
            let document = required(args, "document")?;
            let email = required(args, "email")?;
            let report = acta.orchestrator().send_approval(document, email).await?;
            match &report.error {
                None => {
                    println!("Approval request sent to {}", report.recipient);
                    Ok(ExitCode::SUCCESS)
                }
                Some(outcome) => Ok(failure(outcome)),
            }
        }
        Some(("bulk-summaries", args)) => {
            let Some(pm) = pm_email(&acta, args.get_one::<String>("pm")).await else {
                anyhow::bail!("no manager e-mail: pass --pm or set ACTA_PM_EMAIL");
            };
            print_result(acta.api().bulk_generate_summaries(&pm).await)
        }
        Some(("logout", _)) => {
            acta.sign_out();
            println!("Signed out");
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

async fn projects(acta: &Acta, pm: Option<&String>) -> anyhow::Result<ExitCode> {
    if let Some(pm) = pm {
        return match acta.api().pm_projects(pm).await {
            Ok(response) => {
                println!(
                    "{} projects for {} ({} with acta, {} without)",
                    response.total_projects,
                    response.pm_email,
                    response.summary.with_acta,
                    response.summary.without_acta
                );
                for project in &response.projects {
                    println!("  {:<20} {}", project.project_id, project.project_name);
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(outcome) => Ok(failure(&outcome)),
        };
    }

    match acta.api().projects().await {
        Ok(projects) => {
            for project in &projects {
                println!(
                    "  {:<20} {:<40} {}",
                    project.project_id,
                    project.project_name,
                    project.manager().unwrap_or("-")
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(outcome) => Ok(failure(&outcome)),
    }
}

async fn generate(acta: &Acta, project: &str, format: DocumentFormat) -> anyhow::Result<ExitCode> {
    let mut state = WorkflowState::new(project)?;
    let step = acta.orchestrator().run(&mut state, format).await?;

    match step {
        StepResult::Advanced(Stage::Done) => {
            if let Some(download) = state.download() {
                println!("{}", download.url);
            }
            Ok(ExitCode::SUCCESS)
        }
        StepResult::NotReady => {
            println!("Generation requested for {project}; the {format} is not ready yet, try again shortly");
            Ok(ExitCode::SUCCESS)
        }
        StepResult::Failed(outcome) => Ok(failure(&outcome)),
        StepResult::Advanced(stage) => {
            anyhow::bail!("run stopped unexpectedly at {stage}")
        }
    }
}

/// `--pm`, else the configured e-mail, else the signed-in identity
async fn pm_email(acta: &Acta, explicit: Option<&String>) -> Option<String> {
    match explicit {
        Some(email) => Some(email.clone()),
        None => acta.pm_email().await,
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing <{name}>"))
}

fn print_result<T: Serialize>(result: Result<T, ApiOutcome>) -> anyhow::Result<ExitCode> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(outcome) => Ok(failure(&outcome)),
    }
}

fn failure(outcome: &ApiOutcome) -> ExitCode {
    tracing::debug!(%outcome, "command failed");
    eprintln!("error: {}", outcome.message());
    if let Some(hint) = hint(outcome.user_action()) {
        eprintln!("hint: {hint}");
    }
    ExitCode::FAILURE
}

fn hint(action: UserAction) -> Option<&'static str> {
    match action {
        UserAction::None => None,
        UserAction::Reauthenticate => Some("sign in again (refresh ACTA_TOKEN or the identity settings)"),
        UserAction::Retry => Some("check your connection and run the command again"),
        UserAction::ContactSupport => Some("contact support if the problem persists"),
    }
}
