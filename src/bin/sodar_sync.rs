use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sodar_sync::api::SodarClient;
use sodar_sync::config::{CommonConfig, ConfigLoader, ConfigOverrides};
use sodar_sync::domain::{AssayUuid, ProjectUuid, format_size};
use sodar_sync::error::SodarError;
use sodar_sync::isatab::TsvReader;
use sodar_sync::output::{JsonOutput, OutputMode, SheetSummary, TextOutput};
use sodar_sync::overwrite::{Destination, TerminalConsole, WriteOptions, overwrite_helper};
use sodar_sync::sheets;
use sodar_sync::tools;

#[derive(Parser)]
#[command(name = "sodar-sync")]
#[command(about = "Sync ISA-tab sample sheets and manage landing zones on a SODAR server")]
#[command(version, author)]
struct Cli {
    #[arg(long, short, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "SODAR_SERVER_URL")]
    sodar_server_url: Option<String>,

    #[arg(long, global = true, env = "SODAR_API_TOKEN", hide_env_values = true)]
    sodar_api_token: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Inspect a project's investigation")]
    Investigation {
        #[command(subcommand)]
        command: InvestigationCommand,
    },
    #[command(about = "Fetch and export sample sheets")]
    Sheets {
        #[command(subcommand)]
        command: SheetsCommand,
    },
    #[command(about = "List and create landing zones")]
    LandingZone {
        #[command(subcommand)]
        command: LandingZoneCommand,
    },
    #[command(about = "Check for external tools")]
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },
}

#[derive(Subcommand)]
enum InvestigationCommand {
    #[command(about = "Show investigation, studies and assays")]
    Show(ProjectArgs),
}

#[derive(Subcommand)]
enum SheetsCommand {
    #[command(about = "Summarize the parsed sample sheet")]
    Show(ProjectArgs),
    #[command(about = "Write the sample sheet files to a directory")]
    Pull(PullArgs),
}

#[derive(Subcommand)]
enum LandingZoneCommand {
    #[command(about = "List landing zones of a project")]
    List(ProjectArgs),
    #[command(about = "Create a landing zone")]
    Create(CreateArgs),
}

#[derive(Subcommand)]
enum ToolsCommand {
    #[command(about = "Look for the iRODS icommands on PATH")]
    Check {
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
struct ProjectArgs {
    project: ProjectUuid,
}

#[derive(Args)]
struct CreateArgs {
    project: ProjectUuid,

    /// Assay to create the zone for; required unless the project has a single assay.
    #[arg(long)]
    assay: Option<AssayUuid>,
}

#[derive(Args)]
struct PullArgs {
    project: ProjectUuid,

    /// Output directory, or `-` to print the investigation file.
    output: String,

    #[arg(long)]
    show_diff: bool,

    #[arg(long, requires = "show_diff")]
    side_by_side: bool,

    #[arg(long)]
    dry_run: bool,

    #[arg(long, short)]
    yes: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SodarError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SodarError) -> u8 {
    match error {
        SodarError::MissingParameter(_)
        | SodarError::MissingConfig(_)
        | SodarError::ConfigRead(_)
        | SodarError::ConfigParse(_)
        | SodarError::InvalidUuid(_) => 2,
        error if error.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    if let Commands::Tools { command } = &cli.command {
        return run_tools(command, output_mode);
    }

    let config = ConfigLoader::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            verbose: cli.verbose,
            sodar_server_url: cli.sodar_server_url,
            sodar_api_token: cli.sodar_api_token,
        },
    )?;
    tracing::debug!("configuration: {config:?}");

    match cli.command {
        Commands::Investigation { command } => run_investigation(command, &config, output_mode),
        Commands::Sheets { command } => run_sheets(command, &config, output_mode),
        Commands::LandingZone { command } => run_landing_zone(command, &config, output_mode),
        Commands::Tools { command } => run_tools(&command, output_mode),
    }
}

fn run_investigation(
    command: InvestigationCommand,
    config: &CommonConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        InvestigationCommand::Show(args) => {
            let client = SodarClient::from_config(config, Some(args.project))?;
            let investigation = client.investigation(None)?;
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_investigation(&investigation),
                OutputMode::Human => TextOutput::print_investigation(&investigation),
            };
            printed.into_diagnostic()
        }
    }
}

fn run_sheets(
    command: SheetsCommand,
    config: &CommonConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        SheetsCommand::Show(args) => {
            let client = SodarClient::from_config(config, Some(args.project))?;
            let data = client.sheet(None, &TsvReader)?;
            let summary = SheetSummary::from(&data);
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_sheet(&summary),
                OutputMode::Human => TextOutput::print_sheet(&summary),
            };
            printed.into_diagnostic()
        }
        SheetsCommand::Pull(args) => run_pull(args, config),
    }
}

fn run_pull(args: PullArgs, config: &CommonConfig) -> miette::Result<()> {
    let client = SodarClient::from_config(config, Some(args.project))?;
    let raw = client.sheet_raw(None)?;
    // Fail on malformed sheets before touching any file.
    sheets::assemble(&raw, &TsvReader)?;

    let options = WriteOptions {
        do_write: !args.dry_run,
        show_diff: args.show_diff,
        side_by_side: args.side_by_side,
        assume_yes: args.yes,
    };
    let mut console = TerminalConsole::new();

    if let Destination::Stdout = Destination::parse(&args.output) {
        overwrite_helper(
            &Destination::Stdout,
            &raw.investigation.tsv,
            options,
            &mut console,
        )?;
        return Ok(());
    }

    let output_dir = Utf8PathBuf::from(&args.output);
    for (relative, contents) in sheets::export_files(&raw)? {
        let destination = Destination::File(output_dir.join(relative));
        let report = overwrite_helper(&destination, contents, options, &mut console)?;
        info!(
            "{destination}: {:?} ({})",
            report.outcome,
            format_size(report.bytes)
        );
    }
    Ok(())
}

fn run_landing_zone(
    command: LandingZoneCommand,
    config: &CommonConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        LandingZoneCommand::List(args) => {
            let client = SodarClient::from_config(config, Some(args.project))?;
            let zones = client.landing_zones(None)?;
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_landing_zones(&zones),
                OutputMode::Human => TextOutput::print_landing_zones(&zones),
            };
            printed.into_diagnostic()
        }
        LandingZoneCommand::Create(args) => {
            let client = SodarClient::from_config(config, Some(args.project))?;
            let zone = client.create_landing_zone(None, args.assay.as_ref())?;
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_landing_zone(&zone),
                OutputMode::Human => TextOutput::print_landing_zone(&zone),
            };
            printed.into_diagnostic()
        }
    }
}

fn run_tools(command: &ToolsCommand, output_mode: OutputMode) -> miette::Result<()> {
    match command {
        ToolsCommand::Check { strict } => {
            let report = tools::check_irods_icommands(*strict)?;
            let printed = match output_mode {
                OutputMode::Json => JsonOutput::print_tools(&report),
                OutputMode::Human => TextOutput::print_tools(&report),
            };
            printed.into_diagnostic()
        }
    }
}
