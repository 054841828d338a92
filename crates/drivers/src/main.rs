mod config;
mod logging;
mod overlay;
mod recorder;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use config::AppConfig;
use overlay::MinifbOverlay;
use stepshot_adapters::{
    find_report_font, present_capture_export, present_report_summary, present_session_detail,
    present_session_row, present_skipped, present_stop_report, DocxReportExporter,
    HtmlReportExporter, JsonSessionStore, MarkdownReportExporter, PdfReportExporter,
    RasterCompositor, SystemClock,
};
use stepshot_application::{
    ApplicationError, ApplicationService, DeleteSessionCommand, DescribeSessionCommand,
    EditCaptureCommand, ExportCapturesCommand, ExportReportCommand, ListSessionsCommand,
    OpenSessionCommand, ReannotateCaptureCommand, RemoveCaptureCommand, RenameSessionCommand,
    StartCaptureCommand,
};
use stepshot_domain::{CaptureId, HotkeyCombo, SessionId};

#[derive(Parser, Debug)]
#[command(
    name = "stepshot",
    version,
    about = "Record annotated screenshots of a task, step by step"
)]
struct Cli {
    /// Directory holding session records (overrides the config file)
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Arm a new session and capture on every hotkey press
    Record(RecordArgs),
    /// List recorded sessions
    List,
    /// Show one session and its captures
    Show { session: String },
    /// Rename a session
    Rename { session: String, name: String },
    /// Replace a session's description
    Describe { session: String, description: String },
    /// Delete a session record and its images
    Delete { session: String },
    /// Replace one capture's description
    Caption {
        session: String,
        capture: u32,
        description: String,
    },
    /// Remove one capture; later captures are renumbered
    #[command(name = "remove-capture")]
    RemoveCapture { session: String, capture: u32 },
    /// Reopen the annotation overlay on a stored capture
    Annotate { session: String, capture: u32 },
    /// Write a report; the extension picks Markdown (.md), HTML (.html), PDF (.pdf) or Word (.docx)
    Export(ExportArgs),
    /// Copy capture images into a directory
    #[command(name = "export-captures")]
    ExportCaptures(ExportCapturesArgs),
    /// Show or set the capture hotkey, e.g. `ctrl+alt+o`
    Hotkey { combo: Option<String> },
}

#[derive(Args, Debug)]
struct RecordArgs {
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Hotkey for this session only
    #[arg(long)]
    hotkey: Option<String>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    session: String,
    destination: PathBuf,
    /// Copy images next to the report and link them relatively
    #[arg(long, action = ArgAction::SetTrue)]
    relative_images: bool,
}

#[derive(Args, Debug)]
struct ExportCapturesArgs {
    session: String,
    destination: PathBuf,
    /// Capture number to export; repeat for several. Defaults to all.
    #[arg(long = "capture")]
    captures: Vec<u32>,
}

#[derive(Debug, Clone)]
enum CommandError {
    Usage(String),
    Runtime(String),
}

impl From<ApplicationError> for CommandError {
    fn from(error: ApplicationError) -> Self {
        if error.is_usage() {
            Self::Usage(error.to_string())
        } else {
            Self::Runtime(recorder::describe_failure(&error))
        }
    }
}

fn main() -> ExitCode {
    logging::init_logging();
    let cli = Cli::parse();
    let config_path = config::config_path();
    let mut config = config::load_config(&config_path);
    if let Some(dir) = cli.sessions_dir.clone() {
        config.sessions_dir = dir;
    }

    let service = build_application_service(&config);
    match run_command(cli.command, &service, &config, &config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Usage(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(2)
        }
        Err(CommandError::Runtime(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(1)
        }
    }
}

fn build_application_service(config: &AppConfig) -> ApplicationService {
    ApplicationService::new(
        Box::new(JsonSessionStore::new(config.sessions_dir.clone())),
        Box::new(RasterCompositor),
        Box::new(SystemClock),
        vec![
            Box::new(MarkdownReportExporter),
            Box::new(HtmlReportExporter),
            Box::new(PdfReportExporter::new(
                config.report_font.clone().or_else(find_report_font),
            )),
            Box::new(DocxReportExporter),
        ],
    )
}

fn run_command(
    command: Command,
    service: &ApplicationService,
    config: &AppConfig,
    config_path: &std::path::Path,
) -> Result<(), CommandError> {
    match command {
        Command::Record(args) => {
            let hotkey = match args.hotkey {
                Some(text) => parse_hotkey(&text)?,
                None => config.hotkey.clone(),
            };
            let report = recorder::record(
                service,
                config,
                StartCaptureCommand {
                    name: args.name,
                    description: args.description,
                    hotkey,
                },
            )?;
            println!("{}", present_stop_report(&report));
            Ok(())
        }
        Command::List => {
            let catalog = service.list_sessions(ListSessionsCommand)?;
            for skipped in &catalog.skipped {
                eprintln!("{}", present_skipped(skipped));
            }
            if catalog.sessions.is_empty() {
                println!("no sessions recorded");
                return Ok(());
            }
            for session in &catalog.sessions {
                println!("{}", present_session_row(session));
            }
            Ok(())
        }
        Command::Show { session } => {
            let session = service.open_session(OpenSessionCommand {
                session_id: parse_session_id(&session)?,
            })?;
            println!("{}", present_session_detail(&session));
            Ok(())
        }
        Command::Rename { session, name } => {
            let session = service.rename_session(RenameSessionCommand {
                session_id: parse_session_id(&session)?,
                name,
            })?;
            println!("renamed session {} to \"{}\"", session.id(), session.name());
            Ok(())
        }
        Command::Describe {
            session,
            description,
        } => {
            let session = service.describe_session(DescribeSessionCommand {
                session_id: parse_session_id(&session)?,
                description,
            })?;
            println!("updated description of session {}", session.id());
            Ok(())
        }
        Command::Delete { session } => {
            let session_id = parse_session_id(&session)?;
            service.delete_session(DeleteSessionCommand {
                session_id: session_id.clone(),
            })?;
            println!("deleted session {session_id}");
            Ok(())
        }
        Command::Caption {
            session,
            capture,
            description,
        } => {
            let capture_id = parse_capture_id(capture)?;
            service.edit_capture(EditCaptureCommand {
                session_id: parse_session_id(&session)?,
                capture_id,
                description,
            })?;
            println!("updated capture {capture_id}");
            Ok(())
        }
        Command::RemoveCapture { session, capture } => {
            let capture_id = parse_capture_id(capture)?;
            let session = service.remove_capture(RemoveCaptureCommand {
                session_id: parse_session_id(&session)?,
                capture_id,
            })?;
            println!(
                "removed capture {capture_id}; {} captures remain",
                session.captures().len()
            );
            Ok(())
        }
        Command::Annotate { session, capture } => {
            let capture_id = parse_capture_id(capture)?;
            let mut overlay = MinifbOverlay::new(config.overlay_width, config.overlay_height);
            let updated = service.reannotate_capture(
                ReannotateCaptureCommand {
                    session_id: parse_session_id(&session)?,
                    capture_id,
                },
                &mut overlay,
            )?;
            match updated {
                Some(_) => println!("capture {capture_id} updated"),
                None => println!("annotation cancelled; capture {capture_id} unchanged"),
            }
            Ok(())
        }
        Command::Export(args) => {
            let summary = service.export_report(ExportReportCommand {
                session_id: parse_session_id(&args.session)?,
                destination: args.destination,
                relative_images: args.relative_images,
            })?;
            println!("{}", present_report_summary(&summary));
            Ok(())
        }
        Command::ExportCaptures(args) => {
            let capture_ids = args
                .captures
                .into_iter()
                .map(parse_capture_id)
                .collect::<Result<Vec<_>, _>>()?;
            let report = service.export_captures(ExportCapturesCommand {
                session_id: parse_session_id(&args.session)?,
                capture_ids,
                destination_dir: args.destination,
            })?;
            println!("{}", present_capture_export(&report));
            if report.failures.is_empty() {
                Ok(())
            } else {
                Err(CommandError::Runtime(format!(
                    "{} captures could not be exported",
                    report.failures.len()
                )))
            }
        }
        Command::Hotkey { combo: None } => {
            println!("{}", config.hotkey);
            Ok(())
        }
        Command::Hotkey { combo: Some(text) } => {
            let hotkey = parse_hotkey(&text)?;
            let updated = AppConfig {
                hotkey: hotkey.clone(),
                ..config.clone()
            };
            config::save_config(config_path, &updated).map_err(CommandError::Runtime)?;
            println!("hotkey set to {hotkey}");
            Ok(())
        }
    }
}

fn parse_session_id(value: &str) -> Result<SessionId, CommandError> {
    SessionId::new(value.trim())
        .map_err(|error| CommandError::Usage(format!("invalid session id: {error}")))
}

fn parse_capture_id(value: u32) -> Result<CaptureId, CommandError> {
    CaptureId::new(value)
        .map_err(|error| CommandError::Usage(format!("invalid capture number: {error}")))
}

fn parse_hotkey(value: &str) -> Result<HotkeyCombo, CommandError> {
    value
        .parse()
        .map_err(|error| CommandError::Usage(format!("invalid hotkey: {error}")))
}
