mod client;
mod config;
mod error;
mod registry;
mod station;
mod table;
mod tasks;
mod units;

use crate::client::{ApiClient, HttpTransport, Transport};
use crate::config::{EffectiveConfig, Overrides, resolve};
use crate::error::StationError;
use crate::station::{CreateTask, DownloadStation};
use crate::table::Table;
use crate::tasks::Enrichment;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dialoguer::{Input, Password};
use serde_json::Value;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Set once a session is open; an interrupt then waits for logout.
static IN_SESSION: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(
    name = "dsctl",
    version,
    about = "CLI for the Download Station on a Synology DiskStation"
)]
struct Cli {
    #[arg(
        value_name = "ADDRESS",
        help = "Server address with IP/domain name and port (e.g. myds.com:5000)"
    )]
    address: Option<String>,

    #[arg(long, short = 'u', value_name = "USERNAME", help = "User to log in as")]
    username: Option<String>,

    #[arg(long, short = 'v', help = "Verbose error reporting and request logging")]
    verbose: bool,

    #[arg(
        long,
        short = 'H',
        help = "Print sizes like 1.0 KB, 234.5 MB, 2.0 GB and durations like 5 hours 54 minutes 1 second"
    )]
    human_readable: bool,

    #[arg(
        long,
        short = 'o',
        value_enum,
        default_value_t = OutputFormat::Pretty,
        help = "Output format"
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Returns Download Station info
    Info,
    /// Returns Download Station config
    GetConfig,
    /// Provides task listing and detailed task information
    GetTasks(GetTasksArgs),
    /// Creates a task
    CreateTask(CreateTaskArgs),
}

#[derive(Args)]
struct GetTasksArgs {
    #[arg(
        long,
        short = 'i',
        value_name = "ID",
        conflicts_with_all = ["offset", "limit"],
        help = "Task IDs, separated by \",\". Cannot be used with --offset or --limit"
    )]
    id: Option<String>,

    #[arg(long, short = 'd', help = "Include task detail columns")]
    detail: bool,

    #[arg(long, short = 't', help = "Include transfer columns")]
    transfer: bool,

    #[arg(
        long,
        short = 'o',
        value_name = "OFFSET",
        help = "Beginning task on the request record (defaults to 0)"
    )]
    offset: Option<u64>,

    #[arg(
        long,
        short = 'l',
        value_name = "LIMIT",
        help = "Number of records requested (defaults to all tasks)"
    )]
    limit: Option<u64>,

    #[arg(
        long,
        short = 'f',
        num_args = 2,
        value_names = ["FIELD", "VALUE"],
        help = "Show rows where VALUE is found in FIELD (applied after --offset and --limit)"
    )]
    filter: Option<Vec<String>>,

    #[arg(
        long,
        short = 's',
        num_args = 2,
        value_names = ["FIELD", "ORDER"],
        help = "Order rows by FIELD, ORDER is asc or desc"
    )]
    sort: Option<Vec<String>>,
}

#[derive(Args)]
struct CreateTaskArgs {
    #[arg(
        long,
        short = 'U',
        value_name = "URI",
        help = "HTTP/FTP/magnet/ED2K links or a file path starting with a shared folder, separated by \",\""
    )]
    uri: String,

    #[arg(
        long = "username",
        short = 'u',
        id = "source_username",
        value_name = "USERNAME",
        help = "Login username for the download source"
    )]
    username: Option<String>,

    #[arg(
        long = "password",
        short = 'p',
        id = "source_password",
        value_name = "PASSWORD",
        help = "Login password for the download source"
    )]
    password: Option<String>,

    #[arg(
        long,
        short = 'z',
        value_name = "UNZIP_PASSWORD",
        help = "Password for unzipping download tasks"
    )]
    unzip_password: Option<String>,

    #[arg(
        long,
        short = 'd',
        value_name = "DESTINATION",
        help = "Download destination path starting with a shared folder"
    )]
    destination: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Default)]
struct RenderOpts {
    filter: Option<(String, String)>,
    sort: Option<(String, String)>,
}

impl RenderOpts {
    fn from_args(args: &GetTasksArgs) -> Self {
        Self {
            filter: args.filter.as_deref().and_then(pair),
            sort: args.sort.as_deref().and_then(pair),
        }
    }
}

fn pair(values: &[String]) -> Option<(String, String)> {
    match values {
        [field, value] => Some((field.clone(), value.clone())),
        _ => None,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_interrupt(&err) => ExitCode::SUCCESS,
        Err(err) => {
            if verbose {
                eprintln!("{err:#}");
            } else {
                eprintln!("{err}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Outside a session an interrupt ends the run at once.
    ctrlc::set_handler(|| {
        if IN_SESSION.load(Ordering::SeqCst) {
            INTERRUPTED.store(true, Ordering::SeqCst);
        } else {
            eprintln!();
            std::process::exit(0);
        }
    })
    .context("installing interrupt handler")?;

    let cwd = std::env::current_dir().context("reading current directory")?;
    let effective = resolve(
        &cwd,
        Overrides {
            address: cli.address.clone(),
            username: cli.username.clone(),
            human_readable: cli.human_readable,
        },
    )?;

    let transport = HttpTransport::new(effective.timeout).context("building HTTP client")?;
    let client = ApiClient::new(&effective.address, transport);
    let mut station = DownloadStation::connect(&client)?;

    let username = match &effective.username {
        Some(username) => username.clone(),
        None => prompt_username()?,
    };
    let password = prompt_password()?;

    station.login(&username, &password)?;
    IN_SESSION.store(true, Ordering::SeqCst);

    let outcome = handle_command(&station, &cli.command, &effective);

    if let Err(err) = station.logout() {
        tracing::warn!("logout failed: {err}");
    }
    IN_SESSION.store(false, Ordering::SeqCst);

    if INTERRUPTED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let output = outcome?;
    print_output(output, cli.output)
}

/// What a command produced, printed only after the session is closed.
enum CommandOutput {
    Sheet(Value),
    Tasks { tasks: Vec<Value>, render: RenderOpts },
    Message(String),
}

fn handle_command<T: Transport>(
    station: &DownloadStation<'_, T>,
    command: &Commands,
    effective: &EffectiveConfig,
) -> Result<CommandOutput> {
    match command {
        Commands::Info => Ok(CommandOutput::Sheet(station.info()?)),
        Commands::GetConfig => Ok(CommandOutput::Sheet(station.config()?)),
        Commands::GetTasks(args) => {
            let enrichment = Enrichment {
                detail: args.detail,
                transfer: args.transfer,
                human_readable: effective.human_readable,
            };
            let additional = enrichment.additional();
            let data = match &args.id {
                Some(ids) => station.task_info(ids, additional.as_deref())?,
                None => station.list_tasks(args.offset, args.limit, additional.as_deref())?,
            };

            let mut tasks = take_tasks(data)?;
            enrichment.apply_all(&mut tasks);
            Ok(CommandOutput::Tasks {
                tasks,
                render: RenderOpts::from_args(args),
            })
        }
        Commands::CreateTask(args) => {
            let request = CreateTask {
                uri: args.uri.clone(),
                username: args.username.clone(),
                password: args.password.clone(),
                unzip_password: args.unzip_password.clone(),
                destination: args.destination.clone(),
            };
            station.create_task(&request)?;
            Ok(CommandOutput::Message("Task created".to_string()))
        }
    }
}

fn take_tasks(mut data: Value) -> Result<Vec<Value>, StationError> {
    match data.get_mut("tasks").map(Value::take) {
        Some(Value::Array(tasks)) => Ok(tasks),
        Some(task @ Value::Object(_)) => Ok(vec![task]),
        _ => Err(StationError::MissingField {
            api: registry::display_name(registry::STATION_TASK),
            field: "tasks",
        }),
    }
}

fn print_output(output: CommandOutput, format: OutputFormat) -> Result<()> {
    match output {
        CommandOutput::Message(message) => println!("{message}"),
        CommandOutput::Sheet(data) => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
            OutputFormat::Pretty => print!("{}", Table::from_value(&data)),
        },
        CommandOutput::Tasks { tasks, render } => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
            OutputFormat::Pretty => print_tasks(&tasks, &render),
        },
    }
    Ok(())
}

fn print_tasks(tasks: &[Value], render: &RenderOpts) {
    let mut table = Table::from_value(&Value::Array(tasks.to_vec()));
    if let Some((field, value)) = &render.filter {
        table.filter(field, value);
    }
    if let Some((field, order)) = &render.sort {
        table.sort(field, order);
    }

    for notice in table.notices() {
        eprintln!("{notice}");
    }
    if table.is_empty() {
        println!("No tasks found.");
    } else {
        print!("{table}");
    }
}

fn prompt_username() -> Result<String> {
    if io::stdin().is_terminal() {
        let username: String = Input::new().with_prompt("Username").interact_text()?;
        Ok(username)
    } else {
        read_stdin_line("username")
    }
}

fn prompt_password() -> Result<String> {
    if io::stdin().is_terminal() {
        let password = Password::new().with_prompt("Password").interact()?;
        Ok(password)
    } else {
        read_stdin_line("password")
    }
}

fn read_stdin_line(what: &str) -> Result<String> {
    let mut line = String::new();
    let read = io::stdin()
        .read_line(&mut line)
        .with_context(|| format!("reading {what} from stdin"))?;
    if read == 0 {
        bail!("stdin closed before a {what} was given");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::Interrupted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn id_conflicts_with_paging() {
        let parsed = Cli::try_parse_from(["dsctl", "nas:5000", "get-tasks", "--id", "a", "--limit", "2"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parses_filter_and_sort_pairs() {
        let cli = Cli::try_parse_from([
            "dsctl", "nas:5000", "-H", "get-tasks", "-f", "status", "down", "-s", "size", "desc",
        ])
        .unwrap();
        assert_eq!(cli.address.as_deref(), Some("nas:5000"));
        assert!(cli.human_readable);
        let Commands::GetTasks(args) = &cli.command else {
            panic!("expected get-tasks");
        };
        let render = RenderOpts::from_args(args);
        assert_eq!(render.filter, Some(("status".into(), "down".into())));
        assert_eq!(render.sort, Some(("size".into(), "desc".into())));
    }

    #[test]
    fn create_task_requires_uri() {
        assert!(Cli::try_parse_from(["dsctl", "nas:5000", "create-task"]).is_err());
        let cli = Cli::try_parse_from([
            "dsctl", "nas:5000", "-u", "admin", "create-task", "-U", "magnet:?xt=1", "-u", "ftpuser",
        ])
        .unwrap();
        assert_eq!(cli.username.as_deref(), Some("admin"));
        let Commands::CreateTask(args) = &cli.command else {
            panic!("expected create-task");
        };
        assert_eq!(args.username.as_deref(), Some("ftpuser"));
    }

    #[test]
    fn takes_task_list_or_single_task() {
        let tasks = take_tasks(json!({"tasks": [{"id": "a"}, {"id": "b"}]})).unwrap();
        assert_eq!(tasks.len(), 2);
        let tasks = take_tasks(json!({"tasks": {"id": "a"}})).unwrap();
        assert_eq!(tasks, vec![json!({"id": "a"})]);
        assert!(take_tasks(json!({"total": 0})).is_err());
    }

    #[test]
    fn detects_interrupted_prompts() {
        let err = anyhow::Error::from(io::Error::from(io::ErrorKind::Interrupted));
        assert!(is_interrupt(&err));
        let err = anyhow::Error::from(dialoguer::Error::from(io::Error::from(
            io::ErrorKind::Interrupted,
        )));
        assert!(is_interrupt(&err));
        assert!(!is_interrupt(&anyhow::anyhow!("boom")));
    }
}
