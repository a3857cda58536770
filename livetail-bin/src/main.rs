use chrono::{DateTime, Utc};
use crossterm::event;
use livetail_core::{ChannelTarget, LogChannel, StreamFilters};
use livetail_tui::{AppDesc, start_with_target};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        style::{Color, ResetColor, SetBackgroundColor},
        terminal::{
            Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
            enable_raw_mode,
        },
    },
};
use simplelog::{Config, LevelFilter, WriteLogger};
use std::env;
use std::fs::File;
use std::io;
use std::panic;
use std::time::Duration;

fn print_usage() {
    eprintln!("Usage: livetail [OPTIONS] <BASE_URL>");
    eprintln!();
    eprintln!("Streams container or deployment-job logs from a deployment platform.");
    eprintln!();
    eprintln!("Target selection:");
    eprintln!("  --project <id>          Project to stream from (required)");
    eprintln!("  --environment <id>      Environment, for container logs");
    eprintln!("  --container <name>      Container name; streams container logs");
    eprintln!("  --deployment <id>       Deployment id, for job logs");
    eprintln!("  --job <name>            Job name; streams deployment job logs");
    eprintln!();
    eprintln!("Stream options:");
    eprintln!("  --since <time>          Only records at or after this time (RFC 3339 or unix seconds)");
    eprintln!("  --until <time>          Only records up to this time");
    eprintln!("  --tail <n>              Ask the server for the last n records only");
    eprintln!("  --timestamps            Ask the server to prefix records with timestamps");
    eprintln!();
    eprintln!("Viewer options:");
    eprintln!("  --search <term>         Start with a search term applied");
    eprintln!("  --max-records <n>       Cap the in-memory buffer (0 = unbounded, default)");
    eprintln!("  --debug                 Show the in-app debug pane");
    eprintln!("  --log-file <path>       Write debug logs to a file (disables the debug pane)");
    eprintln!("  --help, -h              Print this help message");
}

fn invalid_input(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

#[derive(Default)]
struct CliOptions {
    base_url: Option<String>,
    project: Option<String>,
    environment: Option<String>,
    container: Option<String>,
    deployment: Option<String>,
    job: Option<String>,
    since: Option<String>,
    until: Option<String>,
    tail: Option<u64>,
    timestamps: bool,
    search: Option<String>,
    max_records: usize,
    debug: bool,
    log_file: Option<String>,
    help: bool,
}

impl CliOptions {
    fn from_args(args: &[String]) -> Result<Self, io::Error> {
        let mut options = Self::default();
        let mut i = 0;

        while i < args.len() {
            match args[i].as_str() {
                "--help" | "-h" => options.help = true,
                "--timestamps" => options.timestamps = true,
                "--debug" => options.debug = true,
                "--project" => options.project = Some(next_value(args, &mut i, "--project")?),
                "--environment" => {
                    options.environment = Some(next_value(args, &mut i, "--environment")?)
                }
                "--container" => options.container = Some(next_value(args, &mut i, "--container")?),
                "--deployment" => {
                    options.deployment = Some(next_value(args, &mut i, "--deployment")?)
                }
                "--job" => options.job = Some(next_value(args, &mut i, "--job")?),
                "--since" => options.since = Some(next_value(args, &mut i, "--since")?),
                "--until" => options.until = Some(next_value(args, &mut i, "--until")?),
                "--tail" => {
                    options.tail = Some(parse_count(&next_value(args, &mut i, "--tail")?, "--tail")?)
                }
                "--max-records" => {
                    options.max_records =
                        parse_count(&next_value(args, &mut i, "--max-records")?, "--max-records")?
                            as usize
                }
                "--search" => options.search = Some(next_value(args, &mut i, "--search")?),
                "--log-file" => options.log_file = Some(next_value(args, &mut i, "--log-file")?),
                flag if flag.starts_with('-') => {
                    print_usage();
                    return Err(invalid_input(format!("Unknown option: {}", flag)));
                }
                value => {
                    if options.base_url.is_some() {
                        print_usage();
                        return Err(invalid_input(format!("Unexpected argument: {}", value)));
                    }
                    options.base_url = Some(value.to_string());
                }
            }
            i += 1;
        }

        Ok(options)
    }
}

fn next_value(args: &[String], i: &mut usize, flag: &str) -> Result<String, io::Error> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| invalid_input(format!("{} requires a value", flag)))
}

fn parse_count(value: &str, flag: &str) -> Result<u64, io::Error> {
    value
        .parse::<u64>()
        .map_err(|_| invalid_input(format!("{} expects a number, got: {}", flag, value)))
}

fn parse_time(value: &str, flag: &str) -> Result<DateTime<Utc>, io::Error> {
    if let Ok(seconds) = value.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| invalid_input(format!("{} is out of range: {}", flag, value)));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            invalid_input(format!(
                "{} expects an RFC 3339 time or unix seconds, got: {}",
                flag, value
            ))
        })
}

fn build_channel(options: &CliOptions) -> Result<LogChannel, io::Error> {
    let project = options
        .project
        .clone()
        .ok_or_else(|| invalid_input("--project is required".to_string()))?;

    match (&options.container, &options.job) {
        (Some(_), Some(_)) => Err(invalid_input(
            "--container and --job are mutually exclusive".to_string(),
        )),
        (Some(container), None) => {
            let environment = options
                .environment
                .clone()
                .ok_or_else(|| invalid_input("--container requires --environment".to_string()))?;
            Ok(LogChannel::Container {
                project,
                environment,
                container: container.clone(),
            })
        }
        (None, Some(job)) => {
            let deployment = options
                .deployment
                .clone()
                .ok_or_else(|| invalid_input("--job requires --deployment".to_string()))?;
            Ok(LogChannel::DeploymentJob {
                project,
                deployment,
                job: job.clone(),
            })
        }
        (None, None) => Err(invalid_input(
            "choose a target: --container <name> or --job <name>".to_string(),
        )),
    }
}

fn build_filters(options: &CliOptions) -> Result<StreamFilters, io::Error> {
    let start_time = options
        .since
        .as_deref()
        .map(|value| parse_time(value, "--since"))
        .transpose()?;
    let end_time = options
        .until
        .as_deref()
        .map(|value| parse_time(value, "--until"))
        .transpose()?;

    Ok(StreamFilters {
        start_time,
        end_time,
        tail_count: options.tail,
        timestamps: options.timestamps,
    })
}

fn main() -> io::Result<()> {
    // collect args excluding the binary name
    let args: Vec<String> = env::args().skip(1).collect();
    let options = CliOptions::from_args(&args)?;

    if options.help {
        print_usage();
        return Ok(());
    }

    let Some(base_url) = options.base_url.clone() else {
        print_usage();
        return Err(invalid_input("missing <BASE_URL>".to_string()));
    };

    let channel = build_channel(&options)?;
    let filters = build_filters(&options)?;

    // validate the target before touching the terminal
    let target = match ChannelTarget::new(&base_url, channel, filters) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // a file logger claims the global logger slot before the in-app one can
    if let Some(path) = &options.log_file {
        let file = File::create(path)?;
        if let Err(e) = WriteLogger::init(LevelFilter::Debug, Config::default(), file) {
            eprintln!("Error: could not install file logger: {}", e);
            std::process::exit(1);
        }
    }

    let mut desc = AppDesc::new();
    desc.show_debug_logs = options.debug;
    desc.initial_search = options.search.clone();
    desc.max_records = options.max_records;

    let mut terminal = setup_terminal()?;

    // ensure we restore the terminal on panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let app_result = start_with_target(&mut terminal, target, desc);

    // always restore terminal before printing or exiting
    restore_terminal()?;

    if let Err(err) = app_result {
        eprintln!("Application Error: {:?}", err);
    }

    Ok(())
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    // enter the alternate screen to not mess with the user's shell history
    // enable mouse capture to receive mouse events
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    // force reset background color and clear the screen
    execute!(
        stdout,
        SetBackgroundColor(Color::Reset),
        Clear(ClearType::All)
    )?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();

    // reset colors before leaving
    let _ = execute!(stdout, ResetColor);
    // best-effort cleanup; ignore errors during teardown where sensible
    let _ = execute!(stdout, DisableMouseCapture);
    let _ = execute!(stdout, LeaveAlternateScreen);

    // drain pending events so they don't leak to the shell
    while event::poll(Duration::from_millis(0)).unwrap_or(false) {
        let _ = event::read();
    }

    let _ = disable_raw_mode();

    Ok(())
}
