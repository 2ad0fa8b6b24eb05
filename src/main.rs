//! Jenkins Lane CLI
//!
//! Entry point for the `jenkins-lane` command-line tool.

use clap::{Parser, Subcommand};
use jenkins_lane::config::LaneConfig;
use jenkins_lane::host::{HttpConfig, HttpTransport, CONSOLE_FETCH_ERROR, CONSOLE_FETCH_FAILED};
use jenkins_lane::runner::{Browser, RunRequest, TestRunner};
use jenkins_lane::signal::SignalHandler;
use jenkins_lane::wait::CompletionWaiter;
use jenkins_lane::{
    BuildParameters, BuildSelector, Console, JobReference, OrchestrationClient, OrchestrationResult,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(name = "jenkins-lane")]
#[command(about = "Trigger, poll and classify Jenkins builds", version)]
struct Cli {
    /// Path to config file (default: ~/.config/jenkins-lane/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Jenkins server URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Jenkins user name
    #[arg(long, short = 'u', global = true)]
    username: Option<String>,

    /// Jenkins API token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all jobs
    Jobs {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show job information
    Info {
        job: JobReference,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the status of a build
    Status {
        job: JobReference,

        /// Build number or "last"
        #[arg(long, short = 'b', default_value = "last")]
        build: BuildSelector,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the console log of a build
    Console {
        job: JobReference,

        /// Build number or "last"
        #[arg(long, short = 'b', default_value = "last")]
        build: BuildSelector,
    },

    /// Trigger a build
    Trigger {
        job: JobReference,

        /// Build parameter as NAME=VALUE (repeatable)
        #[arg(long = "param", short = 'p', value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Wait for the build to finish
        #[arg(long)]
        wait: bool,

        /// Wait timeout in minutes
        #[arg(long)]
        timeout: Option<u64>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Wait for the last build of a job to finish
    Wait {
        job: JobReference,

        /// Wait timeout in minutes
        #[arg(long)]
        timeout: Option<u64>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Trigger the test job with BROWSER and CSV_FILE parameters
    Run {
        /// Job to trigger (default: selenium-tests)
        #[arg(long)]
        job: Option<String>,

        /// chrome, firefox, or any other name the job accepts
        #[arg(long)]
        browser: Option<String>,

        /// Test data file passed as CSV_FILE
        #[arg(long)]
        csv_file: Option<String>,

        /// Return once the build is triggered
        #[arg(long)]
        no_wait: bool,

        /// Wait timeout in minutes
        #[arg(long)]
        timeout: Option<u64>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Interactive menu
    Menu,

    /// Print the effective configuration (secrets redacted)
    Config,
}

fn parse_param(arg: &str) -> Result<(String, String), String> {
    BuildParameters::parse_assignment(arg).map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

/// CLI flags as the highest-precedence config layer
fn cli_overrides(cli: &Cli) -> Value {
    let mut server = Map::new();
    let mut job = Map::new();
    let mut timeouts = Map::new();

    if let Some(ref url) = cli.url {
        server.insert("url".into(), json!(url));
    }
    if let Some(ref username) = cli.username {
        server.insert("username".into(), json!(username));
    }
    if let Some(ref token) = cli.token {
        server.insert("token".into(), json!(token));
    }

    let timeout = match &cli.command {
        Commands::Trigger { timeout, .. } | Commands::Wait { timeout, .. } => *timeout,
        Commands::Run {
            job: name,
            browser,
            csv_file,
            no_wait,
            timeout,
            ..
        } => {
            if let Some(name) = name {
                job.insert("name".into(), json!(name));
            }
            if let Some(browser) = browser {
                job.insert("browser".into(), json!(browser));
            }
            if let Some(csv_file) = csv_file {
                job.insert("csv_file".into(), json!(csv_file));
            }
            if *no_wait {
                job.insert("wait".into(), json!(false));
            }
            *timeout
        }
        _ => None,
    };
    if let Some(minutes) = timeout {
        timeouts.insert("wait_minutes".into(), json!(minutes));
    }

    json!({"server": server, "job": job, "timeouts": timeouts})
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match LaneConfig::load(cli.config.as_deref(), Some(cli_overrides(&cli))) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    if let Commands::Config = cli.command {
        print_json(&config.redacted());
        process::exit(0);
    }

    let credentials = match config.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let transport = match HttpTransport::new(HttpConfig {
        connect_timeout: config.timeouts.connect(),
        ..HttpConfig::default()
    }) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let client = OrchestrationClient::new(&config.url, credentials, Box::new(transport));

    let signals = Arc::new(SignalHandler::new());
    if let Err(e) = signals.install() {
        warn!(error = %e, "Failed to install signal handler; waits cannot be interrupted");
    }

    let code = run_command(cli.command, &config, &client, &signals);
    client.shutdown();
    process::exit(code);
}

fn run_command(
    command: Commands,
    config: &LaneConfig,
    client: &OrchestrationClient,
    signals: &SignalHandler,
) -> i32 {
    match command {
        Commands::Jobs { json } => run_jobs(client, json),
        Commands::Info { job, json } => run_info(client, &job, json),
        Commands::Status { job, build, json } => run_status(client, &job, build, json),
        Commands::Console { job, build } => run_console(client, &job, build),
        Commands::Trigger {
            job,
            params,
            wait,
            json,
            ..
        } => {
            let parameters: BuildParameters = params.into_iter().collect();
            let mut result = client.trigger_build(&job, Some(&parameters));
            if result.success && wait {
                result = CompletionWaiter::new(client, signals.signal())
                    .wait(&job, config.timeouts.wait())
                    .into_result();
            }
            report(&result, json)
        }
        Commands::Wait { job, json, .. } => {
            let waited = CompletionWaiter::new(client, signals.signal())
                .wait(&job, config.timeouts.wait());
            if json {
                let outcome = waited.outcome.name();
                let polls = waited.polls;
                let elapsed_secs = waited.elapsed.as_secs();
                let result = waited.into_result();
                print_json(&json!({
                    "outcome": outcome,
                    "polls": polls,
                    "elapsed_secs": elapsed_secs,
                    "result": result,
                }));
                result.exit_code()
            } else {
                report(&waited.into_result(), false)
            }
        }
        Commands::Run { json, .. } => {
            let job = match JobReference::new(config.job.clone()) {
                Ok(job) => job,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            };
            let request = RunRequest::new(job)
                .with_browser(Browser::from(config.browser.as_str()))
                .with_csv_file(config.csv_file.clone())
                .with_wait(config.wait)
                .with_timeout(config.timeouts.wait());
            let result = TestRunner::new(client, signals.signal()).run(&request);
            report(&result, json)
        }
        Commands::Menu => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut console = Console::new(client, stdin.lock(), stdout.lock(), signals.signal());
            match console.run() {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("Console error: {}", e);
                    1
                }
            }
        }
        Commands::Config => 0,
    }
}

fn report(result: &OrchestrationResult, json: bool) -> i32 {
    if json {
        print_json(result);
    } else {
        println!("{}", result);
    }
    result.exit_code()
}

fn run_jobs(client: &OrchestrationClient, json: bool) -> i32 {
    let Some(jobs) = client.list_jobs() else {
        eprintln!("Failed to retrieve jobs list.");
        return 1;
    };

    if json {
        print_json(&jobs);
        return 0;
    }

    if jobs.is_empty() {
        println!("No jobs found.");
        return 0;
    }

    println!("{:<30} {:<15} {:<10} {:<15}", "Job Name", "Status", "Buildable", "Last Build");
    println!("{}", "-".repeat(80));
    for job in &jobs {
        let status = job.last_build_result().map(|r| r.as_str()).unwrap_or("N/A");
        let last_build = match job.last_build_number() {
            0 => "N/A".to_string(),
            n => format!("#{}", n),
        };
        let buildable = if job.buildable { "Yes" } else { "No" };
        println!("{:<30} {:<15} {:<10} {:<15}", job.name, status, buildable, last_build);
    }
    println!("{}", "-".repeat(80));
    println!("Total jobs: {}", jobs.len());
    0
}

fn run_info(client: &OrchestrationClient, job: &JobReference, json: bool) -> i32 {
    let Some(info) = client.fetch_job_info(job) else {
        eprintln!("Failed to get job information.");
        return 1;
    };

    if json {
        print_json(&info);
        return 0;
    }

    println!("Name: {}", info.name);
    println!("Description: {}", info.description);
    println!("URL: {}", info.url);
    println!("Color: {}", info.color);
    println!("Buildable: {}", if info.buildable { "Yes" } else { "No" });
    println!("Last Build Number: {}", info.last_build_number());
    println!(
        "Last Build Result: {}",
        info.last_build_result().map(|r| r.as_str()).unwrap_or("N/A")
    );
    println!(
        "Last Build Building: {}",
        if info.last_build_building() { "Yes" } else { "No" }
    );
    0
}

fn run_status(
    client: &OrchestrationClient,
    job: &JobReference,
    build: BuildSelector,
    json: bool,
) -> i32 {
    let Some(status) = client.fetch_build_status(job, build) else {
        eprintln!("Failed to get job status.");
        return 1;
    };

    if json {
        print_json(&status);
        return 0;
    }

    println!("Build Number: #{}", status.number);
    println!("Result: {}", status.result_str());
    println!("Building: {}", if status.building { "Yes" } else { "No" });
    println!("Duration: {}", status.format_duration());
    if let Some(started) = status.started_at() {
        println!("Started: {}", started.to_rfc3339());
    }
    println!("URL: {}", status.url);
    0
}

fn run_console(client: &OrchestrationClient, job: &JobReference, build: BuildSelector) -> i32 {
    let text = client.fetch_console_output(job, build);
    if text == CONSOLE_FETCH_FAILED || text == CONSOLE_FETCH_ERROR {
        eprintln!("{}", text);
        return 1;
    }
    print!("{}", text);
    0
}
