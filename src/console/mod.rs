//! Interactive console
//!
//! Menu-driven front-end over the orchestration client. Reads commands
//! from any `BufRead` and writes to any `Write`, so sessions can be
//! scripted in tests.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use jenkins_protocol::{format_duration, BuildParameters, BuildSelector, JobReference};
use tracing::info;

use crate::config::DEFAULT_CSV_FILE;
use crate::host::{OrchestrationClient, OrchestrationResult};
use crate::runner::{BROWSER_PARAM, CSV_FILE_PARAM};
use crate::signal::CancelSignal;
use crate::timeout::MAX_WAIT_MINUTES;
use crate::wait::{Clock, CompletionWaiter, SystemClock};

const DEFAULT_TIMEOUT_MINUTES: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    ListJobs,
    Trigger,
    TriggerWithParameters,
    Status,
    ConsoleOutput,
    Wait,
    Info,
    Help,
    Quit,
}

impl MenuCommand {
    /// Commands in menu order
    pub const ALL: [MenuCommand; 9] = [
        MenuCommand::ListJobs,
        MenuCommand::Trigger,
        MenuCommand::TriggerWithParameters,
        MenuCommand::Status,
        MenuCommand::ConsoleOutput,
        MenuCommand::Wait,
        MenuCommand::Info,
        MenuCommand::Help,
        MenuCommand::Quit,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            MenuCommand::ListJobs => "1",
            MenuCommand::Trigger => "2",
            MenuCommand::TriggerWithParameters => "3",
            MenuCommand::Status => "4",
            MenuCommand::ConsoleOutput => "5",
            MenuCommand::Wait => "6",
            MenuCommand::Info => "7",
            MenuCommand::Help => "h",
            MenuCommand::Quit => "q",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuCommand::ListJobs => "List all jobs",
            MenuCommand::Trigger => "Trigger job (without parameters)",
            MenuCommand::TriggerWithParameters => "Trigger job with parameters",
            MenuCommand::Status => "Get job status",
            MenuCommand::ConsoleOutput => "Get console output",
            MenuCommand::Wait => "Wait for job completion",
            MenuCommand::Info => "Get job information",
            MenuCommand::Help => "Show help",
            MenuCommand::Quit => "Quit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown menu choice '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for MenuCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" => Ok(MenuCommand::ListJobs),
            "2" => Ok(MenuCommand::Trigger),
            "3" => Ok(MenuCommand::TriggerWithParameters),
            "4" => Ok(MenuCommand::Status),
            "5" => Ok(MenuCommand::ConsoleOutput),
            "6" => Ok(MenuCommand::Wait),
            "7" => Ok(MenuCommand::Info),
            "h" | "help" => Ok(MenuCommand::Help),
            "q" | "quit" | "exit" => Ok(MenuCommand::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for MenuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.key(), self.label())
    }
}

pub struct Console<'a, R, W> {
    client: &'a OrchestrationClient,
    input: R,
    output: W,
    cancel: Arc<CancelSignal>,
    clock: Arc<dyn Clock>,
    eof: bool,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(
        client: &'a OrchestrationClient,
        input: R,
        output: W,
        cancel: Arc<CancelSignal>,
    ) -> Self {
        Self {
            client,
            input,
            output,
            cancel,
            clock: Arc::new(SystemClock),
            eof: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the menu loop until quit or end of input
    pub fn run(&mut self) -> io::Result<()> {
        info!(server = %self.client.base_url(), "Console started");

        loop {
            self.show_menu()?;
            let choice = self.read_line()?;
            if self.eof {
                writeln!(self.output)?;
                return Ok(());
            }

            match choice.parse::<MenuCommand>() {
                Ok(MenuCommand::Quit) => {
                    info!("Exiting console");
                    return Ok(());
                }
                Ok(command) => self.dispatch(command)?,
                Err(_) => writeln!(self.output, "Invalid choice. Please try again.")?,
            }

            writeln!(self.output, "\nPress Enter to continue...")?;
            self.read_line()?;
            if self.eof {
                return Ok(());
            }
        }
    }

    /// Execute one command
    pub fn dispatch(&mut self, command: MenuCommand) -> io::Result<()> {
        match command {
            MenuCommand::ListJobs => self.list_jobs(),
            MenuCommand::Trigger => self.trigger(),
            MenuCommand::TriggerWithParameters => self.trigger_with_parameters(),
            MenuCommand::Status => self.status(),
            MenuCommand::ConsoleOutput => self.console_output(),
            MenuCommand::Wait => self.wait(),
            MenuCommand::Info => self.info(),
            MenuCommand::Help => self.show_help(),
            MenuCommand::Quit => Ok(()),
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.eof = true;
        }
        Ok(line.trim().to_string())
    }

    fn prompt(&mut self, text: &str) -> io::Result<String> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        self.read_line()
    }

    fn prompt_job(&mut self, text: &str) -> io::Result<Option<JobReference>> {
        let name = self.prompt(text)?;
        match JobReference::new(name) {
            Ok(job) => Ok(Some(job)),
            Err(_) => {
                writeln!(self.output, "Job name cannot be empty.")?;
                Ok(None)
            }
        }
    }

    fn print_result(&mut self, result: &OrchestrationResult) -> io::Result<()> {
        writeln!(self.output, "{}", result)
    }

    fn show_menu(&mut self) -> io::Result<()> {
        let rule = "=".repeat(50);
        writeln!(self.output, "\n{}", rule)?;
        writeln!(self.output, "           JENKINS BUILD MANAGER CLI")?;
        writeln!(self.output, "{}", rule)?;
        for command in MenuCommand::ALL {
            writeln!(self.output, "{}", command)?;
        }
        writeln!(self.output, "{}", rule)?;
        write!(self.output, "Enter your choice: ")?;
        self.output.flush()
    }

    fn show_help(&mut self) -> io::Result<()> {
        let rule = "=".repeat(60);
        writeln!(self.output, "\n{}", rule)?;
        writeln!(self.output, "                           HELP")?;
        writeln!(self.output, "{}", rule)?;
        writeln!(self.output, "This console provides the following functionality:")?;
        writeln!(self.output)?;
        writeln!(self.output, "1. List all jobs - Shows all available Jenkins jobs")?;
        writeln!(self.output, "2. Trigger job - Triggers a job without parameters")?;
        writeln!(
            self.output,
            "3. Trigger job with parameters - Triggers a job with custom parameters"
        )?;
        writeln!(self.output, "4. Get job status - Shows the status of a specific job")?;
        writeln!(self.output, "5. Get console output - Shows the console output of a job")?;
        writeln!(self.output, "6. Wait for job completion - Waits for a job to complete")?;
        writeln!(self.output, "7. Get job information - Shows detailed job information")?;
        writeln!(self.output)?;
        writeln!(self.output, "Common parameters for Selenium tests:")?;
        writeln!(self.output, "- BROWSER: chrome, firefox")?;
        writeln!(self.output, "- CSV_FILE: Path to test data file")?;
        writeln!(self.output, "{}", rule)
    }

    fn list_jobs(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nFetching jobs...")?;
        let Some(jobs) = self.client.list_jobs() else {
            return writeln!(self.output, "Failed to retrieve jobs list.");
        };

        let rule = "-".repeat(80);
        writeln!(self.output, "\nAvailable Jobs:")?;
        writeln!(self.output, "{}", rule)?;
        writeln!(
            self.output,
            "{:<30} {:<15} {:<10} {:<15}",
            "Job Name", "Status", "Buildable", "Last Build"
        )?;
        writeln!(self.output, "{}", rule)?;
        for job in &jobs {
            let status = job
                .last_build_result()
                .map(|r| r.as_str().to_string())
                .unwrap_or_else(|| "N/A".to_string());
            let last_build = match job.last_build_number() {
                0 => "N/A".to_string(),
                n => format!("#{}", n),
            };
            writeln!(
                self.output,
                "{:<30} {:<15} {:<10} {:<15}",
                job.name,
                status,
                yes_no(job.buildable),
                last_build
            )?;
        }
        writeln!(self.output, "{}", rule)?;
        writeln!(self.output, "Total jobs: {}", jobs.len())
    }

    fn trigger(&mut self) -> io::Result<()> {
        let Some(job) = self.prompt_job("\nEnter job name to trigger: ")? else {
            return Ok(());
        };
        writeln!(self.output, "Triggering job: {}", job)?;
        let result = self.client.trigger_build(&job, None);
        self.print_result(&result)
    }

    fn trigger_with_parameters(&mut self) -> io::Result<()> {
        let Some(job) = self.prompt_job("\nEnter job name to trigger: ")? else {
            return Ok(());
        };

        let mut parameters = BuildParameters::new();

        let browser = self.prompt("Enter browser (chrome/firefox) [chrome]: ")?;
        let browser = if browser.is_empty() {
            "chrome".to_string()
        } else {
            browser
        };
        parameters.insert(BROWSER_PARAM, browser);

        let csv_file = self.prompt(&format!("Enter CSV file path [{}]: ", DEFAULT_CSV_FILE))?;
        let csv_file = if csv_file.is_empty() {
            DEFAULT_CSV_FILE.to_string()
        } else {
            csv_file
        };
        parameters.insert(CSV_FILE_PARAM, csv_file);

        writeln!(self.output, "Enter additional parameters (press Enter when done):")?;
        loop {
            let name = self.prompt("Parameter name (or Enter to finish): ")?;
            if name.is_empty() {
                break;
            }
            let value = self.prompt("Parameter value: ")?;
            if !value.is_empty() {
                parameters.insert(name, value);
            }
        }

        writeln!(self.output, "\nTriggering job: {} with parameters: {}", job, parameters)?;
        let result = self.client.trigger_build(&job, Some(&parameters));
        self.print_result(&result)
    }

    fn status(&mut self) -> io::Result<()> {
        let Some(job) = self.prompt_job("\nEnter job name: ")? else {
            return Ok(());
        };
        writeln!(self.output, "Getting status for job: {}", job)?;
        let Some(status) = self.client.fetch_build_status(&job, BuildSelector::Last) else {
            return writeln!(self.output, "Failed to get job status.");
        };

        let rule = "-".repeat(40);
        writeln!(self.output, "\nJob Status:")?;
        writeln!(self.output, "{}", rule)?;
        writeln!(self.output, "Build Number: #{}", status.number)?;
        writeln!(self.output, "Result: {}", status.result_str())?;
        writeln!(self.output, "Building: {}", yes_no(status.building))?;
        writeln!(self.output, "Duration: {}", format_duration(status.duration))?;
        writeln!(self.output, "URL: {}", status.url)?;
        writeln!(self.output, "{}", rule)
    }

    fn console_output(&mut self) -> io::Result<()> {
        let Some(job) = self.prompt_job("\nEnter job name: ")? else {
            return Ok(());
        };
        let build = self.prompt("Enter build number (or Enter for last build): ")?;
        let Ok(selector) = build.parse::<BuildSelector>() else {
            return writeln!(self.output, "Invalid build number.");
        };

        let text = self.client.fetch_console_output(&job, selector);
        let rule = "=".repeat(80);
        writeln!(self.output, "\nConsole Output:")?;
        writeln!(self.output, "{}", rule)?;
        writeln!(self.output, "{}", text)?;
        writeln!(self.output, "{}", rule)
    }

    fn wait(&mut self) -> io::Result<()> {
        let Some(job) = self.prompt_job("\nEnter job name: ")? else {
            return Ok(());
        };
        let input = self.prompt(&format!(
            "Enter timeout in minutes [{}]: ",
            DEFAULT_TIMEOUT_MINUTES
        ))?;
        let minutes = if input.is_empty() {
            DEFAULT_TIMEOUT_MINUTES
        } else {
            match input.parse::<u64>() {
                Ok(m) if (1..=MAX_WAIT_MINUTES).contains(&m) => m,
                _ => {
                    writeln!(
                        self.output,
                        "Invalid timeout, using default: {} minutes",
                        DEFAULT_TIMEOUT_MINUTES
                    )?;
                    DEFAULT_TIMEOUT_MINUTES
                }
            }
        };

        writeln!(
            self.output,
            "Waiting for job completion: {} (timeout: {} minutes)",
            job, minutes
        )?;
        self.output.flush()?;

        let result = CompletionWaiter::new(self.client, Arc::clone(&self.cancel))
            .with_clock(Arc::clone(&self.clock))
            .wait(&job, Duration::from_secs(minutes * 60))
            .into_result();
        self.print_result(&result)
    }

    fn info(&mut self) -> io::Result<()> {
        let Some(job) = self.prompt_job("\nEnter job name: ")? else {
            return Ok(());
        };
        writeln!(self.output, "Getting information for job: {}", job)?;
        let Some(info) = self.client.fetch_job_info(&job) else {
            return writeln!(self.output, "Failed to get job information.");
        };

        let rule = "-".repeat(50);
        writeln!(self.output, "\nJob Information:")?;
        writeln!(self.output, "{}", rule)?;
        writeln!(self.output, "Name: {}", info.name)?;
        writeln!(self.output, "Description: {}", info.description)?;
        writeln!(self.output, "URL: {}", info.url)?;
        writeln!(self.output, "Color: {}", info.color)?;
        writeln!(self.output, "Buildable: {}", yes_no(info.buildable))?;
        writeln!(self.output, "Last Build Number: {}", info.last_build_number())?;
        writeln!(
            self.output,
            "Last Build Result: {}",
            info.last_build_result().map(|r| r.as_str()).unwrap_or("N/A")
        )?;
        writeln!(self.output, "Last Build Building: {}", yes_no(info.last_build_building()))?;
        writeln!(self.output, "{}", rule)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}
