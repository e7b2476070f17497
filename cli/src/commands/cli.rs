use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use harload_core::api::{AppConfig, TranslationErrorPolicy};

#[derive(Parser, Debug)]
#[command(name = "harload", version, about = "Replay HAR captures as HTTP load")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LoadArgs {
    /// HAR file to replay.
    pub har: PathBuf,

    /// Number of concurrent workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// How long to generate load, e.g. `30s` or `2m`.
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// How long to wait for in-flight requests and the sink after the deadline.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub grace: Option<Duration>,

    /// InfluxDB base URL; the first path segment names the database.
    #[arg(long)]
    pub influx_url: Option<String>,

    /// Append results as JSON lines to this file (`stdout:` for standard output).
    #[arg(long)]
    pub jsonl: Option<String>,

    /// Do not send the cookies recorded in the archive.
    #[arg(long)]
    pub ignore_har_cookies: bool,

    /// Skip TLS certificate verification.
    #[arg(long)]
    pub insecure: bool,

    /// Cycle through the archive until the deadline instead of a single pass.
    #[arg(long)]
    pub repeat: bool,

    /// Stop a worker after the first entry it cannot turn into a request.
    #[arg(long)]
    pub stop_on_bad_entry: bool,
}

impl LoadArgs {
    /// Layers the flags over the file/env configuration. Flags that are not
    /// given leave the configured value alone.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(workers) = self.workers {
            cfg.load.workers = workers;
        }
        if let Some(duration) = self.duration {
            cfg.load.duration = duration;
        }
        if let Some(grace) = self.grace {
            cfg.load.grace = grace;
        }
        if let Some(url) = &self.influx_url {
            cfg.sink.influx_url = Some(url.clone());
        }
        if let Some(path) = &self.jsonl {
            cfg.sink.jsonl_path = Some(path.clone());
        }
        cfg.load.ignore_har_cookies |= self.ignore_har_cookies;
        cfg.load.insecure_skip_verify |= self.insecure;
        cfg.load.repeat |= self.repeat;
        if self.stop_on_bad_entry {
            cfg.load.translation_error = TranslationErrorPolicy::StopWorker;
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ValidateArgs {
    /// HAR file to check.
    pub har: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a HAR file against its recorded hosts.
    Load(LoadArgs),
    /// Check that every entry of a HAR file can be replayed.
    Validate(ValidateArgs),
}
