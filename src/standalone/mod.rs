//! Runs registered workloads over local files, inside this process.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::EngineConfig;

pub mod engine;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a job over local files
    Submit(SubmitArgs),
    /// Print the TF-IDF lines of a finished job for one word
    Filter(FilterArgs),
}

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Glob spec for the input files
    #[arg(short, long)]
    pub input: String,

    /// Name of the workload
    #[arg(short, long)]
    pub workload: String,

    /// Output directory
    #[arg(short, long)]
    pub output: String,

    /// Number of map tasks
    #[arg(short, long)]
    pub mappers: Option<usize>,

    /// Number of reduce tasks, one output file each
    #[arg(short, long)]
    pub reducers: Option<usize>,

    /// Per-attempt task timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Attempts per task
    #[arg(long)]
    pub attempts: Option<u32>,

    /// JSON engine configuration; flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip the workload's combiner
    #[arg(long)]
    pub no_combiner: bool,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct FilterArgs {
    /// Output directory of a finished tfidf job
    #[arg(short, long)]
    pub output: String,

    /// Word to look up
    #[arg(short, long)]
    pub term: String,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub input: String,
    pub workload: String,
    pub output: String,
    pub args: Vec<String>,
    pub engine: EngineConfig,
    pub combiner: bool,
}

impl Job {
    /// A job with the default engine configuration.
    pub fn new(input: &str, workload: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            workload: workload.to_string(),
            output: output.to_string(),
            args: Vec::new(),
            engine: EngineConfig::default(),
            combiner: true,
        }
    }
}

impl SubmitArgs {
    /// Resolves the engine configuration (file, then flags) into a [`Job`].
    pub fn into_job(self) -> Result<Job> {
        let mut engine = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(mappers) = self.mappers {
            engine.num_mappers = mappers;
        }
        if let Some(reducers) = self.reducers {
            engine.num_reducers = reducers;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            engine.task_timeout_ms = Some(timeout_ms);
        }
        if let Some(attempts) = self.attempts {
            engine.max_attempts = attempts;
        }

        Ok(Job {
            input: self.input,
            workload: self.workload,
            output: self.output,
            args: self.args,
            engine,
            combiner: !self.no_combiner,
        })
    }
}
