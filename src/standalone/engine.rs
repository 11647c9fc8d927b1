//! Local file plumbing around the engine: input acquisition, job assembly,
//! output files and the TF-IDF filter.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use glob::glob;
use tracing::{debug, info};

use super::Job;
use crate::utils::args_to_aux;
use crate::*;

/// Byte-level job and output types used by the runner.
pub type ByteJobSpec = JobSpec<ByteKeyValue, Bytes, Bytes, Bytes, Bytes>;
pub type ByteJobOutput = JobOutput<Bytes, Bytes>;

/// Reads every file matching `pattern` as one record: key = path, value =
/// content. Files come in path order, which fixes the input sequence.
pub fn read_inputs(pattern: &str) -> Result<Vec<ByteKeyValue>> {
    let mut paths = glob(pattern)
        .with_context(|| format!("invalid input pattern `{}`", pattern))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    paths.retain(|path| path.is_file());
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for pathspec in paths {
        let mut buf = Vec::new();
        {
            let mut file = File::open(&pathspec)
                .with_context(|| format!("failed to open {}", pathspec.display()))?;
            file.read_to_end(&mut buf)?;
        }
        let filename = pathspec.to_string_lossy().into_owned();
        records.push(KeyValue {
            key: Bytes::from(filename),
            value: Bytes::from(buf),
        });
    }
    Ok(records)
}

/// Assembles the engine job for `job` over `num_records` inputs.
pub fn build_spec(job: &Job, workload: ByteWorkload, num_records: usize) -> Result<ByteJobSpec> {
    let workload = if job.combiner {
        workload
    } else {
        workload.without_combiner()
    };

    let mut args = job.args.clone();
    args.extend(workload::implied_args(&job.workload, num_records));

    let spec = JobSpec::builder(workload)
        .config(&job.engine)
        .aux(args_to_aux(&args)?)
        .build()?;
    Ok(spec)
}

/// Runs `job` to completion and writes one `mr-out-<bucket>` file per bucket.
///
/// Blocks the calling thread for the duration of the job.
pub fn run_standalone_job(job: &Job) -> Result<ByteJobOutput> {
    let workload = workload::named(&job.workload)?;
    let records = read_inputs(&job.input)?;
    if records.is_empty() {
        bail!("no input files match `{}`", job.input);
    }
    info!(
        workload = %job.workload,
        files = records.len(),
        "submitting standalone job"
    );

    let spec = build_spec(job, workload, records.len())?;
    let output = Driver::new(spec)
        .run_blocking(records)
        .with_context(|| format!("{} job failed", job.workload))?;

    let files = write_outputs(&job.output, &output)?;
    info!(files = files.len(), output = %job.output, "job output written");
    Ok(output)
}

/// Writes the values of each bucket, in output order, to `<dir>/mr-out-<bucket>`.
pub fn write_outputs(output_dir: impl AsRef<Path>, output: &ByteJobOutput) -> Result<Vec<PathBuf>> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(output.num_buckets());
    for (bucket, pairs) in output.buckets().iter().enumerate() {
        let out_pathspec = output_dir.join(format!("mr-out-{}", bucket));
        let mut out_file = File::create(&out_pathspec)
            .with_context(|| format!("failed to create {}", out_pathspec.display()))?;
        for pair in pairs {
            out_file.write_all(&pair.value)?;
        }
        debug!(bucket, pairs = pairs.len(), "bucket written");
        written.push(out_pathspec);
    }
    Ok(written)
}

/// Lines of a TF-IDF job's output whose word column equals `term`, in file
/// order.
pub fn filter_output(output_dir: impl AsRef<Path>, term: &str) -> Result<Vec<String>> {
    let pattern = output_dir.as_ref().join("mr-out-*");
    let pattern = pattern.to_string_lossy();
    let mut paths = glob(&pattern)?.collect::<std::result::Result<Vec<_>, _>>()?;
    paths.sort();

    let mut matches = Vec::new();
    for path in paths {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for line in content.lines() {
            let columns = line.split('\t').collect::<Vec<_>>();
            if columns.len() > 1 && columns[1] == term {
                matches.push(line.trim().to_string());
            }
        }
    }
    Ok(matches)
}
