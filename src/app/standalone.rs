use anyhow::Result;
use clap::Parser;
use mrlocal::standalone::engine::{filter_output, run_standalone_job};
use mrlocal::standalone::{Args, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(verbose >= 2)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    match args.command {
        Commands::Submit(submit) => {
            let job = submit.into_job()?;
            run_standalone_job(&job)?;
        }
        Commands::Filter(filter) => {
            for line in filter_output(&filter.output, &filter.term)? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
