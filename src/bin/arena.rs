use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, Level};

use skirmish_arena::logger::{default_log_file_name, init_logger};
use skirmish_arena::prelude::*;

/// Run a batch of headless matches between two controllers.
#[derive(Debug, Parser)]
#[command(name = "arena", version, about)]
struct Cli {
    /// Experiment configuration file
    #[arg(short, long, default_value = "config/arena.toml")]
    config: PathBuf,

    /// Experiment number, also used as the random seed
    #[arg(short = 'n', long)]
    number: Option<u64>,

    /// Directory relative paths of the configuration are resolved against
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    /// Write every log event to a file, a timestamped one when no path is given
    #[arg(long, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    /// Lowest level logged to stderr when no log file is used
    #[arg(long, default_value = "warn")]
    log_level: Level,

    /// Do not print match progress
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Where log events go, `None` meaning stderr.
    fn log_file(&self) -> anyhow::Result<Option<PathBuf>> {
        Ok(match &self.log_file {
            Some(Some(path)) => Some(path.clone()),
            Some(None) => Some(PathBuf::from(default_log_file_name()?)),
            None => None,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logger(cli.log_file()?.as_deref(), cli.log_level)?;
    debug!(?cli);

    let mut config = ExperimentConfig::load(&cli.config)
        .with_context(|| format!("loading '{}'", cli.config.display()))?;
    if let Some(number) = cli.number {
        config = config.with_seed(number);
    }
    if let Some(directory) = cli.directory {
        config = config.with_working_dir(directory);
    }
    if cli.quiet {
        config = config.with_verbose(false);
    }
    info!(?config);

    let registry = ControllerRegistry::with_builtins();
    let mut observer: Box<dyn ProgressObserver> = if config.verbose() {
        Box::new(ConsolePrinter::default())
    } else {
        Box::new(LogObserver)
    };
    let mut experiment = Experiment::from_config(config, &registry)?;
    let report = experiment.run(observer.as_mut())?;

    if !experiment.config().verbose() {
        info!(%report);
    }
    Ok(())
}
