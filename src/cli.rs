use std::path::PathBuf;

mod check;
mod cycle;
mod export;
mod load;
mod show;
mod terminal;
mod validate;

use check::Check;
use clap::ArgAction;
use cycle::Cycle;
use export::Export;
use show::Show;
use validate::Validate;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// A directory of JSON record batches, or an exported snapshot
    #[arg(short, long, default_value = ".", global = true)]
    input: PathBuf,

    /// Analysis configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let context = Context {
            input: self.input,
            config: self.config,
        };

        self.command
            .unwrap_or_else(|| Command::Validate(Validate::default()))
            .run(&context)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Global options shared by every subcommand.
#[derive(Debug)]
pub struct Context {
    input: PathBuf,
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Run deep validation and print a report (default)
    Validate(Validate),

    /// Run the lightweight duplicate-id and dangling-link checks
    Check(Check),

    /// Show a requirement and its neighbours
    Show(Show),

    /// Show the shortest cycle that a link would close
    ///
    /// Use this to decide which single link to remove to break a cycle.
    Cycle(Cycle),

    /// Export the index as a snapshot
    Export(Export),
}

impl Command {
    fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Validate(command) => command.run(context)?,
            Self::Check(command) => command.run(context)?,
            Self::Show(command) => command.run(context)?,
            Self::Cycle(command) => command.run(context)?,
            Self::Export(command) => command.run(context)?,
        }
        Ok(())
    }
}
