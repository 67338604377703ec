use std::{fs, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing::instrument;

use super::{Context, load, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Write the index as a snapshot that can be loaded with --input")]
pub struct Export {
    /// Destination file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Export {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let builder = load::index(&context.input)?;
        let snapshot = builder.export_snapshot();
        let json = snapshot.to_json()?;

        match self.output {
            Some(path) => {
                fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!(
                    "{}",
                    format!(
                        "Exported {} requirements to {} ({})",
                        snapshot.records().len(),
                        path.display(),
                        snapshot.fingerprint().get(..12).unwrap_or_default()
                    )
                    .success()
                );
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}
