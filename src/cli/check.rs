use clap::Parser;
use reqindex::quick_check;
use tracing::instrument;

use super::{
    Context, load,
    terminal::{self, Colorize},
};

#[derive(Debug, Parser)]
#[command(about = "Report duplicate ids and dangling links")]
pub struct Check {
    /// Print diagnostics as JSON
    #[arg(long)]
    json: bool,
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let builder = load::index(&context.input)?;
        let diagnostics = quick_check(builder.index(), &builder.duplicates());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        } else if diagnostics.is_empty() {
            println!(
                "{}",
                format!(
                    "✓ {} requirements, no duplicate ids or dangling links",
                    builder.index().len()
                )
                .success()
            );
        } else {
            for diagnostic in &diagnostics {
                println!("{} {diagnostic}", terminal::severity(diagnostic.severity));
            }
            println!("\n{}", format!("{} problem(s) found", diagnostics.len()).warning());
        }

        if !diagnostics.is_empty() {
            std::process::exit(2);
        }
        Ok(())
    }
}
