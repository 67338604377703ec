use clap::Parser;
use reqindex::{RequirementIndex, RequirementObject};
use serde::Serialize;
use tracing::instrument;

use super::{Context, load, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Display a requirement, its links and its neighbours")]
pub struct Show {
    /// The id of the requirement to display
    id: String,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

/// JSON view of a record with its reverse links.
#[derive(Debug, Serialize)]
struct Details<'a> {
    #[serde(flatten)]
    record: &'a RequirementObject,
    priority: &'static str,
    incoming: Vec<&'a str>,
    missing_targets: Vec<&'a str>,
}

impl<'a> Details<'a> {
    fn new(index: &'a RequirementIndex, record: &'a RequirementObject) -> Self {
        let mut incoming: Vec<&str> = index.incoming(&record.id).collect();
        incoming.sort_unstable();
        let missing_targets = record.targets().filter(|t| !index.contains(t)).collect();

        Self {
            record,
            priority: record.priority().as_str(),
            incoming,
            missing_targets,
        }
    }
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let builder = load::index(&context.input)?;
        let index = builder.index();

        let Some(record) = index.get(&self.id) else {
            anyhow::bail!("requirement {} not found", self.id);
        };
        let details = Details::new(index, record);

        match self.output {
            OutputFormat::Pretty => output_pretty(&details),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&details)?),
        }
        Ok(())
    }
}

fn output_pretty(details: &Details<'_>) {
    let record = details.record;

    println!("# {}", record.id);
    println!("{}\n", record.location.to_string().dim());

    println!("{}", "Metadata".dim());
    println!("  Type:      {}", record.kind);
    println!("  Level:     {}", record.level.as_deref().unwrap_or("-"));
    println!("  Status:    {}", record.status.as_deref().unwrap_or("-"));
    println!("  Baseline:  {}", record.baseline().unwrap_or("-"));
    println!("  Priority:  {}", details.priority);
    for (key, value) in record.metadata.iter().filter(|(key, _)| key.as_str() != "priority") {
        println!("  {key}: {value}");
    }

    println!("\n{}", "Links".dim());
    if !record.has_links() {
        println!("  (none)");
    }
    for (link_type, target) in record.outgoing() {
        let line = format!("  {link_type} → {target}");
        if details.missing_targets.contains(&target) {
            println!("{} {}", line.warning(), "(missing)".dim());
        } else {
            println!("{line}");
        }
    }

    println!("\n{}", "Linked from".dim());
    if details.incoming.is_empty() {
        println!("  (none)");
    }
    for id in &details.incoming {
        println!("  {id}");
    }
}
