use clap::Parser;
use reqindex::analysis::{TypedGraph, find_minimal_cycle};
use tracing::instrument;

use super::{Context, load, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Show the shortest cycle closed by the link FROM -> TO")]
pub struct Cycle {
    /// Source of the (existing or proposed) link
    from: String,

    /// Target of the link
    to: String,
}

impl Cycle {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let builder = load::index(&context.input)?;
        let index = builder.index();
        for id in [&self.from, &self.to] {
            if !index.contains(id) {
                anyhow::bail!("requirement {id} not found");
            }
        }

        let graph = TypedGraph::build(index.iter());
        match find_minimal_cycle(&graph, &self.from, &self.to) {
            Some(path) => {
                println!("{}", render(&path).warning());
                println!(
                    "{}",
                    format!(
                        "Removing {} → {} breaks this cycle ({} link(s))",
                        self.from,
                        self.to,
                        path.len()
                    )
                    .dim()
                );
            }
            None => println!(
                "{}",
                format!("{} → {} does not close a cycle", self.from, self.to).success()
            ),
        }
        Ok(())
    }
}

/// `A → B → C → A`
fn render(path: &[String]) -> String {
    let mut rendered = path.join(" → ");
    if let Some(first) = path.first() {
        rendered.push_str(" → ");
        rendered.push_str(first);
    }
    rendered
}
