//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Generate a presentation deck from a topic.
///
/// Sends the topic to the generation service, shows progress while the deck
/// is being built, and saves the result into the output directory.
#[derive(Parser, Debug)]
#[command(name = "deckgen")]
#[command(author, version, about)]
pub struct Args {
    /// Topic or text for the presentation (words are joined with spaces)
    #[arg(required = true, value_name = "TEXT")]
    pub text: Vec<String>,

    /// Tone of the generated content (e.g. "educational", "formal")
    #[arg(short, long)]
    pub tone: Option<String>,

    /// Number of slides to generate (1-15, default 5)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u8).range(1..=15))]
    pub slides: Option<u8>,

    /// Generation endpoint URL
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Directory the deck is saved into (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not show the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Read defaults from this config file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// The topic as one string.
    #[must_use]
    pub fn topic(&self) -> String {
        self.text.join(" ")
    }
}
