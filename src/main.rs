use clap::{Parser, Subcommand};

use ad_tracker::resolve::{self, HttpFetcher, VastFetcher, DEFAULT_MAX_WRAPPER_DEPTH};
use ad_tracker::parser;

/// VAST ad parser and wrapper resolver
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a VAST file or URL
    Parse {
        /// Path to the VAST file or URL
        #[arg(short, long)]
        input: String,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Resolve wrapper ads in a VAST file or URL down to inline ads
    Resolve {
        /// Path to the VAST file or URL
        #[arg(short, long)]
        input: String,

        /// Maximum wrapper chain depth to follow
        #[arg(short, long, default_value_t = DEFAULT_MAX_WRAPPER_DEPTH)]
        max_depth: usize,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let fetcher = HttpFetcher::new()?;

    match &cli.command {
        Commands::Parse { input, pretty } => {
            let content = fetcher.fetch(input).await?;

            let Some(vast) = parser::parse(&content) else {
                eprintln!("Input is not a parseable VAST document");
                std::process::exit(1);
            };

            if *pretty {
                println!("{vast:#?}");
            } else {
                println!("{vast:?}");
            }
        }
        Commands::Resolve {
            input,
            max_depth,
            pretty,
        } => {
            let content = fetcher.fetch(input).await?;

            let Some(vast) = parser::parse(&content) else {
                eprintln!("Input is not a parseable VAST document");
                std::process::exit(1);
            };

            let resolved = resolve::resolve_wrappers(vast, &fetcher, *max_depth).await;

            if *pretty {
                println!("{resolved:#?}");
            } else {
                println!("{resolved:?}");
            }
        }
    }

    Ok(())
}
