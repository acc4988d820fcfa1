use std::env;

use clap::{Parser, Subcommand};
use fetch::{DirectoryFetch, HttpFetch};
use tracing_subscriber::EnvFilter;

use catalog::SiteConfig;
use tools::{SiteFetch, check_site, inspect_model, list_projects};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect a drone survey site")]
struct Args {
    /// Site checkout on disk (default: $SURVEY_SITE_ROOT, else the current directory)
    #[arg(long, conflicts_with = "base_url")]
    root: Option<String>,

    /// Deployed site to query instead of a local checkout (default: $SURVEY_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the projects discovery finds
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Report missing metadata, thumbnails, models and overlay files
    Check,

    /// Load a project's model and print its size
    Model {
        /// Project folder name
        project: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn site_from_args(args: &Args) -> SiteFetch {
    if args.root.is_none() {
        let base_url = args
            .base_url
            .clone()
            .or_else(|| env::var("SURVEY_BASE_URL").ok());
        if let Some(url) = base_url {
            return SiteFetch::Http(HttpFetch::new(url));
        }
    }
    let root = args
        .root
        .clone()
        .or_else(|| env::var("SURVEY_SITE_ROOT").ok())
        .unwrap_or_else(|| ".".to_string());
    SiteFetch::Dir(DirectoryFetch::new(root))
}

/// `Ok(false)` when the command ran but found problems.
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let site = site_from_args(&args);
    let config = SiteConfig::load(&site).await;
    tracing::info!(site = site.describe(), "using site");

    match args.command {
        Command::List { json } => {
            let rows = list_projects(&site, &config).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!(
                        "{:<24} {:<40} {:<14} model={} layers={} annotations={} -> {}",
                        row.id,
                        row.title,
                        row.source,
                        if row.has_model { "yes" } else { "no" },
                        row.layers,
                        row.annotations,
                        row.target
                    );
                }
                eprintln!("{} project(s)", rows.len());
            }
            Ok(true)
        }
        Command::Check => {
            let reports = check_site(&site, &config).await;
            let mut clean = true;
            for report in &reports {
                if report.problems.is_empty() {
                    println!("{}: ok", report.id);
                }
                for problem in &report.problems {
                    clean = false;
                    println!("{}: {problem}", report.id);
                }
            }
            Ok(clean)
        }
        Command::Model { project } => {
            let summary = inspect_model(&site, &config, &project).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(true)
        }
    }
}
