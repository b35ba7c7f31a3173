mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "liebig",
    version,
    about = "Nutrient sufficiency analysis and fertilizer blend recommendations"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a request and recommend a product blend
    Recommend {
        /// Path to the JSON request
        request: PathBuf,

        /// Product list to use instead of the one in the request
        #[arg(long, value_name = "FILE")]
        products: Option<PathBuf>,

        /// Custom nutrient catalog (default: built-in)
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// How a multi-record batch is reduced to one snapshot
        #[arg(long, value_parser = ["first", "most-recent", "average"])]
        policy: Option<String>,

        /// Retry with at-least constraints when no exact blend exists
        #[arg(long)]
        relaxed: bool,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Save the report as JSON into this directory
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,

        /// Print the decision trace after the report (text output)
        #[arg(long)]
        trace: bool,
    },
    /// Estimate coefficients of variation from a history file
    Cv {
        /// JSON array of records
        history: PathBuf,

        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        #[arg(short, long, default_value = "text")]
        output: String,
    },
    /// List the nutrients of a catalog
    Nutrients {
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },
    /// Inspect product lists
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Mark a stored report as applied in the field
    MarkApplied {
        /// Report key printed when it was stored
        key: String,

        #[arg(long, value_name = "DIR")]
        store: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// Validate a product list
    Validate {
        /// Path to JSON product list
        file: PathBuf,

        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Recommend {
            request,
            products,
            catalog,
            policy,
            relaxed,
            output,
            store,
            trace,
        } => commands::recommend::run(commands::recommend::Args {
            request,
            products,
            catalog,
            policy,
            relaxed,
            output,
            store,
            trace,
        }),
        Commands::Cv {
            history,
            catalog,
            output,
        } => commands::cv::run(&history, catalog.as_deref(), &output),
        Commands::Nutrients { catalog } => commands::nutrients::list(catalog.as_deref()),
        Commands::Products { action } => match action {
            ProductsAction::Validate { file, catalog } => {
                commands::products::validate(&file, catalog.as_deref())
            }
        },
        Commands::MarkApplied { key, store } => commands::recommend::mark_applied(&key, &store),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
