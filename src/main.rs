use anyhow::Result;
use brickprice::core::filter::ViewState;
use brickprice::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display exchange rates into the base currency
    Rates,
    /// Render the price dashboard once
    Show {
        /// Deselect a set by name (repeatable)
        #[arg(long = "hide-item", value_name = "NAME")]
        hide_items: Vec<String>,

        /// Deselect a website by name (repeatable)
        #[arg(long = "hide-source", value_name = "NAME")]
        hide_sources: Vec<String>,

        /// Minimum price in the base currency
        #[arg(long)]
        min_price: Option<f64>,

        /// Maximum price in the base currency
        #[arg(long)]
        max_price: Option<f64>,

        /// Skip the pictures section
        #[arg(long)]
        no_images: bool,
    },
    /// Explore the dashboard, re-rendering after every command
    Interactive,
}

impl From<Commands> for brickprice::AppCommand {
    fn from(cmd: Commands) -> brickprice::AppCommand {
        match cmd {
            Commands::Rates => brickprice::AppCommand::Rates,
            Commands::Show {
                hide_items,
                hide_sources,
                min_price,
                max_price,
                no_images,
            } => brickprice::AppCommand::Show(brickprice::ShowOptions {
                view: ViewState {
                    hidden_items: hide_items.into_iter().collect(),
                    hidden_sources: hide_sources.into_iter().collect(),
                    min_price,
                    max_price,
                },
                show_images: !no_images,
            }),
            Commands::Interactive => brickprice::AppCommand::Interactive,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => brickprice::cli::setup::setup(),
        Some(cmd) => brickprice::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
