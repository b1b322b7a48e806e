//! Purchase Feed CLI - browse and edit purchase orders from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Print the first page
//! po-feed list
//!
//! # Print the page after cursor 20, ten orders
//! po-feed list --cursor 20 --limit 10
//!
//! # Print one order
//! po-feed show 42
//!
//! # Scroll a 600px viewport down to 4000px in 250px steps
//! po-feed browse --viewport 600 --to 4000 --step 250
//!
//! # Create an order
//! po-feed create --item-name "Hex bolts" --order-date 2024-05-01 \
//!     --delivery-date 2024-05-08 --quantity 200 --unit-price 0.15
//!
//! # Delete an order
//! po-feed delete 42
//! ```
//!
//! # Environment Variables
//!
//! See `purchase_feed::config` for the `PURCHASE_FEED_*` variables. `RUST_LOG`
//! overrides the default log filter.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use purchase_feed_core::{Cursor, OrderId};
use rust_decimal::Decimal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "po-feed")]
#[command(author, version, about = "Purchase-order feed tools")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of orders
    List {
        /// Cursor returned by a previous page
        #[arg(short, long)]
        cursor: Option<String>,

        /// Orders per page (defaults to `PURCHASE_FEED_PAGE_SIZE`)
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Print a single order
    Show {
        /// Order id
        id: OrderId,
    },
    /// Simulate scrolling through the feed
    Browse {
        /// Viewport extent in pixels
        #[arg(long, default_value_t = 600.0)]
        viewport: f64,

        /// Final scroll offset in pixels
        #[arg(long)]
        to: f64,

        /// Scroll distance per step in pixels
        #[arg(long, default_value_t = 200.0)]
        step: f64,
    },
    /// Create an order
    Create {
        #[arg(long)]
        item_name: String,

        /// Order date (YYYY-MM-DD)
        #[arg(long)]
        order_date: NaiveDate,

        /// Delivery date (YYYY-MM-DD)
        #[arg(long)]
        delivery_date: NaiveDate,

        #[arg(long)]
        quantity: u32,

        #[arg(long)]
        unit_price: Decimal,
    },
    /// Delete an order
    Delete {
        /// Order id
        id: OrderId,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Defaults to info level for the feed if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "purchase_feed=info,po_feed=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = run(cli.command).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), commands::CliError> {
    match command {
        Commands::List { cursor, limit } => {
            commands::orders::list(cursor.map(Cursor::new), limit).await?;
        }
        Commands::Show { id } => commands::orders::show(id).await?,
        Commands::Browse { viewport, to, step } => {
            commands::browse::run(viewport, to, step).await?;
        }
        Commands::Create {
            item_name,
            order_date,
            delivery_date,
            quantity,
            unit_price,
        } => {
            let draft = purchase_feed_core::NewPurchaseOrder {
                item_name,
                order_date,
                delivery_date,
                quantity,
                unit_price,
            };
            commands::orders::create(draft).await?;
        }
        Commands::Delete { id } => commands::orders::delete(id).await?,
    }
    Ok(())
}
