//! Coffee House CLI - a terminal storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse and fill the cart
//! coffee products
//! coffee cart add 3
//! coffee cart set 3 2
//! coffee cart show
//!
//! # Check out, paying by KHQR
//! coffee checkout -n "Dara" -p "012 345 6789" -a "St. 51, Phnom Penh" --payment khqr
//!
//! # Look up past orders
//! coffee orders -p "012 345 6789"
//! ```
//!
//! # Commands
//!
//! - `products` - List the catalog
//! - `cart` - Show or change the cart
//! - `checkout` - Place an order (interactive for KHQR)
//! - `orders` - List past orders for a phone number
//! - `language` - Show or set the interface language
//! - `login` / `logout` - Manage the session token

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coffee_house_core::{PaymentMethod, ProductId};
use coffee_house_storefront::config::StorefrontConfig;
use coffee_house_storefront::error::AppError;
use coffee_house_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "coffee")]
#[command(author, version, about = "Coffee House storefront")]
struct Cli {
    /// Backend API base URL (overrides `COFFEE_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<Url>,

    /// Directory for the local cart and settings (overrides `COFFEE_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the current cart
    Checkout(CheckoutArgs),
    /// List past orders for a phone number
    Orders {
        /// Phone number used at checkout
        #[arg(short, long)]
        phone: String,

        /// Email used at checkout
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Show or set the interface language (`en`, `km`)
    Language { code: Option<String> },
    /// Store a session token read from standard input
    Login,
    /// Forget the session token
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add one unit of a product
    Add { product_id: ProductId },
    /// Set a product's quantity (0 or less removes it)
    Set {
        product_id: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product
    Remove { product_id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(clap::Args)]
struct CheckoutArgs {
    /// Customer name
    #[arg(short, long)]
    name: String,

    /// Contact phone number
    #[arg(short, long)]
    phone: String,

    /// Contact email
    #[arg(short, long, default_value = "")]
    email: String,

    /// Delivery address
    #[arg(short, long)]
    address: String,

    /// Payment method (`cash`, `khqr`, `card`, `paypal`, `apple_pay`, `google_pay`)
    #[arg(long, default_value = "cash")]
    payment: PaymentMethod,

    /// Notes for the order
    #[arg(long)]
    notes: Option<String>,
}

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::App(e) => e.user_message(),
            Self::Io(e) => e.to_string(),
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Map tracing levels to Sentry events and breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "{e}");
            std::process::exit(2);
        }
    };
    if let Some(api_url) = cli.api_url.clone() {
        config.api_url = api_url;
    }
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coffee_house_storefront=warn,coffee_house_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli.command, config).await {
        if let CliError::App(app) = &e {
            app.capture();
        }
        tracing::debug!(error = %e, "Command failed");
        let _ = writeln!(std::io::stderr(), "{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: StorefrontConfig) -> Result<(), CliError> {
    let state = AppState::new(config)?;

    match command {
        Commands::Products => commands::cart::products(&state).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state)?,
            CartAction::Add { product_id } => commands::cart::add(&state, product_id).await?,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&state, product_id, quantity)?,
            CartAction::Remove { product_id } => commands::cart::remove(&state, product_id)?,
            CartAction::Clear => commands::cart::clear(&state)?,
        },
        Commands::Checkout(args) => {
            let details = commands::checkout::Details {
                name: args.name,
                phone: args.phone,
                email: args.email,
                address: args.address,
                payment: args.payment,
                notes: args.notes,
            };
            commands::checkout::run(&state, details).await?;
        }
        Commands::Orders { phone, email } => {
            commands::account::orders(&state, &phone, email.as_deref()).await?;
        }
        Commands::Language { code } => commands::account::language(&state, code.as_deref())?,
        Commands::Login => commands::account::login(&state).await?,
        Commands::Logout => commands::account::logout(&state)?,
    }
    Ok(())
}
