//! ShopMart CLI - Browse the store, keep a cart and wishlist, check out.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session is kept in SHOPMART_SESSION_FILE)
//! shopmart login -e mona@example.com -p secret1
//!
//! # Browse
//! shopmart products --page 2 --search shawl
//! shopmart brands
//!
//! # Cart and wishlist
//! shopmart cart add 6428ebc6dc1175abc65ca0b9
//! shopmart wishlist toggle 6428ebc6dc1175abc65ca0b9
//!
//! # Order
//! shopmart checkout --method cash --details "12 Tahrir St" --phone 01012345678 --city Cairo
//! shopmart orders
//! ```
//!
//! # Commands
//!
//! - `login`, `logout`, `register`, `whoami`, `password` - Account
//! - `products`, `product`, `categories`, `brands` - Catalog
//! - `cart`, `wishlist` - Synchronized shopper state
//! - `checkout`, `orders` - Ordering

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopmart_core::CheckoutMethod;
use shopmart_storefront::config::LogFormat;
use shopmart_storefront::services::Registration;
use shopmart_storefront::services::checkout::CITIES;
use shopmart_storefront::session::SessionError;
use shopmart_storefront::{Storefront, StorefrontConfig};

mod commands;
mod session_store;

use commands::CliError;
use session_store::{SessionStore, SessionStoreError};

#[derive(Parser)]
#[command(name = "shopmart")]
#[command(author, version, about = "ShopMart storefront from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Create an account
    Register {
        /// Display name (3-30 characters)
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (letters and digits, at least 6)
        #[arg(short, long)]
        password: String,

        /// Password again
        #[arg(short, long = "re-password")]
        re_password: String,

        /// Egyptian mobile number (01xxxxxxxxx)
        #[arg(long)]
        phone: String,
    },
    /// Show the signed-in shopper
    Whoami,
    /// Change or reset the password
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
    /// List products
    Products {
        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Only titles containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one product
    Product {
        /// Product ID
        id: String,
    },
    /// List categories, or one category's products
    Categories {
        /// Category ID
        id: Option<String>,
    },
    /// List brands, or one brand's products
    Brands {
        /// Brand ID
        id: Option<String>,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Order the cart
    Checkout {
        /// `cash` (pay on delivery) or `online` (hosted card payment)
        #[arg(short, long, default_value = "cash")]
        method: CheckoutMethod,

        /// Street address
        #[arg(long)]
        details: String,

        /// Egyptian mobile number (01xxxxxxxxx)
        #[arg(long)]
        phone: String,

        /// City
        #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(CITIES.iter().copied()))]
        city: String,
    },
    /// List past orders
    Orders,
}

#[derive(Subcommand)]
enum PasswordAction {
    /// Change the password (signs you out)
    Change {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,

        #[arg(long)]
        confirm: String,
    },
    /// Reset a forgotten password by email code
    Reset,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { product: String },
    /// Remove a product
    Remove { product: String },
    /// Set a product's quantity
    Qty {
        product: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show saved products
    Show,
    /// Save or unsave a product
    Toggle { product: String },
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

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopmart_storefront=info,shopmart_cli=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let cli = Cli::parse();

    if let Err(e) = run(cli, config).await {
        e.report();
        tracing::debug!(error = %e, "Command failed");
        if !e.already_notified() {
            eprintln!("Error: {}", e.user_message());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let store = SessionStore::new(&config.session_file);
    let storefront = Storefront::new(config)?;
    restore_session(&storefront, &store)?;

    let mut notifications = storefront.notifier().subscribe();
    let result = dispatch(cli.command, &storefront, &store).await;
    commands::print_notifications(&mut notifications);
    result
}

async fn dispatch(
    command: Commands,
    storefront: &Storefront,
    store: &SessionStore,
) -> Result<(), CliError> {
    match command {
        Commands::Login { email, password } => {
            commands::auth::login(storefront, store, &email, &password).await?;
        }
        Commands::Logout => commands::auth::logout(storefront, store)?,
        Commands::Register {
            name,
            email,
            password,
            re_password,
            phone,
        } => {
            let form = Registration {
                name,
                email,
                password,
                re_password,
                phone,
            };
            commands::auth::register(storefront, &form).await?;
        }
        Commands::Whoami => commands::auth::whoami(storefront),
        Commands::Password { action } => match action {
            PasswordAction::Change {
                current,
                new,
                confirm,
            } => {
                commands::auth::change_password(storefront, store, &current, &new, &confirm)
                    .await?;
            }
            PasswordAction::Reset => commands::auth::reset_password(storefront).await?,
        },
        Commands::Products { page, search } => {
            commands::catalog::products(storefront, page, search.as_deref()).await?;
        }
        Commands::Product { id } => commands::catalog::product(storefront, &id).await?,
        Commands::Categories { id } => {
            commands::catalog::categories(storefront, id.as_deref()).await?;
        }
        Commands::Brands { id } => commands::catalog::brands(storefront, id.as_deref()).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(storefront).await?,
            CartAction::Add { product } => commands::cart::add(storefront, &product).await?,
            CartAction::Remove { product } => commands::cart::remove(storefront, &product).await?,
            CartAction::Qty { product, quantity } => {
                commands::cart::quantity(storefront, &product, quantity).await?;
            }
            CartAction::Clear => commands::cart::clear(storefront).await?,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(storefront).await?,
            WishlistAction::Toggle { product } => {
                commands::wishlist::toggle(storefront, &product).await?;
            }
        },
        Commands::Checkout {
            method,
            details,
            phone,
            city,
        } => {
            commands::orders::checkout(storefront, method, &details, &phone, &city).await?;
        }
        Commands::Orders => commands::orders::history(storefront).await?,
    }
    Ok(())
}

/// Load the stored session into the signal. Expired or unreadable
/// credentials are discarded so the shopper is simply signed out.
fn restore_session(storefront: &Storefront, store: &SessionStore) -> Result<(), CliError> {
    let session = match store.load() {
        Ok(Some(session)) => session,
        Ok(None) => return Ok(()),
        Err(SessionStoreError::Session(e)) => {
            tracing::warn!(error = %e, "Discarding unreadable stored session");
            store.clear()?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let user_id = session.user().id.clone();
    let email = session.user().email.clone();
    match storefront.session().restore(session) {
        Ok(_) => {
            shopmart_storefront::error::set_sentry_user(&user_id, email.as_deref());
            tracing::debug!(user_id = %user_id, "Session restored");
        }
        Err(SessionError::Expired(at)) => {
            tracing::info!(expired_at = %at, "Stored session expired");
            store.clear()?;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unusable stored session");
            store.clear()?;
        }
    }
    Ok(())
}
