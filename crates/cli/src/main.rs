//! Stockroom CLI - shop operations, database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema and load demo data
//! stockroom migrate
//! stockroom seed
//!
//! # Browse the catalog
//! stockroom product list --search phone
//!
//! # Fill a cart and check out
//! stockroom cart add --user 2 --product 1
//! stockroom checkout --user 2
//!
//! # Rename a product without touching its price or stock
//! stockroom product edit 1 --name "Pixel 9"
//!
//! # Move an order through fulfillment
//! stockroom order status 1 assembling
//! ```
//!
//! Results are printed to stdout as JSON. Logs go to stderr.
//!
//! # Environment Variables
//!
//! - `STOCKROOM_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)
//! - `STOCKROOM_STATUS_POLICY` - `permissive` (default) or `forward-only`
//! - `STOCKROOM_LOG_FORMAT` - `text` (default) or `json`
//! - `RUST_LOG` - Log filter (default: `stockroom_shop=info,stockroom_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stockroom_core::{CategoryId, OrderId, OrderStatus, Price, ProductId, UserId};
use stockroom_shop::{LogFormat, Shop, ShopConfig};

mod commands;

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(author, version, about = "Stockroom shop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert demo categories, users and products into an empty database
    Seed,
    /// Browse and manage products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage product categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Change a user's cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Turn a user's cart into an order
    Checkout {
        #[arg(short, long)]
        user: UserId,
    },
    /// Review orders and change their status
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products, optionally filtered
    List {
        /// Only products in this category
        #[arg(short, long)]
        category: Option<CategoryId>,
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one product
    Show { id: ProductId },
    /// Add a product to the catalog
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        price: Price,
        #[arg(short, long, default_value_t = 0)]
        stock: i32,
        #[arg(short, long)]
        category: Option<CategoryId>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Change a product's name, description, image or category
    Edit {
        id: ProductId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(short, long, conflicts_with = "uncategorize")]
        category: Option<CategoryId>,
        /// Remove the product from its category
        #[arg(long)]
        uncategorize: bool,
    },
    /// Remove a product that no order references
    Delete { id: ProductId },
    /// Change a product's price
    Price { id: ProductId, price: Price },
    /// Add stock to a product
    Restock { id: ProductId, amount: i32 },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// List categories
    List,
    /// Create a category
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a category; its products become uncategorized
    Delete { id: CategoryId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add one unit of a product
    Add {
        #[arg(short, long)]
        user: UserId,
        #[arg(short, long)]
        product: ProductId,
    },
    /// Increase an existing line by one
    Inc {
        #[arg(short, long)]
        user: UserId,
        #[arg(short, long)]
        product: ProductId,
    },
    /// Decrease an existing line by one (never below 1)
    Dec {
        #[arg(short, long)]
        user: UserId,
        #[arg(short, long)]
        product: ProductId,
    },
    /// Remove a line
    Remove {
        #[arg(short, long)]
        user: UserId,
        #[arg(short, long)]
        product: ProductId,
    },
    /// Show the cart with current prices
    List {
        #[arg(short, long)]
        user: UserId,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show one order with its lines and purchaser
    Show { id: OrderId },
    /// A user's orders, most recent first
    History {
        #[arg(short, long)]
        user: UserId,
    },
    /// Set an order's status (`new`, `assembling`, `completed`)
    Status { id: OrderId, status: OrderStatus },
    /// All orders, most recent first
    List {
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Order count and revenue per UTC day range (defaults to today)
    Summary {
        /// First day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stockroom_shop=info,stockroom_cli=info".into());

    let is_json = format == LogFormat::Json;
    let json_layer = is_json.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!is_json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = ShopConfig::from_env();
    init_tracing(config.as_ref().map_or(LogFormat::default(), |c| c.log_format));

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ShopConfig) -> commands::CommandResult {
    let shop = Shop::connect(config).await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&shop).await?,
        Commands::Seed => commands::seed::run(&shop).await?,
        Commands::Product { action } => match action {
            ProductAction::List { category, search } => {
                commands::catalog::list_products(&shop, category, search).await?;
            }
            ProductAction::Show { id } => commands::catalog::show_product(&shop, id).await?,
            ProductAction::Add {
                name,
                price,
                stock,
                category,
                description,
                image_url,
            } => {
                commands::catalog::add_product(
                    &shop,
                    commands::catalog::ProductInput {
                        name,
                        price,
                        stock,
                        category,
                        description,
                        image_url,
                    },
                )
                .await?;
            }
            ProductAction::Edit {
                id,
                name,
                description,
                image_url,
                category,
                uncategorize,
            } => {
                let category = if uncategorize { Some(None) } else { category.map(Some) };
                commands::catalog::edit_product(
                    &shop,
                    id,
                    commands::catalog::ProductEdit {
                        name,
                        description,
                        image_url,
                        category,
                    },
                )
                .await?;
            }
            ProductAction::Delete { id } => commands::catalog::delete_product(&shop, id).await?,
            ProductAction::Price { id, price } => {
                commands::catalog::set_price(&shop, id, price).await?;
            }
            ProductAction::Restock { id, amount } => {
                commands::catalog::restock(&shop, id, amount).await?;
            }
        },
        Commands::Category { action } => match action {
            CategoryAction::List => commands::catalog::list_categories(&shop).await?,
            CategoryAction::Add { name, description } => {
                commands::catalog::add_category(&shop, &name, description.as_deref()).await?;
            }
            CategoryAction::Delete { id } => commands::catalog::delete_category(&shop, id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Add { user, product } => commands::cart::add(&shop, user, product).await?,
            CartAction::Inc { user, product } => {
                commands::cart::increment(&shop, user, product).await?;
            }
            CartAction::Dec { user, product } => {
                commands::cart::decrement(&shop, user, product).await?;
            }
            CartAction::Remove { user, product } => {
                commands::cart::remove(&shop, user, product).await?;
            }
            CartAction::List { user } => commands::cart::list(&shop, user).await?,
        },
        Commands::Checkout { user } => commands::orders::checkout(&shop, user).await?,
        Commands::Order { action } => match action {
            OrderAction::Show { id } => commands::orders::show(&shop, id).await?,
            OrderAction::History { user } => commands::orders::history(&shop, user).await?,
            OrderAction::Status { id, status } => {
                commands::orders::set_status(&shop, id, status).await?;
            }
            OrderAction::List { status } => commands::orders::list(&shop, status).await?,
            OrderAction::Summary { from, to } => {
                commands::orders::summary(&shop, from, to).await?;
            }
        },
    }
    Ok(())
}
