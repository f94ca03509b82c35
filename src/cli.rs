//! Command-line surface of the `storefront` binary.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use crate::app_system::{CheckoutError, StorefrontSystem};
use crate::catalog::{CatalogQuery, PriceSort};
use crate::clients::CheckoutReceipt;
use crate::domain::{Category, DeliveryAssignment, DeliveryPersonnel, Order, PaymentMethod};
use crate::order_actor::OrderError;

/// Storefront state engine: catalog, cart, checkout and order tracking.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "storefront.toml", env = "STOREFRONT_CONFIG")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Browse the catalog by section
    Catalog {
        /// Case-insensitive product name filter
        #[arg(short, long)]
        search: Option<String>,
        /// Only show one section (material, machine, worker)
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        min_rating: Option<f64>,
        #[arg(long, value_enum, default_value_t = SortArg::Default)]
        sort: SortArg,
    },
    /// Add catalog products to the cart
    Add {
        #[arg(required = true)]
        product_ids: Vec<u64>,
    },
    /// Show the cart and its total
    Cart,
    /// Remove every cart line of a product
    Remove { product_id: u64 },
    /// Empty the cart
    Clear,
    /// Turn the cart into orders
    Checkout {
        /// COD, UPI, NEFT or BankTransfer
        #[arg(short, long)]
        payment: PaymentMethod,
        /// Follow the order until it is delivered
        #[arg(short, long)]
        wait: bool,
    },
    /// List all orders
    Orders,
    /// Rate a delivered order from 1 to 5 stars
    Rate { order_id: String, rating: u8 },
    /// Show tracking details of an order
    Track { order_id: String },
    /// Show the delivery contact of an order
    Contact { order_id: String },
    /// Attach tracking and courier details to an order
    Assign {
        order_id: String,
        #[arg(long)]
        tracking_id: Option<String>,
        #[arg(long)]
        tracking_url: Option<String>,
        #[arg(long, requires = "courier_phone")]
        courier_name: Option<String>,
        #[arg(long, requires = "courier_name")]
        courier_phone: Option<String>,
    },
    /// Import a browser local-storage dump
    Import { dump: PathBuf },
    /// Run the end-to-end storefront scenario against the current stores
    Demo,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Default,
    LowToHigh,
    HighToLow,
}

impl From<SortArg> for PriceSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Default => PriceSort::Default,
            SortArg::LowToHigh => PriceSort::LowToHigh,
            SortArg::HighToLow => PriceSort::HighToLow,
        }
    }
}

pub async fn run(command: Command, system: &StorefrontSystem) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Catalog {
            search,
            category,
            min_rating,
            sort,
        } => {
            let query = CatalogQuery {
                search,
                category,
                min_rating,
                sort: sort.into(),
            };
            for (category, products) in system.catalog_client.browse(&query).sections() {
                if products.is_empty() {
                    continue;
                }
                println!("[{}]", category);
                for product in products {
                    println!(
                        "  #{:<4} {:<20} {:>12.2}  {:.1}*  {}",
                        product.id, product.name, product.price, product.rating, product.description
                    );
                }
            }
        }
        Command::Add { product_ids } => {
            for id in product_ids {
                let product = system.catalog_client.product(id)?;
                let name = product.name.clone();
                system.cart_client.add_to_cart(product).await?;
                println!("{} added to cart", name);
            }
        }
        Command::Cart => print_cart(system).await?,
        Command::Remove { product_id } => {
            let removed = system.cart_client.remove_product(product_id).await?;
            println!("Removed {} line(s)", removed);
        }
        Command::Clear => {
            let removed = system.cart_client.clear().await?;
            println!("Removed {} line(s)", removed);
        }
        Command::Checkout { payment, wait } => {
            let receipt = match system.order_client.checkout(payment).await {
                Ok(receipt) => receipt,
                Err(e @ CheckoutError::CodLimitExceeded { .. }) => {
                    println!("{}. Please choose another payment method.", e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            follow(receipt, wait).await;
        }
        Command::Orders => print_orders(&system.order_client.list_orders().await?),
        Command::Rate { order_id, rating } => {
            let order = system.order_client.rate_order(order_id, rating).await?;
            println!("Rated {} with {} star(s)", order.product_name, order.rating);
        }
        Command::Track { order_id } => {
            println!("{}", system.order_client.track_order(order_id).await?);
        }
        Command::Contact { order_id } => match system.order_client.contact_delivery(order_id).await {
            Ok(personnel) => println!("{}: {}", personnel.name, personnel.phone),
            Err(e @ OrderError::DeliveryContactUnavailable(_)) => println!("{}", e),
            Err(e) => return Err(e.into()),
        },
        Command::Assign {
            order_id,
            tracking_id,
            tracking_url,
            courier_name,
            courier_phone,
        } => {
            let delivery_personnel = courier_name
                .zip(courier_phone)
                .map(|(name, phone)| DeliveryPersonnel { name, phone });
            let assignment = DeliveryAssignment {
                tracking_id,
                tracking_url,
                delivery_personnel,
            };
            let order = system.order_client.assign_delivery(order_id, assignment).await?;
            println!("{}", order.tracking_info());
        }
        Command::Import { dump } => {
            let text = tokio::fs::read_to_string(&dump).await?;
            let summary = crate::legacy::import_dump(&text, &system.cart_client, &system.order_client).await?;
            println!(
                "Imported {} cart line(s) and {} order(s); {} duplicate order(s), {} unreadable record(s) skipped",
                summary.cart_entries, summary.orders, summary.duplicate_orders, summary.skipped
            );
        }
        Command::Demo => demo(system).await?,
    }
    Ok(())
}

async fn print_cart(system: &StorefrontSystem) -> Result<(), Box<dyn Error>> {
    let entries = system.cart_client.list_entries().await?;
    if entries.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }
    for entry in &entries {
        println!("  {:<8} {:<20} {:>12.2}", entry.line_id, entry.product.name, entry.product.price);
    }
    println!("Total: {:.2}", system.cart_client.total().await?);
    Ok(())
}

fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet");
    }
    for order in orders {
        let rating = if order.is_rated() {
            format!("{}*", order.rating)
        } else {
            "-".to_string()
        };
        println!(
            "  {:<24} {:<20} x{:<3} {:<18} {}",
            order.id, order.product_name, order.quantity, order.status_text(), rating
        );
    }
}

async fn follow(receipt: CheckoutReceipt, wait: bool) {
    println!(
        "Order placed successfully! Payment method: {} ({} order(s), total {:.2})",
        receipt.payment_method,
        receipt.order_ids.len(),
        receipt.total
    );
    if !wait {
        return;
    }

    let mut updates = receipt.fulfillment.subscribe();
    while updates.changed().await.is_ok() {
        let update = updates.borrow_and_update().clone();
        println!("{}", update.message);
        if update.status.is_terminal() {
            break;
        }
    }
}

/// Buys a bag of cement with cash on delivery, follows it to the door, rates
/// it, then shows that an excavator is too expensive for cash on delivery.
async fn demo(system: &StorefrontSystem) -> Result<(), Box<dyn Error>> {
    let cart = &system.cart_client;
    let orders = &system.order_client;

    let cement = system.catalog_client.product(1)?;
    cart.add_to_cart(cement).await?;
    print_cart(system).await?;

    let receipt = orders.checkout(PaymentMethod::CashOnDelivery).await?;
    let order_id = receipt.latest_order.id.clone();
    follow(receipt, true).await;

    let rated = orders.rate_order(order_id, 4).await?;
    info!(order_id = %rated.id, rating = rated.rating, "Demo order rated");

    let excavator = system.catalog_client.product(5)?;
    cart.add_to_cart(excavator).await?;
    match orders.checkout(PaymentMethod::CashOnDelivery).await {
        Err(e @ CheckoutError::CodLimitExceeded { .. }) => println!("{}", e),
        Err(e) => return Err(e.into()),
        Ok(_) => warn!("Cash on delivery limit was not applied"),
    }
    cart.remove_product(5).await?;

    print_orders(&orders.list_orders().await?);
    Ok(())
}
