use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use storekeep::Store;
use storekeep::domain::ports::event_channel;
use storekeep::error::BackendFailure;
use storekeep::infrastructure::in_memory::InMemoryBackend;
use storekeep::interfaces::csv::catalog_reader::CatalogReader;
use storekeep::interfaces::csv::receipt_writer::{OutputFormat, Receipt, ReceiptWriter};
use tracing_subscriber::EnvFilter;

/// Replays purchases and restores against a simulated store backend.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Product catalog CSV file (identifier, price, currency)
    catalog: PathBuf,

    /// Product identifier to purchase. Repeat to purchase several, in order.
    #[arg(long = "purchase", value_name = "ID")]
    purchases: Vec<String>,

    /// Restore completed purchases after the purchases have run.
    #[arg(long)]
    restore: bool,

    /// Simulate a device where payments are not allowed.
    #[arg(long)]
    closed: bool,

    /// Make purchases of this identifier fail at the backend.
    #[arg(long = "fail-purchase", value_name = "ID")]
    fail_purchases: Vec<String>,

    /// Make the restore fail at the backend.
    #[arg(long)]
    fail_restore: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let file = File::open(&cli.catalog).into_diagnostic()?;
    let mut catalog = Vec::new();
    for product in CatalogReader::new(file).products() {
        match product {
            Ok(product) => catalog.push(product),
            Err(e) => eprintln!("Error reading product: {}", e),
        }
    }

    let (sink, stream) = event_channel::<InMemoryBackend>();
    let backend = InMemoryBackend::new(catalog, sink);
    backend.set_can_make_payments(!cli.closed);
    for identifier in cli.fail_purchases {
        backend.fail_purchases(identifier, BackendFailure::new(2, "Payment cancelled"));
    }
    if cli.fail_restore {
        backend.fail_restore(BackendFailure::new(0, "Restore unavailable"));
    }

    let store = Store::new(backend);
    store.spawn_event_loop(stream);

    let mut receipts = Vec::new();
    for identifier in &cli.purchases {
        let result = store.purchase_product(identifier).await;
        receipts.push(Receipt::purchase(identifier.as_str(), &result));
    }
    if cli.restore {
        let result = store.restore_purchases().await;
        receipts.extend(Receipt::restore(&result));
    }

    let stdout = io::stdout();
    let mut writer = ReceiptWriter::new(stdout.lock(), cli.format);
    writer.write_receipts(&receipts).into_diagnostic()?;

    Ok(())
}
