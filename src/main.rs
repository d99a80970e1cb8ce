use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use payment_status::application::resolver::PaymentStatusResolver;
use payment_status::application::watch::{Watch, WatchOutcome};
use payment_status::config::AppConfig;
use payment_status::domain::delivery::{GeoPoint, haversine_km};
use payment_status::domain::ports::{ReferenceHandoffBox, SharedPaymentLookup};
use payment_status::error::StatusError;
use payment_status::infrastructure::file_handoff::FileHandoff;
use payment_status::infrastructure::in_memory::{InMemoryHandoff, InMemoryPaymentLookup};
use payment_status::interfaces::arrival::{Arrival, ArrivalQuery};
use payment_status::interfaces::csv::record_reader::RecordReader;
use payment_status::interfaces::csv::tick_writer::TickWriter;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the settlement state once and print it
    Resolve {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        refs: ReferenceArgs,
    },
    /// Poll until the payment settles or the attempt budget runs out
    Watch {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        refs: ReferenceArgs,
        /// Milliseconds between polls
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Polls before giving up
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Milliseconds to wait before falling back when no reference is known
        #[arg(long)]
        grace_period_ms: Option<u64>,
    },
    /// Quote a delivery fee between two `lat,lon` points
    Fee {
        #[arg(long)]
        from: GeoPoint,
        #[arg(long)]
        to: GeoPoint,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Status records CSV (origin, reference, status, amount, currency)
    #[arg(long)]
    records: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[derive(Args)]
struct ReferenceArgs {
    /// Payment reference issued by the processor
    #[arg(long)]
    payment_id: Option<String>,

    /// Order reference
    #[arg(long)]
    order_id: Option<String>,

    /// Arrival query string, e.g. "paymentId=pay_1&orderId=ord_1"
    #[arg(long)]
    query: Option<String>,

    /// JSON file used as the one-shot reference handoff
    #[arg(long)]
    handoff_file: Option<PathBuf>,
}

impl ReferenceArgs {
    fn arrival_query(&self) -> ArrivalQuery {
        let mut query = self
            .query
            .as_deref()
            .map(ArrivalQuery::parse)
            .unwrap_or_default();
        if let Some(payment_id) = &self.payment_id {
            query.payment_id = Some(payment_id.clone());
        }
        if let Some(order_id) = &self.order_id {
            query.order_id = Some(order_id.clone());
        }
        query
    }

    fn handoff(&self) -> ReferenceHandoffBox {
        match &self.handoff_file {
            Some(path) => Box::new(FileHandoff::new(path)),
            None => Box::new(InMemoryHandoff::new()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path).into_diagnostic()?,
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Resolve { source, refs } => {
            let resolver = PaymentStatusResolver::new(build_lookup(&source).await?);
            let handoff = refs.handoff();
            let arrival = Arrival::recover(
                &refs.arrival_query(),
                handoff.as_ref(),
                config.arrival.grace_period(),
            )
            .await;
            let Arrival::Resolve(pair) = arrival else {
                return Err(StatusError::InvalidReference).into_diagnostic();
            };

            let resolution = resolver.resolve(&pair).await.into_diagnostic()?;
            match &resolution.record {
                Some(record) => info!(origin = %record.origin, raw = %record.status, "resolved"),
                None => info!(references = %pair, "no record yet"),
            }
            println!("{}", resolution.state);
        }
        Command::Watch {
            source,
            refs,
            interval_ms,
            max_attempts,
            grace_period_ms,
        } => {
            let mut watch_config = config.watch;
            if let Some(interval_ms) = interval_ms {
                watch_config.interval_ms = interval_ms;
            }
            if let Some(max_attempts) = max_attempts {
                watch_config.max_attempts = max_attempts;
            }
            let mut arrival_config = config.arrival;
            if let Some(grace_period_ms) = grace_period_ms {
                arrival_config.grace_period_ms = grace_period_ms;
            }

            let resolver = PaymentStatusResolver::new(build_lookup(&source).await?);
            let handoff = refs.handoff();
            let arrival = Arrival::recover(
                &refs.arrival_query(),
                handoff.as_ref(),
                arrival_config.grace_period(),
            )
            .await;

            let pair = match arrival {
                Arrival::Resolve(pair) => pair,
                Arrival::Fallback { after } => {
                    tokio::time::sleep(after).await;
                    println!("No payment to check, returning to orders");
                    return Ok(());
                }
            };

            let mut watch = Watch::new(resolver, pair, watch_config)
                .into_diagnostic()?
                .on_terminal(|state| info!(%state, "watch reached a terminal state"));

            let stop = watch.stop_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, stopping watch");
                    stop.stop();
                }
            });

            let mut writer = TickWriter::new(io::stdout());
            while let Some(tick) = watch.next().await {
                writer.write_tick(tick).into_diagnostic()?;
            }

            match watch.outcome() {
                Some(WatchOutcome::Settled(state)) => eprintln!("Payment {state}"),
                Some(WatchOutcome::TimedOut { attempts }) => eprintln!(
                    "Payment not confirmed after {attempts} attempts. Refresh or check your orders."
                ),
                Some(WatchOutcome::Cancelled) | None => eprintln!("Watch cancelled"),
            }
        }
        Command::Fee { from, to } => {
            let km = haversine_km(from, to);
            let fee = config.delivery.quote(from, to).into_diagnostic()?;
            println!("distance_km,fee");
            println!("{km:.2},{fee}");
        }
    }

    Ok(())
}

async fn build_lookup(source: &SourceArgs) -> Result<SharedPaymentLookup> {
    if let Some(db_path) = &source.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            use payment_status::infrastructure::rocksdb::RocksDbPaymentLookup;

            let lookup = RocksDbPaymentLookup::open(db_path).into_diagnostic()?;
            if let Some(records) = &source.records {
                let file = File::open(records).into_diagnostic()?;
                for row in RecordReader::new(file).rows() {
                    match row {
                        Ok(row) => {
                            let (reference, record) = row.into_record();
                            lookup.put(&reference, &record).into_diagnostic()?;
                        }
                        Err(e) => warn!(error = %e, "skipping malformed status row"),
                    }
                }
            }
            return Ok(Arc::new(lookup));
        }

        #[cfg(not(feature = "storage-rocksdb"))]
        warn!(
            path = %db_path.display(),
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature \
             is not enabled. Falling back to In-Memory storage."
        );
    }

    let lookup = InMemoryPaymentLookup::new();
    if let Some(records) = &source.records {
        let file = File::open(records).into_diagnostic()?;
        let loaded = RecordReader::new(file).load_into(&lookup).await;
        info!(loaded, path = %records.display(), "loaded status records");
    }
    Ok(Arc::new(lookup))
}
