//! HomeKrypto booking server.
//!
//! Serves the booking API and polls the HKT price in the background for the
//! lifetime of the process.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use hk_server::auth::{DEFAULT_SESSION_TTL_HOURS, WalletAuth};
use hk_server::{api, config::ServerConfig, logging, metrics, poller};
use homekrypto::booking::manager::BookingBackends;
use homekrypto::db::{
    Database, PgBookingRepository, PgPriceRepository, PgPropertyRepository, PriceRepository,
};
use homekrypto::notify::{LogNotifier, Notifier, WebhookNotifier};
use homekrypto::ownership::LedgerOwnershipOracle;
use homekrypto::payment::{DisabledPaymentGateway, HttpPaymentGateway, PaymentGateway};
use homekrypto::price_feed::{CoinGeckoProvider, DexScreenerProvider, PriceProvider};
use homekrypto::{BookingManager, PriceFeed, WalletAddress};
use pico_args::Arguments;
use std::time::Duration;

const HELP: &str = "\
Run the HomeKrypto booking server

USAGE:
  hk_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --issue-wallet-token ADDRESS
                           Print a wallet session token for ADDRESS and exit (local testing)

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  COINGECKO_TOKEN_ID       CoinGecko coin id of HKT
  HKT_TOKEN_ADDRESS        HKT contract address for DexScreener
  PAYMENT_GATEWAY_URL      Payment processor base URL
  WALLET_JWT_SECRET        Wallet session signing secret (shared with wallet login)
  EMAIL_WEBHOOK_URL        Email-delivery webhook
  METRICS_BIND             Prometheus scrape address
  (See .env.example for all configuration options)
";

/// Timeout for email webhook calls
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    issue_wallet_token: Option<WalletAddress>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        issue_wallet_token: pargs.opt_value_from_str("--issue-wallet-token")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    let wallet_auth = Arc::new(WalletAuth::new(&config.wallet_jwt_secret));
    if let Some(wallet) = args.issue_wallet_token {
        let token = wallet_auth
            .issue(&wallet, chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS))
            .context("Failed to sign wallet session token")?;
        println!("{token}");
        return Ok(());
    }

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!(%addr, "Prometheus metrics exporter listening");
    }

    tracing::info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected successfully");

    let pool = Arc::new(db.pool().clone());

    let price_repository: Arc<dyn PriceRepository> = Arc::new(PgPriceRepository::new(pool.clone()));
    let price_feed = Arc::new(
        PriceFeed::new(price_providers(&config)?).with_repository(price_repository),
    );
    match price_feed.restore().await {
        Ok(Some(snapshot)) => tracing::info!(
            price = snapshot.price,
            source = %snapshot.source,
            last_updated = %snapshot.last_updated,
            "Restored last HKT price"
        ),
        Ok(None) => tracing::info!("No stored HKT price, waiting for first poll"),
        Err(e) => tracing::warn!(error = %e, "Failed to restore stored HKT price"),
    }

    let payments: Arc<dyn PaymentGateway> = match &config.payment.gateway_url {
        Some(url) => Arc::new(HttpPaymentGateway::new(
            url.clone(),
            config.payment.api_key.clone(),
            Duration::from_secs(config.payment.timeout_secs),
        )?),
        None => {
            tracing::warn!("PAYMENT_GATEWAY_URL not set, bookings will be refused");
            Arc::new(DisabledPaymentGateway)
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.email_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), NOTIFY_TIMEOUT)?),
        None => Arc::new(LogNotifier),
    };

    let booking_manager = Arc::new(BookingManager::new(
        BookingBackends {
            properties: Arc::new(PgPropertyRepository::new(pool.clone())),
            bookings: Arc::new(PgBookingRepository::new(pool.clone())),
            ownership: Arc::new(LedgerOwnershipOracle::new(pool.clone())),
            payments,
            notifier,
            price_feed: price_feed.clone(),
        },
        config.booking.policy(),
    ));

    let poller = poller::spawn(price_feed.clone(), config.price_feed.poll_interval());

    let app = api::create_router(api::AppState {
        booking_manager,
        price_feed,
        database: Some(db.clone()),
        wallet_auth,
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down server...");
    poller.abort();
    db.close().await;

    Ok(())
}

/// Configured price providers in priority order
fn price_providers(config: &ServerConfig) -> Result<Vec<Arc<dyn PriceProvider>>, Error> {
    let feed = &config.price_feed;
    let mut providers: Vec<Arc<dyn PriceProvider>> = Vec::new();

    if let Some(token_id) = &feed.coingecko_token_id {
        providers.push(Arc::new(CoinGeckoProvider::new(
            feed.coingecko_api_url.clone(),
            token_id.clone(),
            feed.request_timeout(),
        )?));
    }

    if let Some(address) = &feed.token_address {
        providers.push(Arc::new(DexScreenerProvider::new(
            feed.dexscreener_api_url.clone(),
            address.clone(),
            feed.request_timeout(),
        )?));
    }

    Ok(providers)
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutting down");
    }
}
