//! Command-line client for the HomeKrypto booking API.
//!
//! Quotes stays, submits bookings with the retrying submission policy, and
//! shows HKT market data and share ownership.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hk_client::ApiClient;
use homekrypto::WalletAddress;
use homekrypto::booking::models::{CalculatePriceRequest, CreateBookingRequest, Currency, PaymentMethod};
use homekrypto::property::PropertyId;
use pico_args::Arguments;
use serde::Serialize;

const HELP: &str = "\
HomeKrypto booking client

USAGE:
  hk_client <COMMAND> [OPTIONS]

COMMANDS:
  quote       Quote a stay
  book        Book a stay (retries transient failures with one idempotency key)
  stats       Show the latest HKT price record
  shares      Show the wallet's shares in a property

OPTIONS:
  --server URL          Server URL  [default: http://localhost:8080]
  --wallet ADDRESS      Wallet address sent as X-Wallet-Address
  --wallet-token JWT    Wallet session token  [default: env HK_WALLET_TOKEN]
  --property ID         Property id
  --check-in DATE       Check-in date (YYYY-MM-DD)
  --check-out DATE      Check-out date (YYYY-MM-DD)
  --guests N            Number of guests  [default: 1]
  --currency CUR        Quote currency, USD or HKT  [default: USD]
  --method METHOD       Payment method, card or hkt_transfer  [default: card]
  --source SOURCE       Card token or HKT transaction hash
  --email ADDRESS       Confirmation email
  --key KEY             Idempotency key  [default: random UUID]

FLAGS:
  -h, --help            Print help information
";

struct Args {
    command: String,
    server_url: String,
    wallet: Option<(WalletAddress, String)>,
    property_id: Option<PropertyId>,
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    guests: u32,
    currency: Currency,
    method: PaymentMethod,
    source: Option<String>,
    email: Option<String>,
    key: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let command = pargs
        .subcommand()?
        .context("Missing command, see --help")?;

    let wallet: Option<String> = pargs.opt_value_from_str("--wallet")?;
    let wallet = wallet
        .map(|raw| WalletAddress::parse(&raw))
        .transpose()
        .context("Invalid --wallet")?;
    let token: Option<String> = pargs
        .opt_value_from_str("--wallet-token")?
        .or_else(|| std::env::var("HK_WALLET_TOKEN").ok());
    let wallet = match (wallet, token) {
        (Some(wallet), Some(token)) => Some((wallet, token)),
        (Some(_), None) => anyhow::bail!("--wallet needs --wallet-token or HK_WALLET_TOKEN"),
        (None, _) => None,
    };

    let args = Args {
        command,
        server_url: pargs
            .opt_value_from_str("--server")?
            .unwrap_or_else(|| "http://localhost:8080".to_string()),
        wallet,
        property_id: pargs.opt_value_from_str("--property")?,
        check_in: pargs.opt_value_from_str("--check-in")?,
        check_out: pargs.opt_value_from_str("--check-out")?,
        guests: pargs.opt_value_from_str("--guests")?.unwrap_or(1),
        currency: pargs.opt_value_from_str("--currency")?.unwrap_or_default(),
        method: pargs
            .opt_value_from_str("--method")?
            .unwrap_or(PaymentMethod::Card),
        source: pargs.opt_value_from_str("--source")?,
        email: pargs.opt_value_from_str("--email")?,
        key: pargs.opt_value_from_str("--key")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}", remaining);
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let mut client = ApiClient::new(args.server_url.clone());
    if let Some((wallet, token)) = args.wallet.clone() {
        client = client.with_wallet(wallet, token);
    }

    match args.command.as_str() {
        "quote" => {
            let request = CalculatePriceRequest {
                property_id: require(args.property_id, "--property")?,
                check_in: require(args.check_in, "--check-in")?,
                check_out: require(args.check_out, "--check-out")?,
                guests: args.guests,
                currency: args.currency,
            };
            let quote = client
                .calculate_price(&request)
                .await
                .context("Failed to quote stay")?;
            print_json(&quote)
        }
        "book" => {
            let request = CreateBookingRequest {
                property_id: require(args.property_id, "--property")?,
                check_in: require(args.check_in, "--check-in")?,
                check_out: require(args.check_out, "--check-out")?,
                guests: args.guests,
                payment_source: require(args.source, "--source")?,
                guest_email: args.email,
                quoted_total_usd: None,
                idempotency_key: args.key,
            };
            let receipt = match args.method {
                PaymentMethod::Card => client.create_card_booking(request).await,
                PaymentMethod::HktTransfer => client.create_hkt_booking(request).await,
            }
            .context("Booking failed")?;

            if receipt.replayed {
                println!("Booking already recorded under this idempotency key.");
            }
            print_json(&receipt.booking)
        }
        "stats" => {
            let stats = client
                .hkt_stats()
                .await
                .context("Failed to fetch HKT stats")?;
            print_json(&stats)
        }
        "shares" => {
            if args.wallet.is_none() {
                anyhow::bail!("--wallet is required for shares");
            }
            let status = client
                .user_shares(require(args.property_id, "--property")?)
                .await
                .context("Failed to fetch shares")?;
            print_json(&status)
        }
        other => anyhow::bail!("Unknown command '{}', see --help", other),
    }
}

fn require<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.with_context(|| format!("{} is required", flag))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
