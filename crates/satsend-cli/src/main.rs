//! Command-line front end for the send-flow engine
//!
//! Shows the live fee schedule, interprets payment URIs and quotes a
//! payment (amounts, fee, confirmation estimate, checks) for an address or
//! xpub. Nothing is signed or broadcast.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use satsend_core::{
    get_coins, is_valid_address, parse_scan, FeePolicy, HdAccount, ItemAccount, LegacyAddress,
    PendingTransaction, SpendValidator, TransactionAmounts, TransactionCalculator,
    TransactionRequest,
};
use satsend_params::Network;
use satsend_service::{BlockchainApiClient, DynamicFeeCache, ServiceConfig, UnspentApi};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "satsend")]
#[command(about = "Bitcoin send-flow fee and coin-selection tool", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dynamic fee schedule
    Fees,

    /// Interpret a scanned address or payment URI
    ParseUri {
        /// Address or `bitcoin:` URI
        data: String,
    },

    /// Quote a payment without sending it
    Quote(QuoteArgs),
}

#[derive(Args)]
struct QuoteArgs {
    /// Sending address or xpub
    #[arg(long)]
    from: String,

    /// Receiving address
    #[arg(long)]
    to: Option<String>,

    /// Amount in the configured unit
    #[arg(long, required_unless_present = "spend_all")]
    amount: Option<String>,

    /// Custom absolute fee in the configured unit
    #[arg(long)]
    fee: Option<String>,

    /// Send the maximum available amount
    #[arg(long, conflicts_with = "amount")]
    spend_all: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    match cli.command {
        Commands::Fees => run_fees(&config).await?,
        Commands::ParseUri { data } => run_parse_uri(&config, &data)?,
        Commands::Quote(args) => run_quote(&config, args).await?,
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn api_client(config: &ServiceConfig) -> anyhow::Result<BlockchainApiClient> {
    BlockchainApiClient::new(
        &config.api_base_url,
        &config.fee_api_url,
        config.request_timeout(),
    )
    .context("building HTTP client")
}

async fn run_fees(config: &ServiceConfig) -> anyhow::Result<()> {
    let client = api_client(config)?;
    let cache = DynamicFeeCache::new(&config.relay_policy());
    let fee = cache.refresh(&client).await;
    let minutes_per_block = config.consensus().minutes_per_block();

    println!("Default rate: {} sat/kB", fee.default_fee_per_kb);
    if fee.is_surge {
        println!("Fee surge in progress");
    }
    for (i, estimate) in fee.estimates.iter().enumerate() {
        let blocks = i as u64 + 1;
        println!(
            "  {} block(s) (~{} min): {} sat/kB{}",
            blocks,
            blocks * minutes_per_block,
            estimate.fee_per_kb,
            if estimate.surge { " (surge)" } else { "" }
        );
    }
    Ok(())
}

fn run_parse_uri(config: &ServiceConfig, data: &str) -> anyhow::Result<()> {
    let scan = parse_scan(&config.network_params(), data)?;
    let fmt = config.formatter();

    println!("Address: {}", scan.address);
    if let Some(amount) = scan.amount {
        println!("Amount:  {}", fmt.display_with_unit(amount));
    }
    if let Some(label) = scan.label {
        println!("Label:   {}", label);
    }
    Ok(())
}

async fn run_quote(config: &ServiceConfig, args: QuoteArgs) -> anyhow::Result<()> {
    let client = api_client(config)?;
    let fmt = config.formatter();
    let network = config.network_params();

    let suggested_fee = DynamicFeeCache::new(&config.relay_policy())
        .refresh(&client)
        .await;

    let custom_fee = args
        .fee
        .as_deref()
        .map_or(0, |text| fmt.satoshis_from_text(text));
    let fee_policy = FeePolicy::from_custom_fee(custom_fee);
    let request = if args.spend_all {
        TransactionRequest::spend_all(fee_policy)
    } else {
        let text = args.amount.as_deref().unwrap_or_default();
        let amount = fmt
            .parse_satoshis(text)
            .with_context(|| format!("parsing amount {:?}", text))?;
        TransactionRequest::new(amount).with_fee_policy(fee_policy)
    };

    info!("Fetching unspent outputs for {}", args.from);
    let response = client
        .unspent_outputs(&args.from)
        .await
        .context("fetching unspent outputs")?;

    let calculator = TransactionCalculator::new(config.relay_policy(), &config.consensus());
    let amounts = match response {
        Some(response) => {
            let coins = get_coins(&response)?;
            calculator.calculate(&coins, &request, &suggested_fee)
        }
        None => TransactionAmounts::no_outputs(request.amount),
    };

    let mut pending = PendingTransaction {
        sending: Some(sender_account(&network, &args.from)),
        receiving_address: args.to.clone(),
        ..Default::default()
    };
    pending.apply(&amounts);

    if amounts.has_no_funds() {
        println!("Max available: insufficient funds");
    } else {
        println!(
            "Max available: {}",
            fmt.display_with_unit(amounts.max_available_display())
        );
        if amounts.is_insufficient() {
            println!("The amount plus fee exceeds the available balance");
        }
    }
    println!("Amount:        {}", fmt.display_with_unit(amounts.amount));
    println!("Fee:           {}", fmt.display_with_unit(amounts.fee));
    println!(
        "Inputs:        {}",
        amounts.bundle.as_ref().map_or(0, |b| b.input_count())
    );
    if let Some(estimate) = amounts.estimate {
        println!("{}", estimate);
    }
    if let Some(notice) = &amounts.notice {
        println!("Notice:        {}", notice);
    }
    if amounts.custom_fee_exceeds_available {
        println!("Custom fee exceeds the available balance");
    }

    let validator = SpendValidator::new(network, config.consensus(), config.relay_policy());
    match validator.check_fee(&pending, &amounts.tier_fees) {
        Ok(check) => match check.warning(pending.fee, &fmt) {
            Some(warning) => println!("Fee check:     {}", warning),
            None => println!("Fee check:     adequate"),
        },
        Err(e) => println!("Fee check:     {}", e.user_message()),
    }

    if args.to.is_some() {
        match validator.validate_spend(&pending, amounts.max_available) {
            Ok(()) => println!("Validation:    ok"),
            Err(e) => println!("Validation:    {}", e.user_message()),
        }
        if validator.is_large_transaction(&pending, amounts.absolute_suggested_fee) {
            println!("Large transaction: the fee is high relative to the amount");
        }
    }

    Ok(())
}

fn sender_account(network: &Network, from: &str) -> ItemAccount {
    if is_valid_address(network, from) {
        ItemAccount::legacy(
            from,
            0,
            LegacyAddress {
                address: from.to_string(),
                watch_only: true,
                has_private_key: false,
                archived: false,
            },
        )
    } else {
        ItemAccount::hd(
            "xpub",
            0,
            HdAccount {
                index: 0,
                xpub: from.to_string(),
                archived: false,
            },
        )
    }
}
