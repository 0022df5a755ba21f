use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use basket_hygiene::{
    read_campaigns, read_demographics, read_product_catalog, read_redemptions, read_transactions,
    sink, CleaningConfig, ParseErrorPolicy, Pipeline, ProductCatalog,
};

#[derive(Parser)]
#[command(name = "basket-hygiene")]
#[command(about = "Retail transaction cleaning pipeline with an auditable data quality log")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean transactions, join demographics and write the audit artifacts
    Clean {
        /// transaction_data.csv
        #[arg(long)]
        transactions: PathBuf,
        /// hh_demographic.csv
        #[arg(long)]
        demographics: PathBuf,
        /// product.csv, used when transactions carry no COMMODITY_DESC
        #[arg(long)]
        products: Option<PathBuf>,
        /// campaign_desc.csv, written out as dim_campaign.csv
        #[arg(long)]
        campaigns: Option<PathBuf>,
        /// coupon_redempt.csv, written out as fact_redemptions.csv
        #[arg(long)]
        redemptions: Option<PathBuf>,
        /// TOML file with cleaning thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "data/processed")]
        out_dir: PathBuf,
        /// Override the loyalty-token unit price floor
        #[arg(long)]
        unit_price_floor: Option<f64>,
        /// Override the quantity safety cap
        #[arg(long)]
        quantity_cap: Option<i32>,
        /// Drop malformed rows into the audit report instead of aborting
        #[arg(long)]
        skip_malformed: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("basket_hygiene=info")),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean {
            transactions,
            demographics,
            products,
            campaigns,
            redemptions,
            config,
            out_dir,
            unit_price_floor,
            quantity_cap,
            skip_malformed,
        } => {
            let mut config = load_config(config)?;
            if let Some(floor) = unit_price_floor {
                config.unit_price_floor = floor;
            }
            if let Some(cap) = quantity_cap {
                config.quantity_cap = cap;
            }
            if skip_malformed {
                config.parse_error_policy = ParseErrorPolicy::Skip;
            }

            let inputs = Inputs {
                transactions,
                demographics,
                products,
                campaigns,
                redemptions,
            };
            run_clean(config, inputs, out_dir)
        }
        Commands::Config { config } => {
            let config = load_config(config)?;
            print!("{}", toml::to_string_pretty(&config).context("Failed to render config")?);
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<CleaningConfig> {
    match path {
        Some(path) => CleaningConfig::from_file(path),
        None => Ok(CleaningConfig::default()),
    }
}

struct Inputs {
    transactions: PathBuf,
    demographics: PathBuf,
    products: Option<PathBuf>,
    campaigns: Option<PathBuf>,
    redemptions: Option<PathBuf>,
}

fn run_clean(config: CleaningConfig, inputs: Inputs, out_dir: PathBuf) -> Result<()> {
    println!("🧹 Transaction Data Cleaning Pipeline");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let sentinel = config.demographic_sentinel.clone();
    let pipeline = Pipeline::new(config)?;

    // 1. Load CSVs
    println!("\n📂 Loading CSVs...");
    let raw_transactions = read_transactions(&inputs.transactions)?;
    let raw_demographics = read_demographics(&inputs.demographics)?;
    let catalog = match inputs.products {
        Some(path) => read_product_catalog(&path)?,
        None => ProductCatalog::new(),
    };
    let raw_campaigns = match inputs.campaigns {
        Some(path) => read_campaigns(&path)?,
        None => Vec::new(),
    };
    let raw_redemptions = match inputs.redemptions {
        Some(path) => read_redemptions(&path)?,
        None => Vec::new(),
    };
    println!("✓ Loaded {} transactions", raw_transactions.len());
    println!("✓ Loaded {} demographic rows", raw_demographics.len());
    if !catalog.is_empty() {
        println!("✓ Loaded {} products", catalog.len());
    }
    if !raw_campaigns.is_empty() {
        println!("✓ Loaded {} campaigns", raw_campaigns.len());
    }
    if !raw_redemptions.is_empty() {
        println!("✓ Loaded {} coupon redemptions", raw_redemptions.len());
    }

    // 2. Clean + enrich
    println!("\n🏷️  Applying rules: {}", pipeline.rules().ids().join(" → "));
    let output = pipeline
        .with_catalog(catalog)
        .with_campaigns(raw_campaigns)
        .with_redemptions(raw_redemptions)
        .run(&raw_transactions, &raw_demographics)?;

    for entry in output.audit.entries() {
        println!(
            "  {:<22} {:>10} rows  {}",
            entry.rule_id, entry.rows_affected, entry.description
        );
    }

    // 3. Write
    println!("\n💾 Writing outputs to {}...", out_dir.display());
    let paths = sink::write_all(&out_dir, &output, &sentinel)?;
    for path in &paths {
        println!("✓ {}", path.display());
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Input rows:        {}", output.input_rows);
    println!("✓ Cleaned rows:      {}", output.dataset.len());
    println!("✓ Removed rows:      {}", output.audit.filtered_total());
    println!(
        "✓ Households:        {} ({} without demographics)",
        output.households.len(),
        output.shadow_households()
    );
    if !output.campaigns.is_empty() {
        println!("✓ Campaigns:         {}", output.campaigns.len());
    }
    if !output.redemptions.is_empty() {
        println!("✓ Redemptions:       {}", output.redemptions.len());
    }
    println!("✓ Fingerprint:       {}", output.fingerprint()?);

    if output.is_consistent() {
        println!("✅ Every input row accounted for");
    } else {
        anyhow::bail!(
            "audit does not balance: {} input rows, {} cleaned, {} removed",
            output.input_rows,
            output.dataset.len(),
            output.audit.filtered_total()
        );
    }

    Ok(())
}
