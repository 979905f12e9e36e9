//! geoping - inventory editor for the device reachability map
//!
//! Adds and removes devices in the inventory the daemon probes, keeping the
//! metrics collector's scrape-target file in step. New devices are placed on
//! the map by geocoding their postal address.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use geoping_core::config::InventoryConfig;
use geoping_core::filter::filter_by_identity;
use geoping_core::traits::{GeocodeResult, Geocoder};
use geoping_core::{Device, FileSnapshotStore, InventoryEditor, SchemaVariant, ScrapeTargetFile};
use geoping_geocode::{BAN_API_BASE, BanGeocoder};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "geoping")]
#[command(version)]
#[command(about = "Manage the devices shown on the geoping map")]
#[command(long_about = "
geoping edits the inventory probed by geopingd and keeps the scrape-target
file used by the metrics collector in step with it.

Examples:
  geoping add --ip 10.0.0.1 --address \"1 rue de Rivoli, Paris\" --owner alice
  geoping remove --ip 10.0.0.1
  geoping list --user alice
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Inventory document (default: ~/geoping/devices.json)
    #[arg(long, global = true, env = "GEOPING_INVENTORY_PATH")]
    pub inventory: Option<PathBuf>,

    /// Scrape-target document (default: ~/geoping/scrape_targets.json)
    #[arg(long, global = true, env = "GEOPING_TARGETS_PATH")]
    pub targets: Option<PathBuf>,

    /// Record shape of the inventory
    #[arg(long, global = true, env = "GEOPING_SCHEMA", default_value = "full")]
    pub schema: SchemaVariant,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a device to the inventory
    Add {
        /// Device address, optionally prefixed with its type (router:10.0.0.1)
        #[arg(long)]
        ip: String,

        /// Postal address of the site
        #[arg(long)]
        address: String,

        /// Identity allowed to see the device on the dashboard
        #[arg(long)]
        owner: Option<String>,

        /// Keep the device off the map
        #[arg(long)]
        hidden: bool,

        /// Latitude; skips geocoding when given with --lon
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude; skips geocoding when given with --lat
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Geocoding service base URL
        #[arg(long, env = "GEOPING_GEOCODER_URL", default_value = BAN_API_BASE, hide = true)]
        geocoder_url: String,
    },

    /// Remove a device from the inventory
    #[command(alias = "rm")]
    Remove {
        /// Device address
        #[arg(long)]
        ip: String,
    },

    /// Show the inventory
    #[command(alias = "ls")]
    List {
        /// Only devices this identity would see on the dashboard
        #[arg(long)]
        user: Option<String>,

        /// Identity that sees every device
        #[arg(long, default_value = "admin")]
        admin_identity: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let editor = build_editor(&cli);

    match &cli.command {
        Commands::Add {
            ip,
            address,
            owner,
            hidden,
            lat,
            lon,
            geocoder_url,
        } => {
            let location = match (lat, lon) {
                (Some(latitude), Some(longitude)) => GeocodeResult {
                    latitude: *latitude,
                    longitude: *longitude,
                    label: address.trim().to_string(),
                },
                _ => {
                    let geocoder = BanGeocoder::with_base_url(geocoder_url.as_str())?;
                    geocoder
                        .geocode(address)
                        .await
                        .with_context(|| format!("Cannot place '{}' on the map", address))?
                }
            };
            cmd_add(&cli, &editor, ip, location, owner.clone(), !hidden).await
        }
        Commands::Remove { ip } => cmd_remove(&cli, &editor, ip).await,
        Commands::List { user, admin_identity } => {
            cmd_list(&cli, &editor, user.as_deref(), admin_identity).await
        }
    }
}

fn build_editor(cli: &Cli) -> InventoryEditor {
    let defaults = InventoryConfig::default();
    let inventory = cli.inventory.clone().unwrap_or(defaults.path);
    let targets = cli.targets.clone().unwrap_or(defaults.targets_path);

    InventoryEditor::new(
        Arc::new(FileSnapshotStore::new(inventory)),
        ScrapeTargetFile::new(targets),
        cli.schema,
    )
}

async fn cmd_add(
    cli: &Cli,
    editor: &InventoryEditor,
    ip: &str,
    location: GeocodeResult,
    owner: Option<String>,
    visible: bool,
) -> Result<()> {
    let device = editor.add(ip, location, owner, visible).await?;

    match cli.format {
        OutputFormat::Text => {
            println!("Added {}", device.address);
            println!("  Location: {}", device.label);
            println!("  Coordinates: {}, {}", device.latitude, device.longitude);
            if let Some(owner) = device.owner.as_deref().filter(|o| !o.is_empty()) {
                println!("  Owner: {}", owner);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&device)?),
    }
    Ok(())
}

async fn cmd_remove(cli: &Cli, editor: &InventoryEditor, ip: &str) -> Result<()> {
    let device = editor.remove(ip).await?;

    match cli.format {
        OutputFormat::Text => println!("Removed {} ({})", device.address, device.label),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&device)?),
    }
    Ok(())
}

async fn cmd_list(
    cli: &Cli,
    editor: &InventoryEditor,
    user: Option<&str>,
    admin_identity: &str,
) -> Result<()> {
    let devices = editor.list().await?;
    let devices = filter_by_identity(&devices, user, admin_identity);

    match cli.format {
        OutputFormat::Text => print_table(&devices),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&devices)?),
    }
    Ok(())
}

fn print_table(devices: &[Device]) {
    if devices.is_empty() {
        println!("No devices.");
        return;
    }

    println!("{:<40} {:<6} {:>9} {:<16} LOCATION", "ADDRESS", "STATUS", "RTT (ms)", "OWNER");
    for device in devices {
        let status = if device.is_up() { "up" } else { "down" };
        let rtt = device
            .latency
            .map(|ms| format!("{:.1}", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:<6} {:>9} {:<16} {}",
            device.address,
            status,
            rtt,
            device.owner_or_empty(),
            device.label
        );
    }
    println!();
    println!(
        "{} device(s), {} up",
        devices.len(),
        devices.iter().filter(|d| d.is_up()).count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_with_coordinates() {
        let cli = Cli::try_parse_from([
            "geoping", "add", "--ip", "router:10.0.0.1", "--address", "Quai, Brest",
            "--lat", "48.38", "--lon", "-4.49", "--owner", "alice",
        ])
        .unwrap();

        match cli.command {
            Commands::Add { ip, lat, lon, owner, hidden, .. } => {
                assert_eq!(ip, "router:10.0.0.1");
                assert_eq!(lat, Some(48.38));
                assert_eq!(lon, Some(-4.49));
                assert_eq!(owner.as_deref(), Some("alice"));
                assert!(!hidden);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_lat_requires_lon() {
        assert!(Cli::try_parse_from(["geoping", "add", "--ip", "10.0.0.1", "--address", "x", "--lat", "1"]).is_err());
    }

    #[test]
    fn test_schema_flag() {
        let cli = Cli::try_parse_from(["geoping", "--schema", "basic", "list"]).unwrap();
        assert_eq!(cli.schema, SchemaVariant::Basic);
        assert!(Cli::try_parse_from(["geoping", "--schema", "wide", "list"]).is_err());
    }
}
