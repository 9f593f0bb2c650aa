mod commands;

use clap::{ArgAction, Args, Parser, Subcommand};
use fabric_alloc::{Allocator, AllocatorConfig};
use fabric_alloc_config::Settings;
use ipnet::Ipv4Net;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fabctl")]
#[command(about = "Allocate VLANs, subnets and multicast ranges to fabric tenants", long_about = None)]
struct Cli {
    /// Settings file (default: FABRIC_ALLOC_CONFIG, ./fabric-alloc.yaml, ~/.config/fabric-alloc/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the allocation table and its lock
    #[arg(long, global = true, env = "FABRIC_ALLOC_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(flatten)]
    overrides: AllocatorOverrides,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Per-field overrides of the allocator settings
#[derive(Args)]
struct AllocatorOverrides {
    /// First VLAN id handed out
    #[arg(long, global = true, env = "FABRIC_ALLOC_VLAN_MIN")]
    vlan_min: Option<u16>,

    /// Last VLAN id handed out
    #[arg(long, global = true, env = "FABRIC_ALLOC_VLAN_MAX")]
    vlan_max: Option<u16>,

    /// First multicast /16 tried
    #[arg(long, global = true, env = "FABRIC_ALLOC_MULTICAST_RANGE")]
    multicast_range: Option<Ipv4Net>,

    /// First service subnet tried
    #[arg(long, global = true, env = "FABRIC_ALLOC_SERVICE_SUBNET")]
    service_subnet: Option<Ipv4Net>,

    /// First pod subnet tried
    #[arg(long, global = true, env = "FABRIC_ALLOC_POD_SUBNET")]
    pod_subnet: Option<Ipv4Net>,
}

impl AllocatorOverrides {
    fn apply(&self, mut config: AllocatorConfig) -> AllocatorConfig {
        if let Some(vlan_min) = self.vlan_min {
            config.vlan_min = vlan_min;
        }
        if let Some(vlan_max) = self.vlan_max {
            config.vlan_max = vlan_max;
        }
        if let Some(range) = self.multicast_range {
            config.multicast_range = range;
        }
        if let Some(subnet) = self.service_subnet {
            config.service_subnet = subnet;
        }
        if let Some(subnet) = self.pod_subnet {
            config.pod_subnet = subnet;
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reserve resources for a new tenant
    Reserve {
        /// Tenant name (no whitespace)
        name: String,
    },
    /// Release a tenant's resources
    Free {
        /// Tenant name
        name: String,
    },
    /// Show a tenant's resources
    Get {
        /// Tenant name
        name: String,
    },
    /// List all tenants
    List,
    /// Show the resolved settings
    Config,
    /// Show version information
    Version,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_settings(cli: &Cli) -> anyhow::Result<(Settings, Option<PathBuf>)> {
    let (mut settings, source) = match &cli.config {
        Some(path) => (fabric_alloc_config::load_settings(path)?, Some(path.clone())),
        None => fabric_alloc_config::load()?,
    };

    settings.allocator = cli.overrides.apply(settings.allocator);
    if let Some(dir) = &cli.state_dir {
        settings.store.state_dir = Some(dir.clone());
    }

    Ok((settings, source))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // version needs no settings
    if matches!(cli.command, Commands::Version) {
        println!("fabctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (settings, source) = resolve_settings(&cli)?;

    if matches!(cli.command, Commands::Config) {
        return commands::show_config(&settings, source.as_deref(), cli.json);
    }

    let store = settings.store.open()?;
    let allocator = Allocator::new(store, settings.allocator)?;

    match &cli.command {
        Commands::Reserve { name } => commands::reserve(&allocator, name, cli.json).await,
        Commands::Free { name } => commands::free(&allocator, name, cli.json).await,
        Commands::Get { name } => commands::get(&allocator, name, cli.json).await,
        Commands::List => commands::list(&allocator, cli.json).await,
        Commands::Config | Commands::Version => Ok(()),
    }
}
