use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap_derive::{Parser, Subcommand};
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing::error;
use tracing_subscriber::fmt::time::OffsetTime;

use petpack::installer::InstallOptions;
use petpack::settings::Settings;
use petpack::{DefaultTransport, PackManager, PngProbe, StoreHandle};

mod command;

#[derive(Debug, Parser)]
#[command(version, about = "Install and activate sprite packs in a shared store")]
pub struct Args {
    /// Root of the shared store
    #[arg(short, long, global = true, default_value = "./petpack-store")]
    pub root: PathBuf,

    /// More output, repeat for even more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a pack from its manifest URL and add it to the store
    Install {
        /// URL of the pack's manifest.json (http, https or file)
        url: String,
        /// Scale that wins ties between equally high variants
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
        preferred_scale: Option<u8>,
        /// Refuse sprites whose size does not match the manifest
        #[arg(long)]
        strict: bool,
        /// Make the pack active right after installing it
        #[arg(long)]
        activate: bool,
    },
    /// Publish an installed pack as the active one
    Activate {
        id: String,
    },
    /// Delete an installed pack
    Remove {
        id: String,
    },
    /// List installed packs
    List,
    /// Show what a rendering surface would currently draw
    Show,
    /// Check the store for leftovers from interrupted installs
    Verify {
        /// Delete orphaned directories and temp files
        #[arg(long)]
        prune: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let store = StoreHandle::open(&args.root);
    let settings = Settings::load(&store.settings_path())?;
    let mut options = settings.apply(InstallOptions::default());
    if let Command::Install { preferred_scale, strict, activate, .. } = &args.command {
        if let Some(scale) = preferred_scale {
            options.preferred_scale = *scale;
        }
        if *strict {
            options.size_policy = petpack::SizePolicy::Reject;
        }
        if *activate {
            options.activate_on_install = true;
        }
    }

    let manager = PackManager::new(store, DefaultTransport::new()?, PngProbe, options);
    match &args.command {
        Command::Install { url, .. } => command::install::install(&manager, url),
        Command::Activate { id } => command::activate::activate(&manager, id),
        Command::Remove { id } => command::remove::remove(&manager, id),
        Command::List => command::list::list(&manager),
        Command::Show => command::show::show(&manager),
        Command::Verify { prune } => command::verify::verify(&manager, *prune),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    // the local offset is unavailable on some platforms once threads exist, UTC is fine then
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_timer(OffsetTime::new(offset, Rfc3339))
        .init();
}
