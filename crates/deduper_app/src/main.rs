mod config;
mod effects;
mod logging;
mod persistence;
mod render;
mod session;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use deduper_core::{ConnectionStatus, Msg};
use deduper_engine::{
    BusClient, ContentScript, EngineCommand, EngineEvent, EngineHandle, HtmlPage, InProcessTab,
    RuntimeChannel,
};
use deduper_logging::{deduper_error, deduper_info, deduper_warn};

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::effects::EffectRunner;
use crate::logging::LogDestination;
use crate::persistence::{load_discovered, save_discovered, DEFAULT_SNAPSHOT_PATH};
use crate::session::Session;

/// Finds photos in a saved Google Photos page and hands them to the dedup backend.
#[derive(Parser)]
#[command(name = "deduper", version)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = LogDestination::File, global = true)]
    log: LogDestination,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// A saved page standing in for the active tab.
#[derive(Args)]
struct PageArgs {
    /// HTML file holding the page snapshot
    #[arg(long)]
    page: PathBuf,
    /// URL the snapshot was taken from
    #[arg(long)]
    url: String,
    /// Content-Type the page was served with, for its charset
    #[arg(long)]
    content_type: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether the backend is reachable and logged in
    Status,
    /// Discover photos on a page and save them for upload
    Discover {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, default_value = DEFAULT_SNAPSHOT_PATH)]
        out: PathBuf,
    },
    /// Upload previously discovered photos in batches
    Upload {
        #[arg(long, default_value = DEFAULT_SNAPSHOT_PATH)]
        photos: PathBuf,
    },
    /// Start duplicate analysis over the uploaded photos
    Analyze,
    /// Move one photo to the trash from its detail page
    Delete {
        #[command(flatten)]
        page: PageArgs,
        /// Media item id of the photo shown on the page
        #[arg(long)]
        id: String,
    },
    /// Check, discover, upload and analyze in one go
    Session {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, default_value = DEFAULT_SNAPSHOT_PATH)]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            deduper_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;
    match cli.command {
        Command::Status => {
            let (mut session, _bus) = connect(&config, None)?;
            session.request(Msg::Opened, |msg| matches!(msg, Msg::ConnectionChecked(_)))?;
            Ok(())
        }
        Command::Discover { page, out } => {
            let (mut session, bus) = connect(&config, Some(&page))?;
            discover(&mut session, &bus, &out)
        }
        Command::Upload { photos } => {
            let (mut session, _bus) = connect(&config, None)?;
            session.restore(load_discovered(&photos)?);
            session.request(Msg::SendClicked, |msg| matches!(msg, Msg::UploadFinished(_)))?;
            Ok(())
        }
        Command::Analyze => {
            let (session, _bus) = connect(&config, None)?;
            analyze(&session, &config)
        }
        Command::Delete { page, id } => {
            let (session, _bus) = connect(&config, Some(&page))?;
            delete(&session, &config, id)
        }
        Command::Session { page, out } => {
            let (mut session, bus) = connect(&config, Some(&page))?;
            let view =
                session.request(Msg::Opened, |msg| matches!(msg, Msg::ConnectionChecked(_)))?;
            if view.connection != Some(ConnectionStatus::Connected) {
                deduper_warn!("Continuing without a confirmed backend session");
            }
            discover(&mut session, &bus, &out)?;
            session.request(Msg::SendClicked, |msg| matches!(msg, Msg::UploadFinished(_)))?;
            session.request(Msg::AnalyzeClicked, |msg| {
                matches!(msg, Msg::AnalysisStarted(_))
            })?;
            Ok(())
        }
    }
}

/// Wires a page (if any) to a content script, the bus and the engine.
fn connect(config: &AppConfig, page: Option<&PageArgs>) -> Result<(Session, BusClient)> {
    let runtime = RuntimeChannel::new();
    let tab = match page {
        Some(args) => {
            let page = load_page(args)?;
            let content = ContentScript::new(Arc::new(page), runtime.clone(), config.content_settings());
            InProcessTab::new(content)
        }
        None => InProcessTab::default(),
    };
    let bus = BusClient::new(runtime, Arc::new(tab));
    let engine = EngineHandle::new(config.engine_settings(), bus.clone())?;
    let runner = EffectRunner::new(engine, config.app_url.clone());
    Ok((Session::new(runner, config.event_timeout()), bus))
}

fn load_page(args: &PageArgs) -> Result<HtmlPage> {
    let bytes =
        fs::read(&args.page).with_context(|| format!("reading page {}", args.page.display()))?;
    let page = HtmlPage::from_bytes(&args.url, &bytes, args.content_type.as_deref())
        .with_context(|| format!("decoding page {}", args.page.display()))?;
    deduper_info!("Loaded {} bytes for {}", bytes.len(), args.url);
    Ok(page)
}

fn discover(session: &mut Session, bus: &BusClient, out: &Path) -> Result<()> {
    let tab_url = bus.active_url();
    session.request(Msg::DiscoverClicked { tab_url: tab_url.clone() }, |msg| {
        matches!(msg, Msg::DiscoveryFinished(_))
    })?;
    save_discovered(out, tab_url.as_deref().unwrap_or_default(), session.discovered())?;
    println!("Saved {} photos to {}", session.discovered().len(), out.display());
    Ok(())
}

fn analyze(session: &Session, config: &AppConfig) -> Result<()> {
    let runner = session.runner();
    runner.enqueue(EngineCommand::StartAnalysis);
    let task_id = runner
        .wait_for(config.event_timeout(), |event| match event {
            EngineEvent::AnalysisStarted(result) => Some(result),
            _ => None,
        })
        .ok_or_else(|| anyhow!("no answer from the backend"))?
        .map_err(|err| anyhow!("Error starting analysis: {}", err.message))?;
    println!("Analysis started! Task ID: {task_id}");
    runner.open_app();
    Ok(())
}

fn delete(session: &Session, config: &AppConfig, id: String) -> Result<()> {
    let runner = session.runner();
    runner.enqueue(EngineCommand::Delete {
        media_item_id: id.clone(),
    });
    let receipt = runner
        .wait_for(config.event_timeout(), |event| match event {
            EngineEvent::DeletionCompleted {
                media_item_id,
                result,
            } if media_item_id == id => Some(result),
            _ => None,
        })
        .ok_or_else(|| anyhow!("no answer from the page"))?
        .with_context(|| format!("deleting {id}"))?;
    println!(
        "Moved {} to trash at {} ({})",
        receipt.media_item_id,
        receipt.deleted_at.to_rfc3339(),
        receipt.user_url
    );
    Ok(())
}
