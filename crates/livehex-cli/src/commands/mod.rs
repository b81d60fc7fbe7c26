//! CLI command implementations.
//!
//! Every command opens its own session, does one thing and disconnects.
//! Box and slot numbers are 1-based here, as the games show them.

pub mod boxes;
pub mod memory;
pub mod probe;
pub mod slot;
pub mod versions;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use livehex_core::{
    BoxCollection, HasTrainerBlock, LiveSyncController, PkxDecoder, RecordFormat, RecordVerdict,
    SyncConfig, TargetVersion, lookup, validate_record, valid_versions,
};
use livehex_core::transport::protocol::DEFAULT_PORT;
use owo_colors::OwoColorize;
use tracing::warn;

use crate::cli::{Cli, Command, TargetArgs};
use crate::settings::Settings;

pub fn dispatch(cli: Cli) -> Result<()> {
    let target = cli.target;
    match cli.command {
        Command::Probe => probe::run(&target),
        Command::Trainer => probe::run_trainer(&target),
        Command::ReadBox { box_number, output } => {
            boxes::read(&target, box_number, output.as_deref())
        }
        Command::WriteBox {
            input,
            box_number,
            force,
        } => boxes::write(&target, &input, box_number, force),
        Command::ReadSlot {
            box_number,
            slot_number,
            output,
        } => slot::read(&target, box_number, slot_number, output.as_deref()),
        Command::WriteSlot {
            box_number,
            slot_number,
            input,
            force,
        } => slot::write(&target, box_number, slot_number, &input, force),
        Command::ChangeBox { box_number } => boxes::change(&target, box_number),
        Command::Peek {
            offset,
            size,
            ascii,
        } => memory::peek(&target, &offset, &size, ascii),
        Command::Poke { offset, data } => memory::poke(&target, &offset, &data),
        Command::LoadOffset { offset, output } => {
            memory::load_offset(&target, &offset, output.as_deref())
        }
        Command::Watch {
            box_number,
            interval_ms,
        } => watch::run(&target, box_number, interval_ms),
        Command::Versions { json } => versions::run(json),
    }
}

/// A connected controller plus the collection it fills.
pub struct Session {
    pub collection: Arc<BoxCollection>,
    pub controller: Arc<LiveSyncController>,
    pub version: TargetVersion,
}

impl Session {
    pub fn validated(&self) -> bool {
        self.controller.status().validated
    }

    /// Refuse writes on an unconfirmed layout unless forced.
    pub fn ensure_writable(&self, force: bool) -> Result<()> {
        if self.validated() {
            return Ok(());
        }
        if force {
            warn!("Writing with unconfirmed layout {}", self.version);
            return Ok(());
        }
        bail!(
            "Layout {} was not confirmed by the console; pass --force to write anyway",
            self.version
        )
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.controller.disconnect();
    }
}

/// Resolve host and port from arguments, then saved settings, then defaults.
pub fn sync_config(target: &TargetArgs, settings: &Settings) -> Result<SyncConfig> {
    let host = target
        .host
        .clone()
        .or_else(|| settings.host.clone())
        .context("No console address; pass --host")?;
    let port = target.port.or(settings.port).unwrap_or(DEFAULT_PORT);
    Ok(SyncConfig::builder()
        .host(host)
        .port(port)
        .timeout(Duration::from_millis(target.timeout_ms))
        .build())
}

pub fn connect(target: &TargetArgs, trainer: Option<&mut dyn HasTrainerBlock>) -> Result<Session> {
    let settings = Settings::load();
    let config = sync_config(target, &settings)?;
    // Every layout of a format shares its box geometry.
    let candidate = valid_versions(target.format)
        .first()
        .copied()
        .unwrap_or(TargetVersion::FALLBACK);
    let layout = lookup(candidate);
    let collection = Arc::new(BoxCollection::new(
        target.format,
        layout.box_count as usize,
        layout.slots_per_box as usize,
    ));

    let address = format!("{}:{}", config.host, config.port);
    let controller = Arc::new(LiveSyncController::new(config.clone(), collection.clone()));
    let version = controller
        .connect(trainer)
        .with_context(|| format!("Failed to connect to {}", address))?;

    let session = Session {
        collection,
        controller,
        version,
    };
    print_status(&address, &session);

    if !target.no_save {
        let updated = Settings {
            host: Some(config.host),
            port: Some(config.port),
        };
        if updated != settings
            && let Err(e) = updated.save()
        {
            warn!("Failed to save settings: {}", e);
        }
    }
    Ok(session)
}

fn print_status(address: &str, session: &Session) {
    if session.validated() {
        println!(
            "{} {} ({})",
            "Connected".green().bold(),
            address,
            session.version
        );
    } else {
        println!(
            "{} {} ({}, {})",
            "Connected".yellow().bold(),
            address,
            session.version,
            "layout not confirmed, writes may corrupt the game".yellow()
        );
    }
}

/// 1-based box number as shown in game to a 0-based index.
pub fn box_index(box_number: u8) -> Result<u8> {
    match box_number.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("Box numbers start at 1"),
    }
}

pub fn slot_index(slot_number: u8) -> Result<u8> {
    match slot_number.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("Slot numbers start at 1"),
    }
}

/// Short summary of what a slot holds.
pub fn describe_slot(format: RecordFormat, bytes: &[u8]) -> String {
    let decoder = PkxDecoder::new(format);
    match validate_record(&decoder, bytes) {
        RecordVerdict::Valid { species: 0 } => "empty".dimmed().to_string(),
        RecordVerdict::Valid { species } => format!("species {}", species).green().to_string(),
        RecordVerdict::BadChecksum => "bad checksum".red().to_string(),
        RecordVerdict::SpeciesOutOfRange(species) => {
            format!("species {} out of range", species).red().to_string()
        }
        RecordVerdict::Undecodable(reason) => reason.red().to_string(),
    }
}
