use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use livehex_core::RecordFormat;

#[derive(Parser)]
#[command(name = "livehex")]
#[command(about = "Live box sync with a sys-botbase console", version)]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the console is and what it stores.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Console IP address (defaults to the last one used)
    #[arg(long, global = true, env = "LIVEHEX_HOST")]
    pub host: Option<String>,

    /// sys-botbase port (defaults to the last one used, then 6000)
    #[arg(long, global = true, env = "LIVEHEX_PORT")]
    pub port: Option<u16>,

    /// Socket timeout in milliseconds
    #[arg(long, global = true, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Record format of the local collection (pk8 or pb7)
    #[arg(long, global = true, default_value = "pk8")]
    pub format: RecordFormat,

    /// Do not remember host and port for the next run
    #[arg(long, global = true)]
    pub no_save: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect which game build the console is running
    Probe,

    /// Show the trainer block
    Trainer,

    /// Read a box and print or save it
    ReadBox {
        /// Box number (1-based)
        #[arg(long = "box", default_value_t = 1)]
        box_number: u8,

        /// Save the box as a JSON dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a JSON box dump to the console
    WriteBox {
        /// Dump produced by `read-box --output`
        input: PathBuf,

        /// Target box (1-based); defaults to the box stored in the dump
        #[arg(long = "box")]
        box_number: Option<u8>,

        /// Write even if the layout was not confirmed by the console
        #[arg(long)]
        force: bool,
    },

    /// Read one slot
    ReadSlot {
        #[arg(long = "box", default_value_t = 1)]
        box_number: u8,

        /// Slot number (1-based)
        #[arg(long = "slot")]
        slot_number: u8,

        /// Save the raw slot bytes to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write one slot from a raw record file
    WriteSlot {
        #[arg(long = "box", default_value_t = 1)]
        box_number: u8,

        #[arg(long = "slot")]
        slot_number: u8,

        /// Encrypted record, exactly one slot long
        input: PathBuf,

        #[arg(long)]
        force: bool,
    },

    /// Switch the box shown on the console
    ChangeBox {
        #[arg(long = "box")]
        box_number: u8,
    },

    /// Hexdump remote memory
    Peek {
        /// Offset, 8 hex digits (e.g. 0x4506D890)
        offset: String,

        /// Number of bytes (decimal)
        size: String,

        /// Show ASCII column
        #[arg(long)]
        ascii: bool,
    },

    /// Write raw bytes to remote memory
    Poke {
        /// Offset, 8 hex digits
        offset: String,

        /// Bytes as hex (e.g. DEADBEEF)
        data: String,
    },

    /// Read a record at an arbitrary offset
    LoadOffset {
        /// Offset, 8 hex digits
        offset: String,

        /// Save the record bytes to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Poll a box and report slots that change on the console
    Watch {
        #[arg(long = "box", default_value_t = 1)]
        box_number: u8,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// List known layouts
    Versions {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
