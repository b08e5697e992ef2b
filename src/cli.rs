//! Command line interface for the `inbound-dump` binary.
//!
//! Shared with the build script, which renders the man page from it.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the `inbound-dump` binary.
#[derive(Debug, Parser)]
#[command(
    name = "inbound-dump",
    version,
    about = "Decode a captured transport stream and print each message"
)]
pub struct Cli {
    /// Capture file to read; standard input when omitted.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Maximum number of bytes requested per read.
    #[arg(long, default_value_t = 64 * 1024)]
    pub read_size: usize,

    /// Largest accepted frame, in bytes, including marker and length.
    #[arg(long, default_value_t = 100 * 1024 * 1024)]
    pub max_frame_length: usize,
}
