//! `inbound-dump`: decode a captured transport stream.
//!
//! Feeds a file, or standard input, through an [`InboundPipeline`] and prints
//! one line per delivered message.

mod cli;

use std::io::Write;

use clap::Parser;
use inbound_pipeline::{
    AggregatedMessage,
    ConnectionId,
    HandlerError,
    InboundPipeline,
    TokenizerConfig,
    TransportTokenizer,
    read_frames,
};
use tokio::io::AsyncRead;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let mut reader: Box<dyn AsyncRead + Unpin + Send> = match &cli.input {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };

    let config = TokenizerConfig::default().max_frame_length(cli.max_frame_length);
    let tokenizer = TransportTokenizer::with_config(config);
    let mut pipeline = InboundPipeline::new(tokenizer, print_message);
    read_frames(&mut reader, &mut pipeline, ConnectionId::new(0), cli.read_size).await?;
    Ok(())
}

fn print_message(
    connection: ConnectionId,
    message: AggregatedMessage<'_>,
) -> Result<(), HandlerError> {
    let mut out = std::io::stdout().lock();
    match message.header() {
        None => writeln!(out, "{connection} ping")?,
        Some(header) => writeln!(
            out,
            "{connection} request_id={} status={:#04x} version={} bytes={}",
            header.request_id,
            header.status.bits(),
            header.version,
            message.content().len(),
        )?,
    }
    Ok(())
}
