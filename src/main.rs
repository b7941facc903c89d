use anyhow::{Context, Result};
use clap::Parser;
use std::io::{Read, Write};
use std::sync::Arc;
use toolstream::core::{EnvelopeDecoder, StreamDecoder, TagStreamDecoder};
use toolstream::tools::helpers::log_tool_calls;
use toolstream::tools::renderers::builtin_table;
use toolstream::utils::config::StreamConfig;
use toolstream::utils::logger::SessionLogger;
use toolstream::utils::split_chunks;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File holding the raw model response (reads stdin when omitted)
    #[arg(long)]
    input: Option<String>,

    /// Characters per replayed chunk
    #[arg(long, default_value_t = 16)]
    chunk_size: usize,

    /// JSON config file
    #[arg(long)]
    config: Option<String>,

    /// Decode `<tool_call>{json}</tool_call>` envelopes instead of XML tool tags
    #[arg(long, default_value_t = false)]
    envelope: bool,

    #[arg(long, default_value_t = false)]
    no_color: bool,

    /// Print completed tool calls as JSON to stderr at the end
    #[arg(long, default_value_t = false)]
    snapshots: bool,

    #[arg(long, default_value_t = false)]
    log: bool,
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read input {path}"))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.log { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => StreamConfig::from_file(path)?,
        None => StreamConfig::default(),
    }
    .with_env();
    if args.no_color {
        config.color = false;
    }
    config.validate()?;

    let renderers = Arc::new(builtin_table(config.theme()));
    let mut decoder: Box<dyn StreamDecoder> = if args.envelope {
        Box::new(
            EnvelopeDecoder::new(config.envelope.clone(), renderers)
                .with_max_tag_len(config.max_tag_len),
        )
    } else {
        Box::new(
            TagStreamDecoder::new(config.vocabulary(), renderers)
                .with_max_tag_len(config.max_tag_len),
        )
    };

    let logger = SessionLogger::new();
    let input = match read_input(args.input.as_deref()) {
        Ok(input) => input,
        Err(e) => {
            if let Some(logger) = &logger {
                logger.log_error(&format!("{e:#}"));
            }
            return Err(e);
        }
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for chunk in split_chunks(&input, args.chunk_size) {
        let rendered = decoder.process(chunk);
        if let Some(logger) = &logger {
            logger.log_chunk(chunk);
            logger.log_output(&rendered);
        }
        out.write_all(rendered.as_bytes())?;
        out.flush()?;
    }
    let rest = decoder.end();
    if let Some(logger) = &logger {
        logger.log_output(&rest);
    }
    out.write_all(rest.as_bytes())?;
    writeln!(out)?;
    out.flush()?;

    let calls = decoder.take_completed();
    log_tool_calls("Decoded", &calls);
    if let Some(logger) = &logger {
        logger.log_tool_calls(&calls);
    }
    if args.snapshots {
        eprintln!("{}", serde_json::to_string_pretty(&calls)?);
    }
    Ok(())
}
