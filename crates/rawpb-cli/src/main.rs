//! rawpb - Inspect and edit protobuf payloads without a schema
//!
//! `rawpb decode` turns wire bytes into a JSON rendering of the classified
//! fields; `rawpb encode` turns that JSON (possibly hand-edited) back into
//! wire bytes.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rawpb_core::text::unwrap_text_payload;
use rawpb_core::{
    Base64Alphabet, Decoder, DecoderConfig, Encoder, EncoderConfig, HeaderErrorPolicy, KeyPolicy,
};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, Level};
use tracing_subscriber::EnvFilter;

/// Inspect and edit protobuf payloads without a schema
#[derive(Parser, Debug)]
#[command(name = "rawpb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode wire bytes into JSON
    Decode(DecodeArgs),
    /// Encode JSON back into wire bytes
    Encode(EncodeArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Input file (stdin if omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// How the input bytes are written
    #[arg(long, value_enum, default_value = "raw")]
    input_format: ByteFormat,

    /// Keep only the last occurrence of each field number and type
    #[arg(long)]
    collapsing: bool,

    /// Do not look for base64-wrapped nested messages
    #[arg(long)]
    no_base64: bool,

    /// Maximum nesting depth
    #[arg(long, default_value = "100")]
    max_depth: usize,

    /// Skip unreadable top-level field headers instead of failing
    #[arg(long)]
    resync: bool,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Input JSON file (stdin if omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How the output bytes are written
    #[arg(long, value_enum, default_value = "raw")]
    output_format: ByteFormat,

    /// Alphabet for base64-wrapped nested messages
    #[arg(long, value_enum, default_value = "standard")]
    alphabet: AlphabetArg,

    /// Omit `=` padding in base64-wrapped nested messages
    #[arg(long)]
    no_padding: bool,

    /// Overwrite an existing output file
    #[arg(long)]
    force: bool,
}

/// Textual form of a byte buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ByteFormat {
    /// Bytes as they are
    Raw,
    /// Hexadecimal digits, whitespace ignored
    Hex,
    /// Base64 in either alphabet, padding and URL escapes optional
    Base64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlphabetArg {
    /// `+` and `/`
    Standard,
    /// `-` and `_`
    UrlSafe,
}

impl From<AlphabetArg> for Base64Alphabet {
    fn from(arg: AlphabetArg) -> Self {
        match arg {
            AlphabetArg::Standard => Base64Alphabet::Standard,
            AlphabetArg::UrlSafe => Base64Alphabet::UrlSafe,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Command::Decode(args) => run_decode(args),
        Command::Encode(args) => run_encode(args),
    }
}

fn run_decode(args: &DecodeArgs) -> Result<()> {
    let raw = read_input(args.input.as_deref())?;
    let data = parse_bytes(&raw, args.input_format)?;
    info!("Decoding {} bytes", data.len());

    let config = DecoderConfig::new()
        .policy(if args.collapsing {
            KeyPolicy::Collapsing
        } else {
            KeyPolicy::Ordered
        })
        .decode_base64(!args.no_base64)
        .max_depth(args.max_depth)
        .on_header_error(if args.resync {
            HeaderErrorPolicy::Resync
        } else {
            HeaderErrorPolicy::Abort
        });

    let map = Decoder::with_config(config)
        .decode(&data)
        .context("Failed to decode input as a protobuf message")?;
    debug!("Decoded {} top-level fields", map.len());

    let json = if args.compact {
        serde_json::to_string(&map)
    } else {
        serde_json::to_string_pretty(&map)
    }
    .context("Failed to render JSON")?;

    println!("{}", json);
    Ok(())
}

fn run_encode(args: &EncodeArgs) -> Result<()> {
    let raw = read_input(args.input.as_deref())?;
    let tree: serde_json::Value =
        serde_json::from_slice(&raw).context("Failed to parse input JSON")?;

    let config = EncoderConfig::new()
        .alphabet(args.alphabet.into())
        .padding(!args.no_padding);

    let bytes = Encoder::with_config(config)
        .encode_tree(&tree)
        .context("Failed to encode JSON tree")?;
    info!("Encoded {} bytes", bytes.len());

    let rendered = render_bytes(&bytes, args.output_format);

    match &args.output {
        Some(path) => write_output(path, &rendered, args.force),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered).context("Failed to write to stdout")?;
            if args.output_format != ByteFormat::Raw {
                writeln!(stdout).context("Failed to write to stdout")?;
            }
            Ok(())
        }
    }
}

/// Read a file, or stdin when no path is given
fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            trace!("Reading {}", path.display());
            fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Turn input text into bytes according to its format
fn parse_bytes(raw: &[u8], format: ByteFormat) -> Result<Vec<u8>> {
    match format {
        ByteFormat::Raw => Ok(raw.to_vec()),
        ByteFormat::Hex => {
            let text = std::str::from_utf8(raw).context("Hex input is not text")?;
            parse_hex(text)
        }
        ByteFormat::Base64 => {
            let text = std::str::from_utf8(raw).context("Base64 input is not text")?;
            unwrap_text_payload(text.trim()).context("Failed to decode base64 input")
        }
    }
}

/// Hex digits with any whitespace between them
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&digits).context("Failed to decode hex input")
}

fn render_bytes(bytes: &[u8], format: ByteFormat) -> Vec<u8> {
    match format {
        ByteFormat::Raw => bytes.to_vec(),
        ByteFormat::Hex => hex::encode(bytes).into_bytes(),
        ByteFormat::Base64 => {
            rawpb_core::text::encode_base64(bytes, Base64Alphabet::Standard, true).into_bytes()
        }
    }
}

/// Write the output file, refusing to clobber unless forced
fn write_output(path: &Path, content: &[u8], force: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}
