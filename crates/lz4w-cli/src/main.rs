//! lz4writer: compress stdin into a single LZ4 frame on stdout
//!
//! When stdout is a regular file the frame header records the content size,
//! patched in after the last byte has been compressed. On a pipe the frame is
//! written without it.
//!
//! Input is read in randomized read sizes so that every run exercises a
//! different split of the same data.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, IsTerminal, Read, Seek, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use lz4w_core::config::Lz4wConfig;
use lz4w_core::{ContentSizeMode, FrameError, LogFormat};
use lz4w_frame::{CompressEngine, FrameWriter};

const PROG: &str = "lz4writer";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "lz4writer",
    version,
    about = "Compress stdin into an LZ4 frame on stdout",
    long_about = "lz4writer: compress stdin into an LZ4 frame on stdout.\n\n\
                  The compression level may also be given as -N (e.g. -9)."
)]
struct Cli {
    /// Path to lz4writer.toml configuration file
    #[arg(long, short = 'c', env = "LZ4W_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "LZ4W_LOG")]
    log: Option<String>,

    /// Log format: text or json
    #[arg(long, env = "LZ4W_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// Compression level
    #[arg(long, short = 'l')]
    level: Option<u32>,

    /// Append a checksum of the whole content after the last block
    #[arg(long)]
    checksum: bool,

    /// Record the content size in the header: auto, always, or never
    #[arg(long, value_parser = parse_content_size)]
    content_size: Option<ContentSizeMode>,

    /// Read stdin in maximal reads instead of randomized sizes
    #[arg(long)]
    fixed_reads: bool,

    /// Seed for the randomized read sizes
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    /// Command-line flags take precedence over the config file.
    fn apply_to(&self, config: &mut Lz4wConfig) {
        if let Some(level) = self.level {
            config.frame.level = level;
        }
        config.frame.content_checksum |= self.checksum;
        if let Some(mode) = self.content_size {
            config.frame.content_size = mode;
        }
        config.input.randomize &= !self.fixed_reads;
        if self.seed.is_some() {
            config.input.seed = self.seed;
        }
    }
}

fn parse_content_size(s: &str) -> Result<ContentSizeMode, String> {
    match s {
        "auto" => Ok(ContentSizeMode::Auto),
        "always" => Ok(ContentSizeMode::Always),
        "never" => Ok(ContentSizeMode::Never),
        other => Err(format!("unknown content size mode '{other}' (auto, always, never)")),
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format '{other}' (text, json)")),
    }
}

/// Rewrite the `-N` level shorthand into `--level=N` so clap can parse it.
fn rewrite_level_shorthand<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let digits = arg
                .to_str()
                .and_then(|s| s.strip_prefix('-'))
                .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()));
            match digits {
                Some(d) if i > 0 => OsString::from(format!("--level={d}")),
                _ => arg,
            }
        })
        .collect()
}

// ── Errors ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum CliError {
    #[error("compressed data cannot be written to a terminal")]
    StdoutIsTerminal,

    /// A frame operation failed; already rendered as `func: op: message`
    #[error("{0}")]
    Frame(String),

    #[error("stdin error: {0}")]
    Stdin(#[source] io::Error),

    #[error("{0:#}")]
    Setup(#[from] anyhow::Error),
}

impl CliError {
    fn frame(func: &'static str) -> impl FnOnce(FrameError) -> CliError {
        move |err| CliError::Frame(err.record().render(func))
    }
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse_from(rewrite_level_shorthand(std::env::args_os()));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "exiting with failure");
            eprintln!("{PROG}: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if io::stdout().is_terminal() {
        return Err(CliError::StdoutIsTerminal);
    }
    if io::stdin().is_terminal() {
        eprintln!("{PROG}: reading input from a terminal");
    }

    let mut config = match &cli.config {
        Some(path) => Lz4wConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Lz4wConfig::default(),
    };

    let log_level = cli.log.as_deref().unwrap_or(&config.log.level);
    let log_format = cli.log_format.unwrap_or(config.log.format);
    init_logging(log_level, log_format);

    if let Some(path) = cli.config.as_ref().filter(|p| !p.exists()) {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
    }

    cli.apply_to(&mut config);
    let options = config.frame.options();
    let mode = config.frame.content_size;
    let mut reads = ReadSizes::new(
        config.input.max_read,
        config.input.randomize,
        config.input.seed,
    );

    let mut out = stdout_file().context("duplicating stdout")?;
    let seekable = out.stream_position().is_ok();
    let sized = mode.wants_size(seekable);
    tracing::debug!(?mode, seekable, sized, level = options.level, "opening frame");

    let mut frame = if sized {
        FrameWriter::open_sized(out, &options)
    } else {
        FrameWriter::open(out, &options)
    }
    .map_err(CliError::frame("open"))?;

    let ended = pump(&mut io::stdin().lock(), &mut frame, &mut reads)
        .map_err(CliError::frame("write"))?;

    let content_size = frame.content_size();
    out = frame.close().map_err(CliError::frame("close"))?;
    out.flush().context("flushing stdout")?;
    tracing::info!(content_size, sized, "frame complete");

    match ended {
        PumpEnd::Eof => Ok(()),
        PumpEnd::InputFailed(e) => Err(CliError::Stdin(e)),
    }
}

/// Initialize tracing; output always goes to stderr since stdout carries the frame.
fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

/// A `File` on a duplicate of the stdout descriptor, so it can be repositioned.
#[cfg(unix)]
fn stdout_file() -> io::Result<File> {
    use std::os::fd::AsFd;
    Ok(File::from(io::stdout().as_fd().try_clone_to_owned()?))
}

#[cfg(windows)]
fn stdout_file() -> io::Result<File> {
    use std::os::windows::io::AsHandle;
    Ok(File::from(io::stdout().as_handle().try_clone_to_owned()?))
}

// ── Input loop ─────────────────────────────────────────────────────────────────

/// Picks the size of the next read from the input.
struct ReadSizes {
    max: usize,
    rng: Option<StdRng>,
}

impl ReadSizes {
    fn new(max: usize, randomize: bool, seed: Option<u64>) -> Self {
        let rng = randomize.then(|| match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        });
        Self { max: max.max(1), rng }
    }

    fn next(&mut self) -> usize {
        match &mut self.rng {
            Some(rng) => rng.gen_range(1..=self.max),
            None => self.max,
        }
    }
}

#[derive(Debug)]
enum PumpEnd {
    Eof,
    /// Reading stopped on an input error; the frame is still closable
    InputFailed(io::Error),
}

/// Feed `input` into the frame until end of input or a read error.
fn pump<R, W, E>(
    input: &mut R,
    frame: &mut FrameWriter<W, E>,
    reads: &mut ReadSizes,
) -> Result<PumpEnd, FrameError>
where
    R: Read,
    W: Write,
    E: CompressEngine,
{
    let mut buf = vec![0u8; reads.max];
    loop {
        let want = reads.next();
        match input.read(&mut buf[..want]) {
            Ok(0) => return Ok(PumpEnd::Eof),
            Ok(n) => frame.write(&buf[..n])?,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed, closing frame");
                return Ok(PumpEnd::InputFailed(e));
            }
        }
    }
}
