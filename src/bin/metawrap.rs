//! Command-line utility for inspecting metadata-wrapped files.
//!
//! `metawrap` reads a file (or stdin) that starts with a `key:value` header
//! block and prints either the payload, the header lines, or the sizes of both.

use std::{
    fs::File,
    io::{self, Write},
    os::fd::AsFd,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};

use metawrap::{FileStream, HeaderLimits, MetawrapStream, Stream, StreamReader};

/// metawrap
#[derive(Debug, Parser)]
#[clap(name = "metawrap", version)]
pub struct App {
    /// Character separating keys from values
    #[clap(long, default_value_t = ':')]
    separator: char,

    /// Longest header line accepted, in bytes
    #[clap(long)]
    max_line_len: Option<usize>,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the payload to stdout
    Cat {
        /// Input file, or '-' for stdin
        file: PathBuf,
    },
    /// Print the header lines
    Headers {
        /// Input file, or '-' for stdin
        file: PathBuf,
    },
    /// Print the header length and payload size
    Stat {
        /// Input file, or '-' for stdin
        file: PathBuf,
    },
}

fn open_input(path: &Path) -> Result<FileStream> {
    let file = if path.as_os_str() == "-" {
        let fd = io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .context("Duplicating stdin")?;
        File::from(fd)
    } else {
        File::open(path).with_context(|| format!("Opening {path:?}"))?
    };
    Ok(FileStream::new(file)?)
}

fn wrap<F>(app: &App, file: &Path, callback: F) -> Result<MetawrapStream<FileStream, F>>
where
    F: FnMut(&[u8], &[u8]),
{
    ensure!(app.separator.is_ascii(), "Separator must be an ASCII character");
    let mut limits = HeaderLimits::default();
    if let Some(max_line_len) = app.max_line_len {
        limits.max_line_len = max_line_len;
    }
    Ok(MetawrapStream::new(open_input(file)?, callback)
        .with_separator(app.separator as u8)
        .with_limits(limits))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = App::parse();
    let separator = args.separator;

    match &args.cmd {
        Command::Cat { file } => {
            let stream = wrap(&args, file, |_: &[u8], _: &[u8]| {})?;
            let mut reader = StreamReader::new(stream);
            let mut stdout = io::stdout().lock();
            io::copy(&mut reader, &mut stdout).context("Copying payload")?;
            stdout.flush()?;
        }
        Command::Headers { file } => {
            let mut stdout = io::stdout().lock();
            let mut result = Ok(());
            let mut stream = wrap(&args, file, |key: &[u8], value: &[u8]| {
                if result.is_ok() {
                    result = stdout
                        .write_all(key)
                        .and_then(|()| write!(stdout, "{separator}"))
                        .and_then(|()| stdout.write_all(value))
                        .and_then(|()| stdout.write_all(b"\n"));
                }
            })?;
            stream.stat(true).context("Reading header")?;
            drop(stream);
            result.context("Writing headers")?;
        }
        Command::Stat { file } => {
            let mut stream = wrap(&args, file, |_: &[u8], _: &[u8]| {})?;
            let size = stream.stat(true).context("Reading header")?;
            let header_len = stream.header_len().context("Header length unknown")?;
            println!("header: {header_len}");
            match size {
                Some(size) => println!("payload: {size}"),
                None => println!("payload: unknown"),
            }
        }
    }

    Ok(())
}
