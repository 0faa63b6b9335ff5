//! armscope - An AArch64 disassembler for raw instruction words
//!
//! Usage:
//!   armscope <file>                      Disassemble the whole file
//!   armscope <file> --base 0x400000      Number instructions from a load address
//!   armscope <file> --offset 0x40 -n 16  Disassemble 16 words starting at 0x40
//!   armscope <file> --annotate           Append register and branch summaries

use anyhow::{Context, Result};
use armscope_disasm::{disassemble, ImmediateFormat, Options, Record};
use clap::Parser;
use flexi_logger::Logger;
use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "armscope")]
#[command(about = "An AArch64 disassembler for raw instruction words", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a file of little-endian instruction words
    file: PathBuf,

    /// Address of the first disassembled word (0 prints every address as 0)
    #[arg(short, long, value_parser = parse_hex, default_value = "0")]
    base: u64,

    /// File offset to start at
    #[arg(short, long, value_parser = parse_hex, default_value = "0")]
    offset: u64,

    /// Number of words to disassemble
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Print value immediates in decimal
    #[arg(short, long)]
    decimal: bool,

    /// Append the register-usage annotation to each line
    #[arg(short, long)]
    annotate: bool,

    /// Log specification, e.g. `debug` or `armscope_disasm=trace`
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_hex(s: &str) -> Result<u64, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logger = Logger::try_with_str(&cli.log_level)
        .with_context(|| format!("Invalid log specification: {}", cli.log_level))?
        .log_to_stderr()
        .start()
        .context("Failed to start logger")?;

    let mut file = File::open(&cli.file)
        .with_context(|| format!("Failed to open {}", cli.file.display()))?;
    file.seek(SeekFrom::Start(cli.offset))
        .with_context(|| format!("Failed to seek to offset {:#x}", cli.offset))?;

    let options = Options::default()
        .with_base_address(cli.base)
        .with_immediate_format(ImmediateFormat::from(cli.decimal));
    log::info!(
        "disassembling {} from offset {:#x}",
        cli.file.display(),
        cli.offset
    );

    let stream = disassemble(BufReader::new(file), options);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for record in stream.take(cli.count.unwrap_or(usize::MAX)) {
        let Record {
            text,
            annotation,
            error,
            ..
        } = record;

        if let Some(error) = error.filter(|e| e.is_fatal()) {
            out.flush()?;
            return Err(anyhow::Error::new(error)
                .context(format!("Failed to disassemble {}", cli.file.display())));
        }

        if cli.annotate && !annotation.is_empty() {
            writeln!(out, "{}\t; {}", text, annotation)?;
        } else {
            writeln!(out, "{}", text)?;
        }
    }

    out.flush()?;
    Ok(())
}
