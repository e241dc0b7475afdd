use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use byteforge_asm::assemble_program;

#[derive(Parser, Debug)]
#[command(author, version, about = "ByteForge VM assembler")]
struct Opts {
    /// Input assembly file (one instruction per line, `label:` prefixes allowed)
    #[arg(short, long)]
    input: PathBuf,
    /// Output bytecode file
    #[arg(short, long)]
    output: PathBuf,
    /// Also write the label table as JSON
    #[arg(long, value_name = "FILE")]
    symbols: Option<PathBuf>,
    /// Refuse sources larger than this
    #[arg(long, default_value_t = 1024 * 1024)]
    max_input_bytes: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let len = fs::metadata(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?
        .len();
    anyhow::ensure!(
        len <= opts.max_input_bytes,
        "{} is {len} bytes, limit is {}",
        opts.input.display(),
        opts.max_input_bytes
    );
    let text = fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;

    let program = assemble_program(&text)
        .with_context(|| format!("assembling {}", opts.input.display()))?;

    fs::write(&opts.output, &program.code)
        .with_context(|| format!("writing {}", opts.output.display()))?;
    if let Some(path) = &opts.symbols {
        fs::write(path, serde_json::to_string_pretty(&program.labels)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    info!(
        bytes = program.code.len(),
        instructions = program.offsets.len(),
        labels = program.labels.len(),
        "assembled"
    );
    println!(
        "Assembled {} bytes to {}",
        program.code.len(),
        opts.output.display()
    );
    Ok(())
}
