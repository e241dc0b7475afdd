use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;

use byteforge_asm::disasm::{fmt_decoded, Decoded};
use byteforge_asm::literal::parse_value;

use byteforge_disasm::{analyze_entries, block_edges, build_blocks, decode, load_raw_bin, read_u8, Block, EdgeOut, Image};

#[derive(Parser, Debug)]
#[command(author, version, about = "ByteForge bytecode disassembler", long_about=None)]
struct Cli {
    /// Address shown for the first loaded byte
    #[arg(long, default_value_t = 0usize)]
    base: usize,
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Input bytecode path
    #[arg(value_name = "BINFILE")]
    input: String,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Linear disassembly of [start, end); defaults to the whole image
    Range {
        start: Option<String>,
        end: Option<String>,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Follow control flow from entry points
    Analyze {
        /// Entry addresses (hex or dec). Repeat flag to add multiple entries.
        #[arg(long = "entry", value_name = "ADDR")]
        entries: Vec<String>,
        /// Maximum instructions to decode before stopping
        #[arg(long, default_value_t = 100_000usize)]
        max_instr: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Emit a listing of analyzed code (text format only)
        #[arg(long)]
        listing: bool,
        /// Show instruction bytes in listing
        #[arg(long)]
        show_bytes: bool,
        /// Import labels from an assembler symbol file ({ name: offset })
        #[arg(long, value_name = "FILE")]
        labels_in: Option<String>,
        /// Write analysis output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat { Text, Json }

#[derive(Debug, Clone, serde::Serialize)]
struct BlockOut { start: usize, end: usize, insns: Vec<String> }

#[derive(Debug, Clone, serde::Serialize)]
struct LabelKV { addr: usize, name: String }

#[derive(Debug, Clone, serde::Serialize)]
struct Report {
    entries: Vec<usize>,
    blocks: Vec<BlockOut>,
    edges: Vec<EdgeOut>,
    labels: Vec<LabelKV>,
}

fn parse_addr(s: &str) -> Result<usize> {
    parse_value(s)
        .map(|v| v as usize)
        .with_context(|| format!("bad address: {s}"))
}

fn render(img: &Image, d: &Decoded, show_bytes: bool) -> String {
    let pc = d.offset;
    let mut line = format!("{pc:#06x}: ");
    if show_bytes {
        for i in 0..d.width as usize {
            let _ = write!(line, "{:02x} ", read_u8(img, pc.wrapping_add(i)).unwrap_or(0));
        }
        line.push_str("  ");
    }
    line.push_str(&fmt_decoded(d));
    line
}

fn emit(text: &str, out: Option<String>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(&path, text).with_context(|| format!("writing {path}")),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let img = load_raw_bin(Path::new(&cli.input), cli.base, cli.skip, cli.len)
        .with_context(|| format!("loading {}", cli.input))?;
    debug!(base = img.base, len = img.bytes.len(), "image loaded");

    match cli.cmd {
        Command::Range { start, end, show_bytes, out } => {
            let start = start.as_deref().map(parse_addr).transpose()?.unwrap_or(img.base);
            let end = end.as_deref().map(parse_addr).transpose()?.unwrap_or(img.end());
            anyhow::ensure!(end >= start, "end must be >= start");

            let mut buf = String::new();
            let mut pc = start;
            while pc < end {
                if let Some(d) = decode(&img, pc) {
                    let _ = writeln!(buf, "{}", render(&img, &d, show_bytes));
                    pc = d.next();
                } else if let Some(b) = read_u8(&img, pc) {
                    let _ = writeln!(buf, "{pc:#06x}: .byte {b:#04x}");
                    pc += 1;
                } else {
                    let _ = writeln!(buf, "{pc:#06x}: <oob>");
                    break;
                }
            }
            emit(&buf, out)?;
        }
        Command::Analyze { entries, max_instr, format, listing, show_bytes, labels_in, out } => {
            let mut seeds: Vec<usize> = if entries.is_empty() {
                vec![img.base]
            } else {
                entries.iter().map(|e| parse_addr(e)).collect::<Result<_>>()?
            };
            seeds.sort_unstable();
            seeds.dedup();

            let analysis = analyze_entries(&img, &seeds, max_instr);
            let blocks = build_blocks(&analysis, &seeds);
            let edges = block_edges(&analysis, &blocks);

            let mut labels: HashMap<usize, String> = HashMap::new();
            if let Some(path) = &labels_in {
                let txt = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
                let symbols: BTreeMap<String, usize> = serde_json::from_str(&txt)
                    .with_context(|| format!("parsing {path}"))?;
                for (name, off) in symbols { labels.insert(img.base.wrapping_add(off), name); }
            }
            for &e in &seeds { labels.entry(e).or_insert_with(|| format!("sub_{e:04x}")); }
            for b in &blocks { labels.entry(b.start).or_insert_with(|| format!("loc_{:04x}", b.start)); }

            let mut buf = String::new();
            match format {
                OutputFormat::Json => {
                    let mut lbl_vec: Vec<LabelKV> = labels.iter().map(|(k, v)| LabelKV { addr: *k, name: v.clone() }).collect();
                    lbl_vec.sort_by_key(|kv| kv.addr);
                    let report = Report {
                        entries: seeds.clone(),
                        blocks: blocks_with_mnemonics(&img, &blocks, show_bytes),
                        edges,
                        labels: lbl_vec,
                    };
                    buf.push_str(&serde_json::to_string_pretty(&report)?);
                    buf.push('\n');
                }
                OutputFormat::Text => {
                    let _ = writeln!(buf, "Analysis summary:");
                    let _ = writeln!(buf, "  entries   : {:?}", seeds.iter().map(|a| format!("{a:#06x}")).collect::<Vec<_>>());
                    let _ = writeln!(buf, "  insts     : {}", analysis.visited.len());
                    let _ = writeln!(buf, "  blocks    : {}", blocks.len());
                    let _ = writeln!(buf, "  edges     : {}", edges.len());
                    let _ = writeln!(buf, "Edges:");
                    for e in &edges {
                        let _ = writeln!(buf, "  {:#06x} -> {:#06x} ({})", e.from, e.to, e.kind);
                    }
                    if listing {
                        let _ = writeln!(buf, "\nListing (analyzed PCs):");
                        for &pc in &analysis.visited {
                            if let Some(lbl) = labels.get(&pc) {
                                let _ = writeln!(buf, "{pc:#06x} <{lbl}>:");
                            }
                            if let Some(d) = decode(&img, pc) {
                                let _ = writeln!(buf, "  {}", render(&img, &d, show_bytes));
                            }
                        }
                    }
                }
            }
            emit(&buf, out)?;
        }
    }

    Ok(())
}

fn blocks_with_mnemonics(img: &Image, blocks: &[Block], show_bytes: bool) -> Vec<BlockOut> {
    blocks
        .iter()
        .map(|b| {
            let mut insns = Vec::new();
            let mut pc = b.start;
            while pc < b.end {
                let Some(d) = decode(img, pc) else { break };
                insns.push(render(img, &d, show_bytes));
                pc = d.next();
            }
            BlockOut { start: b.start, end: b.end, insns }
        })
        .collect()
}
