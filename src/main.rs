use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracedis::capture::Capture;
use tracedis::dis::CpuType;
use tracedis::list::write_listing;

//===========================================================================//

#[derive(Parser)]
#[clap(author, about, long_about = None, version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Disassembles a captured instruction-fetch trace.
    List {
        /// The processor that produced the trace.
        #[clap(long, value_enum)]
        cpu: CpuArg,
        /// Treat the file as a raw memory image instead of hex trace text.
        #[clap(long)]
        raw: bool,
        /// The load address of a raw memory image, in hex.
        #[clap(long, default_value = "0", value_parser = parse_hex_addr)]
        origin: u32,
        /// The capture file to disassemble.
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CpuArg {
    #[clap(name = "6502")]
    Mos6502,
    #[clap(name = "65c02")]
    Wdc65c02,
    #[clap(name = "6800")]
    Mc6800,
    #[clap(name = "6809")]
    Mc6809,
    #[clap(name = "6809e")]
    Mc6809e,
    #[clap(name = "z80")]
    Z80,
}

impl From<CpuArg> for CpuType {
    fn from(value: CpuArg) -> CpuType {
        match value {
            CpuArg::Mos6502 => CpuType::Mos6502,
            CpuArg::Wdc65c02 => CpuType::Wdc65c02,
            CpuArg::Mc6800 => CpuType::Mc6800,
            CpuArg::Mc6809 => CpuType::Mc6809,
            CpuArg::Mc6809e => CpuType::Mc6809e,
            CpuArg::Z80 => CpuType::Z80,
        }
    }
}

fn parse_hex_addr(arg: &str) -> Result<u32, String> {
    let digits = arg.strip_prefix("0x").unwrap_or(arg);
    u32::from_str_radix(digits, 16).map_err(|error| error.to_string())
}

//===========================================================================//

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::List { cpu, raw, origin, file } => {
            let bytes = fs::read(&file)?;
            let capture = if raw {
                Capture::from_raw(origin, &bytes)
            } else {
                Capture::parse_hex(&bytes).map_err(|error| {
                    io::Error::new(io::ErrorKind::InvalidData, error)
                })?
            };
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_listing(&mut handle, CpuType::from(cpu), &capture)?;
            handle.flush()?;
        }
    }
    Ok(())
}

//===========================================================================//
