use crate::config::{Config, load_config};
use crate::dump::{write_diagnostics_dump, write_json};
use crate::pipeline::{Format, convert};
use crate::topology::stitcher::CurveDirection;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pmconv", version, about = "Convert pathway maps between diagram formats")]
pub struct Args {
    /// Input file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Input format. Sniffed from the document when omitted.
    #[arg(long = "from", value_enum)]
    pub from: Option<Format>,

    /// Output format
    #[arg(long = "to", value_enum, default_value = "layout")]
    pub to: Format,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Infer compartment boundaries from metabolite positions
    #[arg(long = "infer-compartments")]
    pub infer_compartments: bool,

    /// Direction of exported curves
    #[arg(long = "curve-direction", value_enum)]
    pub curve_direction: Option<DirectionArg>,

    /// Print collected diagnostics to stderr as JSON
    #[arg(long = "diagnostics")]
    pub diagnostics: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DirectionArg {
    Flow,
    MetaboliteToReaction,
}

impl From<DirectionArg> for CurveDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Flow => CurveDirection::Flow,
            DirectionArg::MetaboliteToReaction => CurveDirection::MetaboliteToReaction,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = apply_args(load_config(args.config.as_deref())?, &args);

    let input = read_input(args.input.as_deref())?;
    let from = args.from.or_else(|| args.input.as_deref().and_then(format_from_extension));
    let converted = convert(&input, from, args.to, &config)?;

    if args.diagnostics {
        write_diagnostics_dump(&converted.diagnostics)?;
    }
    write_json(&converted.value.to_value()?, args.output.as_deref())?;
    Ok(())
}

fn apply_args(mut config: Config, args: &Args) -> Config {
    if args.infer_compartments {
        config.export.infer_compartment_bounds = true;
    }
    if let Some(direction) = args.curve_direction {
        config.export.curve_direction = direction.into();
    }
    config
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Only compound extensions are decisive; plain `.json` is sniffed from content.
fn format_from_extension(path: &Path) -> Option<Format> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".layout.json") {
        Some(Format::Layout)
    } else if name.ends_with(".sbgn.json") || name.ends_with(".notation.json") {
        Some(Format::Notation)
    } else if name.ends_with(".map.json") || name.ends_with(".escher.json") {
        Some(Format::Map)
    } else {
        None
    }
}
