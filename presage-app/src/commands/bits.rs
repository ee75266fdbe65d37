use std::path::PathBuf;

use anyhow::{Context, Result};
use presage_rng::{RandomSourceKind, open_source};

use crate::SourceArg;

pub fn run(source: SourceArg, library: Option<PathBuf>, count: usize) -> Result<()> {
    let kind = match source {
        SourceArg::Pseudo => RandomSourceKind::Pseudo,
        SourceArg::Hardware => RandomSourceKind::Hardware {
            library: library.context("--library is required for the hardware source")?,
        },
    };
    let mut source = open_source(&kind)?;
    let bits = source.get_bits(count)?;
    println!("{}: {bits}", source.name());
    if let Ok(value) = bits.to_u64() {
        println!("as integer: {value}");
    }
    Ok(())
}
