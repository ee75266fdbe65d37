use std::path::Path;

use anyhow::Result;
use presage_rng::{RandomSourceKind, available_sources};

pub fn run(library: Option<&Path>) -> Result<()> {
    let sources = available_sources(library);
    println!("Found {} random source(s):\n", sources.len());
    for source in &sources {
        let kind = match &source.kind {
            RandomSourceKind::Pseudo => "pseudo".to_string(),
            RandomSourceKind::Hardware { library } => format!("hardware via {}", library.display()),
        };
        println!("  {:<32} {kind}", source.name);
    }
    Ok(())
}
