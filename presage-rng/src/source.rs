use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::bits::BitString;
use crate::error::RngError;
use crate::hardware::{HardwareRng, RegLibrary};

/// A generator of uniform bits.
pub trait RandomSource {
    fn name(&self) -> &str;
    /// Exactly `count` bits.
    fn get_bits(&mut self, count: usize) -> Result<BitString, RngError>;
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get_bits(&mut self, count: usize) -> Result<BitString, RngError> {
        (**self).get_bits(count)
    }
}

/// Software bits from a `StdRng`, one Bernoulli(0.5) draw each.
pub struct PseudoRng {
    rng: StdRng,
}

impl PseudoRng {
    pub const NAME: &'static str = "Pseudo-RNG";

    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for PseudoRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for PseudoRng {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn get_bits(&mut self, count: usize) -> Result<BitString, RngError> {
        Ok((0..count).map(|_| self.rng.random_bool(0.5)).collect())
    }
}

/// Replays a fixed bit sequence. Fails like a missing device once exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    bits: VecDeque<bool>,
}

impl ScriptedSource {
    /// Every `'1'` is a set bit; any other non-whitespace character is clear.
    pub fn new(script: &str) -> Self {
        Self {
            bits: script
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c == '1')
                .collect(),
        }
    }
}

impl RandomSource for ScriptedSource {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn get_bits(&mut self, count: usize) -> Result<BitString, RngError> {
        if self.bits.len() < count {
            return Err(RngError::DeviceUnavailable(format!(
                "scripted source exhausted: {} bit(s) left, {count} requested",
                self.bits.len()
            )));
        }
        Ok(self.bits.drain(..count).collect())
    }
}

/// Which generator a session draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RandomSourceKind {
    Pseudo,
    Hardware {
        library: PathBuf,
    },
}

/// Resolve a configured source once, before the session starts.
pub fn open_source(kind: &RandomSourceKind) -> Result<Box<dyn RandomSource + Send>, RngError> {
    match kind {
        RandomSourceKind::Pseudo => Ok(Box::new(PseudoRng::new())),
        RandomSourceKind::Hardware { library } => {
            let mut rng = HardwareRng::new(RegLibrary::load(library)?);
            let name = rng.probe()?;
            info!("using hardware RNG {name}");
            Ok(Box::new(rng))
        }
    }
}

/// An entry in the list of sources offered to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: RandomSourceKind,
}

/// The pseudo source, plus the hardware one when a device is attached.
pub fn available_sources(library: Option<&Path>) -> Vec<SourceInfo> {
    let mut sources = vec![SourceInfo {
        name: PseudoRng::NAME.to_string(),
        kind: RandomSourceKind::Pseudo,
    }];
    let Some(path) = library else {
        return sources;
    };
    let probed = RegLibrary::load(path).and_then(|lib| HardwareRng::new(lib).probe());
    match probed {
        Ok(name) => sources.push(SourceInfo {
            name,
            kind: RandomSourceKind::Hardware {
                library: path.to_path_buf(),
            },
        }),
        Err(e) => warn!("hardware RNG not offered: {e}"),
    }
    sources
}
