use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Emotional class of a stimulus image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Neutral,
    Excitatory,
}

impl Category {
    pub fn prefix(self) -> char {
        match self {
            Category::Neutral => 'N',
            Category::Excitatory => 'E',
        }
    }
}

/// Position of a stimulus in the combined pool plus its class.
///
/// Rendered as `N-{index+1}` or `E-{index+1}`; the number always counts from 1
/// over the whole pool, so the first excitatory image after three neutral ones
/// is `E-4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StimulusId {
    pub index: usize,
    pub category: Category,
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category.prefix(), self.index + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stimulus id {0:?}, expected N-<n> or E-<n>")]
pub struct ParseStimulusIdError(pub String);

impl FromStr for StimulusId {
    type Err = ParseStimulusIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseStimulusIdError(s.to_string());
        let (prefix, number) = s.trim().split_once('-').ok_or_else(err)?;
        let category = match prefix {
            "N" => Category::Neutral,
            "E" => Category::Excitatory,
            _ => return Err(err()),
        };
        let number: usize = number.parse().map_err(|_| err())?;
        if number == 0 {
            return Err(err());
        }
        Ok(StimulusId {
            index: number - 1,
            category,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    pub id: StimulusId,
    pub image: PathBuf,
}

impl Stimulus {
    pub fn category(&self) -> Category {
        self.id.category
    }
}

/// All neutral stimuli followed by all excitatory ones. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct StimulusPool {
    stimuli: Vec<Stimulus>,
    neutral_count: usize,
}

impl StimulusPool {
    pub fn new(neutral: Vec<PathBuf>, excitatory: Vec<PathBuf>) -> Self {
        let neutral_count = neutral.len();
        let stimuli = neutral
            .into_iter()
            .map(|p| (Category::Neutral, p))
            .chain(excitatory.into_iter().map(|p| (Category::Excitatory, p)))
            .enumerate()
            .map(|(index, (category, image))| Stimulus {
                id: StimulusId { index, category },
                image,
            })
            .collect();
        Self {
            stimuli,
            neutral_count,
        }
    }

    pub fn len(&self) -> usize {
        self.stimuli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stimuli.is_empty()
    }

    pub fn neutral_count(&self) -> usize {
        self.neutral_count
    }

    pub fn excitatory_count(&self) -> usize {
        self.stimuli.len() - self.neutral_count
    }

    /// Both categories must be present for a session to be meaningful.
    pub fn is_complete(&self) -> bool {
        self.neutral_count() > 0 && self.excitatory_count() > 0
    }

    pub fn get(&self, index: usize) -> Option<&Stimulus> {
        self.stimuli.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stimulus> {
        self.stimuli.iter()
    }
}
