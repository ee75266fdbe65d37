pub mod bits;
pub mod error;
pub mod hardware;
pub mod sampler;
pub mod source;

pub use bits::BitString;
pub use error::RngError;
pub use hardware::{HardwareRng, RegDriver, RegLibrary};
pub use sampler::{bit_length, sample_interval, select_index};
pub use source::{
    PseudoRng, RandomSource, RandomSourceKind, ScriptedSource, SourceInfo, available_sources,
    open_source,
};
