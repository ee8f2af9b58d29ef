pub use cgmath;
pub use channel::Channel;
pub use contact::{ContactPoint, EvalStats, Hit, History, SearchStats, Stats};
pub use dataset::{DataSet, Utility};
pub use engine::Engine;
pub use error::{CrgError, Result};
pub use loader::{load_bytes, load_file};
pub use options::{
    BorderMode, CurvatureMode, GridNanMode, OptionId, Options, RefLineContinuation, Value,
    ValueKind,
};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use util::Interval;

mod channel;
mod contact;
mod dataset;
mod engine;
mod error;
mod eval;
mod loader;
pub mod math;
mod options;
mod util;

#[cfg(test)]
mod fixtures;

new_key_type! {
    /// Unique ID of a loaded [DataSet].
    pub struct DataSetId;
    /// Unique ID of a [ContactPoint].
    pub struct ContactPointId;
}
