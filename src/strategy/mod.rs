// Signal generation module
pub mod reversal;

pub use reversal::{analyze, DirectionMapping, ReversalConfig};
