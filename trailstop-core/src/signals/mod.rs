//! Signal generation: indicator feed in, time-ordered entry candidates out.

pub mod generator;

pub use generator::generate_signals;
