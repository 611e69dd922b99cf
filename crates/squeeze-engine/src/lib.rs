//! The run controller and sink façade, kept separate from `main.rs` so
//! integration tests can drive `run()` directly against fake providers.

pub mod run;
pub mod sink;

pub use run::{run, RunContext};
pub use sink::{DiscoverySink, JsonFileSink, NullSink};
