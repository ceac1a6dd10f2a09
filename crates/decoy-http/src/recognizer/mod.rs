//! Path-pattern route recognition.
//!
//! This module provides:
//! - `segment`: compilation of route strings into typed segments
//! - `state`: the shared nondeterministic automaton
//! - `core`: the `Recognizer` (registration, recognition, generation)
//! - `map`: nested route declaration
//! - `query`: query-string encoding and decoding

mod core;
mod map;
pub mod query;
mod segment;
mod state;


pub use self::core::{Recognition, Recognizer, RouteMatch, RouteSpec};
pub use map::{Mapper, RouteMap};
pub use query::{QueryParams, QueryValue};
pub use segment::{compile, CompiledPath, Segment, SegmentTally};
pub use state::{Accepting, Automaton, CharRule, CharSpec, HandlerBinding, StateId};
