//! Route path compilation into typed segments.
//!
//! A route string such as `/posts/:id/*rest` is split on `/` and each piece is
//! classified as static text, a named dynamic segment, a named star segment or
//! an empty segment. Each segment knows how to expand itself into automaton
//! character specifications, into a capture-pattern fragment and back into a
//! concrete path piece.

use super::state::CharSpec;
use std::collections::HashMap;

/// One `/`-delimited unit of a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, matched exactly.
    Static(String),
    /// `:name`, one or more characters excluding `/`.
    Dynamic(String),
    /// `*name`, one or more characters including `/`.
    Star(String),
    /// Produced by a leading, trailing or duplicate `/`.
    Empty,
}

/// Count of each segment type in a route, used to rank competing matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentTally {
    pub statics: usize,
    pub dynamics: usize,
    pub stars: usize,
}

/// Output of [`compile`].
#[derive(Debug, Clone, Default)]
pub struct CompiledPath {
    pub segments: Vec<Segment>,
    /// Dynamic and star names in left-to-right order.
    pub names: Vec<String>,
}

impl Segment {
    /// Classify one path piece.
    ///
    /// A lone `:` or `*` has no name and stays static.
    pub fn parse(piece: &str) -> Segment {
        if let Some(name) = piece.strip_prefix(':').filter(|n| !n.is_empty()) {
            Segment::Dynamic(name.to_string())
        } else if let Some(name) = piece.strip_prefix('*').filter(|n| !n.is_empty()) {
            Segment::Star(name.to_string())
        } else if piece.is_empty() {
            Segment::Empty
        } else {
            Segment::Static(piece.to_string())
        }
    }

    /// Name captured by this segment, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Segment::Dynamic(name) | Segment::Star(name) => Some(name),
            Segment::Static(_) | Segment::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Segment::Empty)
    }

    /// Character specifications this segment contributes to the automaton.
    pub fn char_specs(&self) -> Vec<CharSpec> {
        match self {
            Segment::Static(text) => text.chars().map(CharSpec::valid).collect(),
            Segment::Dynamic(_) => vec![CharSpec::invalid("/").repeating()],
            Segment::Star(_) => vec![CharSpec::invalid("").repeating()],
            Segment::Empty => Vec::new(),
        }
    }

    /// Regular-expression fragment used to extract captures.
    pub fn pattern(&self) -> String {
        match self {
            Segment::Static(text) => regex::escape(text),
            Segment::Dynamic(_) => "([^/]+)".to_string(),
            Segment::Star(_) => "((?s).+)".to_string(),
            Segment::Empty => String::new(),
        }
    }

    /// Concrete path piece for this segment.
    ///
    /// Missing parameters generate an empty piece.
    pub fn generate(&self, params: &HashMap<String, String>) -> String {
        match self {
            Segment::Static(text) => text.clone(),
            Segment::Dynamic(name) | Segment::Star(name) => {
                params.get(name).cloned().unwrap_or_default()
            }
            Segment::Empty => String::new(),
        }
    }

    fn tally(&self, tally: &mut SegmentTally) {
        match self {
            Segment::Static(_) => tally.statics += 1,
            Segment::Dynamic(_) => tally.dynamics += 1,
            Segment::Star(_) => tally.stars += 1,
            Segment::Empty => {}
        }
    }
}

/// Compile a route path into segments, accumulating segment counts into `tally`.
///
/// A single leading `/` is stripped; no syntax errors are possible since any
/// unrecognized piece is treated as static text.
pub fn compile(route: &str, tally: &mut SegmentTally) -> CompiledPath {
    let route = route.strip_prefix('/').unwrap_or(route);
    let mut compiled = CompiledPath::default();

    for piece in route.split('/') {
        let segment = Segment::parse(piece);
        if let Some(name) = segment.name() {
            compiled.names.push(name.to_string());
        }
        segment.tally(tally);
        compiled.segments.push(segment);
    }

    compiled
}
