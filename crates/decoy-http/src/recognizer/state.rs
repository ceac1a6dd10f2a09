//! Nondeterministic automaton shared by every route of one recognizer.
//!
//! States live in an arena and refer to each other by [`StateId`]. Each state
//! carries the character specification that leads into it and the ordered list
//! of successors. Routes that share a prefix with identical specifications
//! share states, so the structure is a prefix trie with self-loops on the
//! states of unbounded segments.

use super::segment::{Segment, SegmentTally};
use regex::Regex;

/// Index of a state in the automaton arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(usize);

/// Acceptance rule for the character leading into a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharRule {
    /// The root state; it is never a successor.
    Root,
    /// Accepts any character contained in the set.
    Valid(String),
    /// Accepts any character not contained in the set.
    Invalid(String),
}

/// A character specification: an acceptance rule plus the repeat flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSpec {
    pub rule: CharRule,
    pub repeat: bool,
}

impl CharSpec {
    pub fn valid(ch: char) -> Self {
        Self {
            rule: CharRule::Valid(ch.to_string()),
            repeat: false,
        }
    }

    pub fn invalid(chars: &str) -> Self {
        Self {
            rule: CharRule::Invalid(chars.to_string()),
            repeat: false,
        }
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    fn root() -> Self {
        Self {
            rule: CharRule::Root,
            repeat: false,
        }
    }

    /// Whether a transition into this state consumes `ch`.
    pub fn accepts(&self, ch: char) -> bool {
        match &self.rule {
            CharRule::Root => false,
            CharRule::Valid(chars) => chars.contains(ch),
            CharRule::Invalid(chars) => !chars.contains(ch),
        }
    }
}

/// One handler bound at an accepting state together with the names of the
/// captures it consumes.
#[derive(Debug, Clone)]
pub struct HandlerBinding<H> {
    pub handler: H,
    pub names: Vec<String>,
}

/// Extra data held by a state that terminates at least one complete route.
#[derive(Debug, Clone)]
pub struct Accepting<H> {
    /// Anchored pattern extracting every capture of the route, in order.
    pub pattern: Regex,
    /// The route's last non-empty segment is a star segment.
    pub ends_with_star: bool,
    pub handlers: Vec<HandlerBinding<H>>,
    pub tally: SegmentTally,
}

#[derive(Debug, Clone)]
struct State<H> {
    spec: CharSpec,
    next: Vec<StateId>,
    accepting: Option<Accepting<H>>,
}

impl<H> State<H> {
    fn new(spec: CharSpec) -> Self {
        Self {
            spec,
            next: Vec::new(),
            accepting: None,
        }
    }
}

/// The append-only automaton.
#[derive(Debug, Clone)]
pub struct Automaton<H> {
    states: Vec<State<H>>,
}

impl<H> Default for Automaton<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Automaton<H> {
    pub fn new() -> Self {
        Self {
            states: vec![State::new(CharSpec::root())],
        }
    }

    pub fn root(&self) -> StateId {
        StateId(0)
    }

    /// Number of states, the root included.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.len() == 1
    }

    /// Return the child of `from` reached through `spec`, creating it if needed.
    ///
    /// Children are matched on the acceptance rule only. A newly created
    /// repeating state is linked to itself.
    pub fn put(&mut self, from: StateId, spec: CharSpec) -> StateId {
        let existing = self.states[from.0]
            .next
            .iter()
            .copied()
            .find(|child| self.states[child.0].spec.rule == spec.rule);
        if let Some(child) = existing {
            return child;
        }

        let id = StateId(self.states.len());
        let repeat = spec.repeat;
        self.states.push(State::new(spec));
        self.states[from.0].next.push(id);
        if repeat {
            self.states[id.0].next.push(id);
        }
        id
    }

    /// Insert every character specification of `segment` after `from`.
    pub fn add_segment(&mut self, from: StateId, segment: &Segment) -> StateId {
        segment
            .char_specs()
            .into_iter()
            .fold(from, |current, spec| self.put(current, spec))
    }

    /// Successors of all `states` that accept `ch`.
    ///
    /// Several states may be active at once; duplicates are collapsed while
    /// keeping first-seen order.
    pub fn step(&self, states: &[StateId], ch: char) -> Vec<StateId> {
        let mut next = Vec::new();
        for state in states {
            for child in &self.states[state.0].next {
                if self.states[child.0].spec.accepts(ch) && !next.contains(child) {
                    next.push(*child);
                }
            }
        }
        next
    }

    /// Mark `state` as accepting, replacing any previous route data.
    pub fn accept(&mut self, state: StateId, accepting: Accepting<H>) {
        self.states[state.0].accepting = Some(accepting);
    }

    pub fn accepting(&self, state: StateId) -> Option<&Accepting<H>> {
        self.states[state.0].accepting.as_ref()
    }

    pub fn spec(&self, state: StateId) -> &CharSpec {
        &self.states[state.0].spec
    }

    pub fn successors(&self, state: StateId) -> &[StateId] {
        &self.states[state.0].next
    }
}
