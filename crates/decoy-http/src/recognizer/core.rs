//! Route recognizer: registration, recognition and reverse generation.

use super::query::{self, QueryParams};
use super::segment::{compile, Segment, SegmentTally};
use super::state::{Accepting, Automaton, HandlerBinding};
use crate::error::{DecoyError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// One level of a route declaration: a path piece and its handler.
///
/// Nested declarations produce a chain of specs whose paths are concatenated.
#[derive(Debug, Clone)]
pub struct RouteSpec<H> {
    pub path: String,
    pub handler: H,
}

impl<H> RouteSpec<H> {
    pub fn new(path: impl Into<String>, handler: H) -> Self {
        Self {
            path: path.into(),
            handler,
        }
    }
}

/// A recognized handler with the parameters it captured.
#[derive(Debug, Clone)]
pub struct RouteMatch<H> {
    pub handler: H,
    pub params: HashMap<String, String>,
    pub is_dynamic: bool,
}

/// Result of a successful recognition: one match per handler bound to the
/// winning route, plus the parsed query string.
#[derive(Debug, Clone)]
pub struct Recognition<H> {
    pub matches: Vec<RouteMatch<H>>,
    pub query_params: QueryParams,
}

impl<H> Recognition<H> {
    pub fn first(&self) -> Option<&RouteMatch<H>> {
        self.matches.first()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[derive(Debug, Clone)]
struct NamedRoute<H> {
    segments: Vec<Segment>,
    handlers: Vec<HandlerBinding<H>>,
}

/// Recognizes paths against every route registered for one HTTP method.
#[derive(Debug, Clone)]
pub struct Recognizer<H> {
    automaton: Automaton<H>,
    names: HashMap<String, NamedRoute<H>>,
}

impl<H: Clone> Default for Recognizer<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> Recognizer<H> {
    pub fn new() -> Self {
        Self {
            automaton: Automaton::new(),
            names: HashMap::new(),
        }
    }

    /// Register a single route.
    pub fn add_route(&mut self, path: &str, handler: H) -> Result<()> {
        self.add(vec![RouteSpec::new(path, handler)], None)
    }

    /// Register a chain of route specs as one route, optionally under `name`
    /// for later generation.
    ///
    /// Registering a textually identical route again replaces the handlers
    /// bound at its terminal state.
    pub fn add(&mut self, routes: Vec<RouteSpec<H>>, name: Option<&str>) -> Result<()> {
        let mut current = self.automaton.root();
        let mut pattern = String::from("^");
        let mut tally = SegmentTally::default();
        let mut handlers = Vec::with_capacity(routes.len());
        let mut all_segments = Vec::new();
        let mut is_empty = true;
        let mut ends_with_star = false;
        let full_path: String = routes.iter().map(|r| r.path.as_str()).collect();

        for route in routes {
            let compiled = compile(&route.path, &mut tally);

            for segment in &compiled.segments {
                if segment.is_empty() {
                    continue;
                }
                is_empty = false;

                current = self.automaton.add_segment(current, &Segment::Static("/".into()));
                pattern.push('/');

                current = self.automaton.add_segment(current, segment);
                pattern.push_str(&segment.pattern());
                ends_with_star = matches!(segment, Segment::Star(_));
            }

            all_segments.extend(compiled.segments);
            handlers.push(HandlerBinding {
                handler: route.handler,
                names: compiled.names,
            });
        }

        if is_empty {
            current = self.automaton.add_segment(current, &Segment::Static("/".into()));
            pattern.push('/');
        }
        pattern.push('$');

        let pattern = Regex::new(&pattern).map_err(|e| DecoyError::InvalidRoute {
            path: full_path.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            "Registered route {} (statics={}, dynamics={}, stars={})",
            full_path, tally.statics, tally.dynamics, tally.stars
        );

        self.automaton.accept(
            current,
            Accepting {
                pattern,
                ends_with_star,
                handlers: handlers.clone(),
                tally,
            },
        );

        if let Some(name) = name {
            self.names.insert(
                name.to_string(),
                NamedRoute {
                    segments: all_segments,
                    handlers,
                },
            );
        }

        Ok(())
    }

    /// Handlers of the named route, in declaration order.
    pub fn handlers_for(&self, name: &str) -> Result<Vec<HandlerBinding<H>>> {
        self.names
            .get(name)
            .map(|route| route.handlers.clone())
            .ok_or_else(|| DecoyError::UnknownRoute(name.to_string()))
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Build a concrete path for the named route.
    pub fn generate(
        &self,
        name: &str,
        params: &HashMap<String, String>,
        query_params: Option<&QueryParams>,
    ) -> Result<String> {
        let route = self
            .names
            .get(name)
            .ok_or_else(|| DecoyError::UnknownRoute(name.to_string()))?;

        let mut output = String::new();
        for segment in route.segments.iter().filter(|s| !s.is_empty()) {
            output.push('/');
            output.push_str(&segment.generate(params));
        }
        if !output.starts_with('/') {
            output.insert(0, '/');
        }

        if let Some(query_params) = query_params {
            output.push_str(&query::encode(query_params));
        }

        Ok(output)
    }

    /// Recognize `path`, returning the handlers of the best-ranked route.
    pub fn recognize(&self, path: &str) -> Option<Recognition<H>> {
        let mut path = query::decode_uri(path);
        let mut query_params = QueryParams::new();

        if let Some(start) = path.find('?') {
            query_params = query::parse(&path[start + 1..]);
            path.truncate(start);
        }

        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let mut slash_dropped = false;
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
            slash_dropped = true;
        }

        let mut states = vec![self.automaton.root()];
        for ch in path.chars() {
            states = self.automaton.step(&states, ch);
            if states.is_empty() {
                break;
            }
        }

        let mut solutions: Vec<&Accepting<H>> = states
            .iter()
            .filter_map(|state| self.automaton.accepting(*state))
            .collect();
        solutions.sort_by(|a, b| rank(&a.tally, &b.tally));

        let Some(state) = solutions.first() else {
            debug!("No route recognized for {}", path);
            return None;
        };

        if slash_dropped && state.ends_with_star {
            path.push('/');
        }

        let Some(captures) = state.pattern.captures(&path) else {
            debug!("Route pattern {} did not match {}", state.pattern, path);
            return None;
        };

        let mut capture_index = 1;
        let matches = state
            .handlers
            .iter()
            .map(|binding| {
                let params = binding
                    .names
                    .iter()
                    .map(|name| {
                        let value = captures
                            .get(capture_index)
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default();
                        capture_index += 1;
                        (name.clone(), value)
                    })
                    .collect();
                RouteMatch {
                    handler: binding.handler.clone(),
                    params,
                    is_dynamic: !binding.names.is_empty(),
                }
            })
            .collect();

        Some(Recognition {
            matches,
            query_params,
        })
    }

    /// Number of automaton states, the root included.
    pub fn state_count(&self) -> usize {
        self.automaton.len()
    }
}

/// Order candidate routes, best first.
///
/// Fewer stars win. Among routes with stars, more statics then more dynamics
/// win. Otherwise fewer dynamics then more statics win.
fn rank(a: &SegmentTally, b: &SegmentTally) -> Ordering {
    a.stars
        .cmp(&b.stars)
        .then_with(|| {
            if a.stars > 0 {
                b.statics
                    .cmp(&a.statics)
                    .then_with(|| b.dynamics.cmp(&a.dynamics))
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.dynamics.cmp(&b.dynamics))
        .then_with(|| b.statics.cmp(&a.statics))
}
