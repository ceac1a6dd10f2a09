//! Nested route declaration.
//!
//! ```ignore
//! recognizer.map(|m| {
//!     m.nest("/posts", "posts", |m| {
//!         m.route("/", "index");
//!         m.route("/:id", "show");
//!     });
//!     m.scope("/admin", |m| {
//!         m.route("/stats", "stats");
//!     });
//! })?;
//! ```
//!
//! `nest` binds a handler to a path and declares child routes relative to it;
//! every leaf produces one route whose spec chain holds one entry per level.
//! `scope` only contributes a path prefix and carries it down to all
//! descendants, so a deep path is assembled once.

use super::core::{Recognizer, RouteSpec};
use crate::error::Result;

#[derive(Debug)]
struct MapEntry<H> {
    path: String,
    handler: H,
    children: Option<RouteMap<H>>,
}

/// Routes declared at one nesting level.
#[derive(Debug)]
pub struct RouteMap<H> {
    entries: Vec<MapEntry<H>>,
}

impl<H> Default for RouteMap<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> RouteMap<H> {
    fn insert(&mut self, entry: MapEntry<H>) {
        match self.entries.iter_mut().find(|e| e.path == entry.path) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

/// Declaration context handed to `map` callbacks.
pub struct Mapper<'a, H> {
    prefix: String,
    map: &'a mut RouteMap<H>,
}

impl<'a, H> Mapper<'a, H> {
    fn new(prefix: String, map: &'a mut RouteMap<H>) -> Self {
        Self { prefix, map }
    }

    /// Declare a leaf route.
    pub fn route(&mut self, path: &str, handler: H) -> &mut Self {
        self.map.insert(MapEntry {
            path: format!("{}{}", self.prefix, path),
            handler,
            children: None,
        });
        self
    }

    /// Declare a route with child routes relative to it.
    pub fn nest<F>(&mut self, path: &str, handler: H, declare: F) -> &mut Self
    where
        F: FnOnce(&mut Mapper<'_, H>),
    {
        let mut children = RouteMap::default();
        declare(&mut Mapper::new(String::new(), &mut children));
        self.map.insert(MapEntry {
            path: format!("{}{}", self.prefix, path),
            handler,
            children: Some(children),
        });
        self
    }

    /// Group routes under a path prefix without binding a handler.
    pub fn scope<F>(&mut self, path: &str, declare: F) -> &mut Self
    where
        F: FnOnce(&mut Mapper<'_, H>),
    {
        let prefix = format!("{}{}", self.prefix, path);
        declare(&mut Mapper::new(prefix, &mut *self.map));
        self
    }
}

impl<H: Clone> Recognizer<H> {
    /// Declare routes through the nesting DSL and register every leaf chain.
    pub fn map<F>(&mut self, declare: F) -> Result<()>
    where
        F: FnOnce(&mut Mapper<'_, H>),
    {
        let mut root = RouteMap::default();
        declare(&mut Mapper::new(String::new(), &mut root));

        let mut chains = Vec::new();
        collect_chains(Vec::new(), root, &mut chains);
        for chain in chains {
            self.add(chain, None)?;
        }
        Ok(())
    }
}

fn collect_chains<H: Clone>(
    base: Vec<RouteSpec<H>>,
    map: RouteMap<H>,
    out: &mut Vec<Vec<RouteSpec<H>>>,
) {
    for entry in map.entries {
        let mut chain = base.clone();
        chain.push(RouteSpec::new(entry.path, entry.handler));
        match entry.children {
            Some(children) => collect_chains(chain, children, out),
            None => out.push(chain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_routes_bind_every_level() {
        let mut recognizer = Recognizer::new();
        recognizer
            .map(|m| {
                m.nest("/posts", "posts", |m| {
                    m.route("/:id", "show");
                    m.route("/new", "new");
                });
            })
            .unwrap();

        let result = recognizer.recognize("/posts/5").unwrap();
        let handlers: Vec<_> = result.matches.iter().map(|m| m.handler).collect();
        assert_eq!(handlers, vec!["posts", "show"]);
        assert!(result.matches[0].params.is_empty());
        assert_eq!(result.matches[1].params["id"], "5");

        let result = recognizer.recognize("/posts/new").unwrap();
        assert_eq!(result.matches[1].handler, "new");
    }

    #[test]
    fn test_scope_prefix_reaches_deep_descendants() {
        let mut recognizer = Recognizer::new();
        recognizer
            .map(|m| {
                m.scope("/api", |m| {
                    m.scope("/v1", |m| {
                        m.nest("/users", "users", |m| {
                            m.scope("/:user_id", |m| {
                                m.route("/posts/:post_id", "user_post");
                            });
                        });
                    });
                });
            })
            .unwrap();

        let result = recognizer.recognize("/api/v1/users/3/posts/9").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.matches[1].handler, "user_post");
        assert_eq!(result.matches[1].params["user_id"], "3");
        assert_eq!(result.matches[1].params["post_id"], "9");
        assert!(recognizer.recognize("/api/v1/users").is_none());
    }
}
