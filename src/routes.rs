//! Route table capability and a radix-tree pattern table.
//!
//! Instrumentation wants the *pattern* a request matched (`/users/{id}`),
//! not the literal path (`/users/42`): patterns are a bounded label set,
//! paths are not. [`RouteTable`] is the lookup capability middleware
//! consumes; [`Routes`] implements it with one `matchit` tree per HTTP
//! method, the same layout the application router uses, so the two always
//! agree on what matches.

use std::collections::HashMap;

use http::Method;
use matchit::Router as PatternTree;

/// Pattern lookup over an application's registered routes.
///
/// Implemented by [`Routes`]; hosts with their own routing table can
/// implement it directly instead.
pub trait RouteTable: Send + Sync {
    /// Returns the registered pattern that `method` + `path` resolve to.
    fn match_route(&self, method: &Method, path: &str) -> Option<String>;
}

/// A method-keyed table of route patterns.
///
/// Patterns use `{name}` parameter syntax. Build it once at startup from
/// the same registrations the router sees:
///
/// ```rust
/// use http::Method;
/// use otelware::Routes;
///
/// let routes = Routes::new()
///     .on(Method::GET, "/users/{id}")
///     .on(Method::POST, "/users");
/// ```
pub struct Routes {
    trees: HashMap<Method, PatternTree<String>>,
}

impl Routes {
    pub fn new() -> Self {
        Self { trees: HashMap::new() }
    }

    /// Registers a pattern for a method. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is not valid route syntax, which is a
    /// programming error caught at startup.
    pub fn on(mut self, method: Method, pattern: &str) -> Self {
        self.trees
            .entry(method)
            .or_default()
            .insert(pattern, pattern.to_owned())
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self
    }
}

impl RouteTable for Routes {
    fn match_route(&self, method: &Method, path: &str) -> Option<String> {
        let tree = self.trees.get(method)?;
        let matched = tree.at(path).ok()?;
        Some(matched.value.clone())
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self::new()
    }
}
