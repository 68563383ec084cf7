//! Radix tree for HTTP route matching
//!
//! The tree is built from path templates split into segments. Each node holds
//! the routes that terminate there (keyed by HTTP method) and four kinds of
//! children, tried in this order at every depth:
//!
//! 1. static children (exact segment match)
//! 2. pattern children (regex-constrained or multi-parameter segments)
//! 3. parameter children (`:name`, any non-empty segment)
//! 4. the wildcard child (`*`, the rest of the path)
//!
//! Matching backtracks: if a static branch fails deeper down, the parametric
//! branches at the same depth are still tried, so static > parametric >
//! wildcard holds for every request, not just for the first segment.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;

use super::path::{decode, split_path, Segment, WILDCARD_KEY};
use super::{ParamVec, Route, SUPPORTED_METHODS};

/// Node in the radix tree, one per distinct template segment
#[derive(Clone)]
struct RadixNode {
    /// Segment this node matches (the root holds an empty static segment)
    segment: Segment,
    /// Routes terminating at this node, per HTTP method
    routes: HashMap<Method, Arc<Route>>,
    statics: Vec<RadixNode>,
    patterns: Vec<RadixNode>,
    params: Vec<RadixNode>,
    wildcard: Option<Box<RadixNode>>,
}

impl RadixNode {
    fn new(segment: Segment) -> Self {
        Self {
            segment,
            routes: HashMap::new(),
            statics: Vec::new(),
            patterns: Vec::new(),
            params: Vec::new(),
            wildcard: None,
        }
    }

    /// Insert a route. Returns `false` if the method is already taken at the
    /// terminal node.
    fn insert(&mut self, segments: &[Segment], method: Method, route: Arc<Route>) -> bool {
        let Some((first, rest)) = segments.split_first() else {
            if self.routes.contains_key(&method) {
                return false;
            }
            self.routes.insert(method, route);
            return true;
        };

        let child = match first {
            Segment::Static(_) => find_or_push(&mut self.statics, first),
            Segment::Pattern(_) => find_or_push(&mut self.patterns, first),
            Segment::Param(_) => find_or_push(&mut self.params, first),
            Segment::Wildcard => self
                .wildcard
                .get_or_insert_with(|| Box::new(RadixNode::new(Segment::Wildcard))),
        };
        child.insert(rest, method, route)
    }

    fn search(
        &self,
        segments: &[&str],
        method: &Method,
        params: &mut ParamVec,
    ) -> Option<Arc<Route>> {
        let Some((first, rest)) = segments.split_first() else {
            if let Some(route) = self.routes.get(method) {
                return Some(Arc::clone(route));
            }
            // A wildcard also matches an empty remainder
            let route = self.wildcard.as_ref()?.routes.get(method)?;
            params.push((Arc::clone(&WILDCARD_KEY), String::new()));
            return Some(Arc::clone(route));
        };

        for child in &self.statics {
            if matches!(&child.segment, Segment::Static(s) if s == first) {
                if let Some(route) = child.search(rest, method, params) {
                    return Some(route);
                }
            }
        }

        let mark = params.len();
        for child in &self.patterns {
            if let Segment::Pattern(pattern) = &child.segment {
                if pattern.capture(first, params) {
                    if let Some(route) = child.search(rest, method, params) {
                        return Some(route);
                    }
                    // Backtrack: drop what this branch captured
                    params.truncate(mark);
                }
            }
        }

        if !first.is_empty() {
            for child in &self.params {
                if let Segment::Param(name) = &child.segment {
                    params.push((Arc::clone(name), decode(first)));
                    if let Some(route) = child.search(rest, method, params) {
                        return Some(route);
                    }
                    params.truncate(mark);
                }
            }
        }

        let wildcard = self.wildcard.as_ref()?;
        let route = wildcard.routes.get(method)?;
        params.push((Arc::clone(&WILDCARD_KEY), decode(&segments.join("/"))));
        Some(Arc::clone(route))
    }

    fn label(&self) -> String {
        match &self.segment {
            Segment::Static(s) => s.clone(),
            Segment::Param(name) => format!(":{name}"),
            Segment::Pattern(p) => p.source().to_string(),
            Segment::Wildcard => "*".to_string(),
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let label = if depth == 0 {
            "/".to_string()
        } else {
            self.label()
        };
        write!(f, "{}{}", "  ".repeat(depth), label)?;
        if !self.routes.is_empty() {
            let mut methods: Vec<&str> = self.routes.keys().map(Method::as_str).collect();
            methods.sort_unstable();
            write!(f, " [{}]", methods.join(", "))?;
        }
        writeln!(f)?;
        for child in self
            .statics
            .iter()
            .chain(&self.patterns)
            .chain(&self.params)
            .chain(self.wildcard.as_deref())
        {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

fn find_or_push<'a>(nodes: &'a mut Vec<RadixNode>, segment: &Segment) -> &'a mut RadixNode {
    let index = match nodes.iter().position(|n| n.segment.same_as(segment)) {
        Some(i) => i,
        None => {
            nodes.push(RadixNode::new(segment.clone()));
            nodes.len() - 1
        }
    };
    &mut nodes[index]
}

/// Radix tree of mounted routes
///
/// Lookup cost is proportional to the number of path segments, not the number
/// of routes, apart from backtracking across sibling parametric branches.
#[derive(Clone)]
pub(crate) struct RadixTree {
    root: RadixNode,
    ignore_trailing_slash: bool,
}

impl RadixTree {
    pub(crate) fn new(ignore_trailing_slash: bool) -> Self {
        Self {
            root: RadixNode::new(Segment::Static(String::new())),
            ignore_trailing_slash,
        }
    }

    /// Register a route under parsed template segments. Returns `false` when
    /// the same method is already mounted on an identical template.
    pub(crate) fn insert(&mut self, segments: &[Segment], method: Method, route: Arc<Route>) -> bool {
        self.root.insert(segments, method, route)
    }

    /// Find the route for `method` + `path`, with its extracted parameters
    pub(crate) fn find(&self, method: &Method, path: &str) -> Option<(Arc<Route>, ParamVec)> {
        let segments = split_path(path, self.ignore_trailing_slash);
        let mut params = ParamVec::new();
        let route = self.root.search(&segments, method, &mut params)?;
        Some((route, params))
    }

    /// Supported methods that have a route matching `path`
    pub(crate) fn methods_for(&self, path: &str) -> Vec<Method> {
        let segments = split_path(path, self.ignore_trailing_slash);
        SUPPORTED_METHODS
            .iter()
            .filter(|method| {
                let mut params = ParamVec::new();
                self.root.search(&segments, method, &mut params).is_some()
            })
            .cloned()
            .collect()
    }
}

impl fmt::Display for RadixTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write_tree(f, 0)
    }
}
