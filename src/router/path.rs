//! Path template grammar.
//!
//! ```text
//!  Syntax            Type
//!  users             static segment
//!  :id               named parameter (one whole segment)
//!  :from-:to         several parameters sharing a segment, split on the literal between them
//!  :id(^\d+$)        parameter constrained by a regular expression
//!  *                 wildcard, matches the rest of the path (last segment only)
//! ```
//!
//! Regex-constrained parameters work, but every request that reaches such a
//! node pays for a regex evaluation. Prefer plain parameters on hot routes.

use std::borrow::Cow;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use super::ParamVec;

/// Parameter key under which the wildcard remainder is stored
pub const WILDCARD_PARAM: &str = "*";

pub(crate) static WILDCARD_KEY: Lazy<Arc<str>> = Lazy::new(|| Arc::from(WILDCARD_PARAM));

/// Request paths rarely have more than 16 segments
pub(crate) type SegmentVec<'a> = SmallVec<[&'a str; 16]>;

/// One parsed segment of a path template
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    Static(String),
    Param(Arc<str>),
    Pattern(SegmentPattern),
    Wildcard,
}

impl Segment {
    /// Whether two template segments would occupy the same tree node
    pub(crate) fn same_as(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Static(a), Segment::Static(b)) => a == b,
            (Segment::Param(a), Segment::Param(b)) => a == b,
            (Segment::Pattern(a), Segment::Pattern(b)) => a.source == b.source,
            (Segment::Wildcard, Segment::Wildcard) => true,
            _ => false,
        }
    }
}

/// A segment holding a constrained parameter or several parameters
#[derive(Debug, Clone)]
pub(crate) struct SegmentPattern {
    source: String,
    regex: Regex,
    names: Vec<Arc<str>>,
}

impl SegmentPattern {
    /// Template text this pattern was compiled from
    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// Match `segment` and push the captured parameters. Returns `false`
    /// without touching `params` when the segment does not match.
    pub(crate) fn capture(&self, segment: &str, params: &mut ParamVec) -> bool {
        let Some(caps) = self.regex.captures(segment) else {
            return false;
        };
        let mark = params.len();
        for (i, name) in self.names.iter().enumerate() {
            match caps.name(&group_name(i)) {
                Some(m) => params.push((Arc::clone(name), decode(m.as_str()))),
                None => {
                    params.truncate(mark);
                    return false;
                }
            }
        }
        true
    }
}

enum Part {
    Literal(String),
    Param {
        name: String,
        constraint: Option<String>,
    },
}

fn group_name(index: usize) -> String {
    format!("p{index}")
}

/// Percent-decode a parameter value, keeping the raw text if it is not valid UTF-8
pub(crate) fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

/// Split a request path into segments.
///
/// `/` yields no segments; a trailing slash yields a trailing empty segment
/// unless `ignore_trailing_slash` is set.
pub(crate) fn split_path(path: &str, ignore_trailing_slash: bool) -> SegmentVec<'_> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let mut segments: SegmentVec<'_> = if trimmed.is_empty() {
        SmallVec::new()
    } else {
        trimmed.split('/').collect()
    };
    if ignore_trailing_slash && segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}

/// Parse a full path template into segments
pub(crate) fn parse_template(
    path: &str,
    ignore_trailing_slash: bool,
) -> Result<Vec<Segment>, String> {
    if !path.starts_with('/') {
        return Err("path must begin with '/'".to_string());
    }
    let raw = split_path(path, ignore_trailing_slash);
    let last = raw.len().saturating_sub(1);
    let mut segments = Vec::with_capacity(raw.len());
    for (i, segment) in raw.iter().enumerate() {
        if segment.is_empty() && i != last {
            return Err("empty path segment".to_string());
        }
        let parsed = parse_segment(segment)?;
        if matches!(parsed, Segment::Wildcard) && i != last {
            return Err("wildcard '*' must be the last segment".to_string());
        }
        segments.push(parsed);
    }
    Ok(segments)
}

fn parse_segment(raw: &str) -> Result<Segment, String> {
    if raw == WILDCARD_PARAM {
        return Ok(Segment::Wildcard);
    }
    if !raw.contains(':') {
        return Ok(Segment::Static(raw.to_string()));
    }

    let parts = tokenize(raw)?;
    if let [Part::Param {
        name,
        constraint: None,
    }] = parts.as_slice()
    {
        return Ok(Segment::Param(Arc::from(name.as_str())));
    }

    let mut pattern = String::with_capacity(raw.len() * 2);
    pattern.push('^');
    let mut names = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        match part {
            Part::Literal(text) => pattern.push_str(&regex::escape(text)),
            Part::Param { name, constraint } => {
                let group = group_name(names.len());
                let body = match constraint {
                    Some(c) => strip_anchors(c).to_string(),
                    None => match parts.get(i + 1) {
                        Some(Part::Literal(_)) => "[^/]+?".to_string(),
                        Some(Part::Param { .. }) => {
                            return Err(format!(
                                "parameter ':{name}' must be followed by a delimiter"
                            ))
                        }
                        None => "[^/]+".to_string(),
                    },
                };
                pattern.push_str(&format!("(?P<{group}>{body})"));
                names.push(Arc::from(name.as_str()));
            }
        }
    }
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| format!("invalid parameter regex: {e}"))?;
    Ok(Segment::Pattern(SegmentPattern {
        source: raw.to_string(),
        regex,
        names,
    }))
}

fn tokenize(raw: &str) -> Result<Vec<Part>, String> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ':' {
            literal.push(c);
            continue;
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_ascii_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err("parameter name must not be empty".to_string());
        }

        let mut constraint = None;
        if chars.peek() == Some(&'(') {
            chars.next();
            let mut body = String::new();
            let mut depth = 1usize;
            while depth > 0 {
                let Some(n) = chars.next() else {
                    return Err(format!("unterminated regex for parameter ':{name}'"));
                };
                match n {
                    '\\' => {
                        body.push(n);
                        if let Some(escaped) = chars.next() {
                            body.push(escaped);
                        }
                        continue;
                    }
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    body.push(n);
                }
            }
            constraint = Some(body);
        }
        parts.push(Part::Param { name, constraint });
    }

    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }
    Ok(parts)
}

fn strip_anchors(constraint: &str) -> &str {
    let c = constraint.strip_prefix('^').unwrap_or(constraint);
    if c.ends_with("\\$") {
        return c;
    }
    c.strip_suffix('$').unwrap_or(c)
}

/// Turn a regex route path into a template: drop `^`/`$` anchors and
/// backslash escapes (`^\/users\/:id$` becomes `/users/:id`).
pub(crate) fn template_from_regex(re: &Regex) -> String {
    let src = re.as_str();
    let src = src.strip_prefix('^').unwrap_or(src);
    let src = if src.ends_with("\\$") {
        src
    } else {
        src.strip_suffix('$').unwrap_or(src)
    };
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
