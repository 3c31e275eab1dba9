//! Path templates compiled into reusable matchers.
//!
//! A template is a `/`-delimited path whose segments are either literal text or one of:
//!
//! - `:name`: a named parameter capturing one non-empty segment
//! - `:name?`: an optional named parameter; the segment and its leading `/` may be absent
//! - `*name`: a wildcard tail capturing the rest of the path, allowed only as the last segment
//!
//! Matching rules, identical for every pattern:
//!
//! - the whole candidate is matched, unless the template ends in a wildcard tail
//! - one trailing `/` on the candidate is tolerated, so `/ping` matches `/ping/`
//! - matching is case-sensitive and nothing is percent-decoded
//! - a parameter never captures `?` or `#`, so `/users/:id` does not match `/users/7?full=1`
//! - an optional parameter tries the longest form first, and a template holds at most
//!   eight of them
//!
//! Middleware uses [`PathPattern::prefix`], which also accepts any candidate continuing the
//! template with `/...`; the root prefix `/` accepts every candidate. The continuation must start
//! with `/`, so against the full request target the prefix `/api` accepts `/api/u?x=1` but not
//! `/api?x=1`.
//!
//! # Example
//!
//! ```
//! use trellis_web::PathPattern;
//!
//! let pattern = PathPattern::compile("/articles/:slug").unwrap();
//! let params = pattern.matches("/articles/hello-world").unwrap();
//! assert_eq!(params.get("slug"), Some("hello-world"));
//! assert!(pattern.matches("/articles").is_none());
//! ```

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::PathParams;

type InnerMatcher = matchit::Router<()>;

/// Parameter name used for the hidden tail of prefix patterns; `-` can't appear in user names.
const PREFIX_TAIL: &str = "trellis-tail";

/// Upper bound on `:name?` segments per template; each one doubles the number of expansions.
pub const MAX_OPTIONAL_PARAMS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("path template '{template}' must start with '/'")]
    MissingLeadingSlash { template: String },

    #[error("path template '{template}' has a parameter without a name")]
    EmptyParamName { template: String },

    #[error("path template '{template}' has an invalid parameter name '{name}'")]
    InvalidParamName { template: String, name: String },

    #[error("path template '{template}' contains unbalanced parameter syntax")]
    UnbalancedBrace { template: String },

    #[error("path template '{template}' has a wildcard before its last segment")]
    MisplacedWildcard { template: String },

    #[error("path template '{template}' declares parameter '{name}' twice")]
    DuplicateParam { template: String, name: String },

    #[error("path template '{template}' has {count} optional parameters, at most {max} are allowed", max = MAX_OPTIONAL_PARAMS)]
    TooManyOptionalParams { template: String, count: usize },

    #[error("path template '{template}' can't be compiled: {reason}")]
    Conflict { template: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    Exact,
    Prefix,
    Everything,
}

enum Segment<'t> {
    Literal(&'t str),
    Param { name: &'t str, optional: bool },
    Wildcard(&'t str),
}

/// An immutable, compiled path template.
pub struct PathPattern {
    source: String,
    mode: MatchMode,
    // one router per expansion, most complete first
    matchers: Vec<InnerMatcher>,
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPattern").field("source", &self.source).field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl PathPattern {
    /// Compiles a template matching whole candidates.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        Self::build(template, MatchMode::Exact)
    }

    /// Compiles a template matching the candidate itself or anything below it.
    pub fn prefix(template: &str) -> Result<Self, PatternError> {
        if template == "/" {
            return Ok(Self { source: template.to_string(), mode: MatchMode::Everything, matchers: Vec::new() });
        }
        Self::build(template, MatchMode::Prefix)
    }

    /// The template this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tests a candidate, returning the captured parameters on success.
    pub fn matches(&self, candidate: &str) -> Option<PathParams> {
        if self.mode == MatchMode::Everything {
            return Some(PathParams::empty());
        }

        self.match_exact(candidate).or_else(|| {
            let trimmed = candidate.strip_suffix('/').filter(|trimmed| !trimmed.is_empty())?;
            self.match_exact(trimmed)
        })
    }

    fn match_exact(&self, candidate: &str) -> Option<PathParams> {
        self.matchers.iter().find_map(|matcher| self.capture(matcher, candidate))
    }

    fn capture(&self, matcher: &InnerMatcher, candidate: &str) -> Option<PathParams> {
        let matched = matcher.at(candidate).ok()?;

        let mut params = PathParams::with_capacity(matched.params.len());
        for (key, value) in matched.params.iter() {
            if key == PREFIX_TAIL {
                continue;
            }
            if self.is_segment_param(key) && value.contains(['?', '#']) {
                return None;
            }
            params.insert(key, value);
        }
        Some(params)
    }

    fn is_segment_param(&self, key: &str) -> bool {
        // wildcard tails are the only captures allowed to span `?` and `#`
        !self.source.rsplit('/').next().is_some_and(|last| last.strip_prefix('*') == Some(key))
    }

    fn build(template: &str, mode: MatchMode) -> Result<Self, PatternError> {
        let segments = parse_segments(template)?;
        let ends_with_wildcard = matches!(segments.last(), Some(Segment::Wildcard(_)));

        let optional_count = segments.iter().filter(|s| matches!(s, Segment::Param { optional: true, .. })).count();
        if optional_count > MAX_OPTIONAL_PARAMS {
            return Err(PatternError::TooManyOptionalParams { template: template.to_string(), count: optional_count });
        }

        let mut matchers = Vec::new();
        let mut shapes = HashSet::new();

        for route in expand(&segments, optional_count) {
            // an expansion differing from an earlier one only in parameter names never wins
            if !shapes.insert(shape_of(&route)) {
                continue;
            }

            let mut matcher = InnerMatcher::new();
            insert(&mut matcher, template, &route)?;

            if mode == MatchMode::Prefix && !ends_with_wildcard {
                let tail = if route.ends_with('/') {
                    format!("{route}{{*{PREFIX_TAIL}}}")
                } else {
                    format!("{route}/{{*{PREFIX_TAIL}}}")
                };
                insert(&mut matcher, template, &tail)?;
            }

            matchers.push(matcher);
        }

        Ok(Self { source: template.to_string(), mode, matchers })
    }
}

fn insert(matcher: &mut InnerMatcher, template: &str, route: &str) -> Result<(), PatternError> {
    matcher.insert(route, ()).map_err(|e| PatternError::Conflict { template: template.to_string(), reason: e.to_string() })
}

fn parse_segments(template: &str) -> Result<Vec<Segment<'_>>, PatternError> {
    let Some(rest) = template.strip_prefix('/') else {
        return Err(PatternError::MissingLeadingSlash { template: template.to_string() });
    };

    if template.contains(['{', '}']) {
        return Err(PatternError::UnbalancedBrace { template: template.to_string() });
    }

    let raw_segments: Vec<&str> = rest.split('/').collect();
    let last_index = raw_segments.len() - 1;
    let mut names = HashSet::new();
    let mut segments = Vec::with_capacity(raw_segments.len());

    for (index, raw) in raw_segments.into_iter().enumerate() {
        let segment = if let Some(param) = raw.strip_prefix(':') {
            let (name, optional) = match param.strip_suffix('?') {
                Some(name) => (name, true),
                None => (param, false),
            };
            validate_name(template, name)?;
            Segment::Param { name, optional }
        } else if let Some(name) = raw.strip_prefix('*') {
            if index != last_index {
                return Err(PatternError::MisplacedWildcard { template: template.to_string() });
            }
            validate_name(template, name)?;
            Segment::Wildcard(name)
        } else {
            Segment::Literal(raw)
        };

        if let Segment::Param { name, .. } | Segment::Wildcard(name) = segment {
            if !names.insert(name) {
                return Err(PatternError::DuplicateParam { template: template.to_string(), name: name.to_string() });
            }
        }

        segments.push(segment);
    }

    Ok(segments)
}

fn validate_name(template: &str, name: &str) -> Result<(), PatternError> {
    if name.is_empty() {
        return Err(PatternError::EmptyParamName { template: template.to_string() });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PatternError::InvalidParamName { template: template.to_string(), name: name.to_string() });
    }
    Ok(())
}

/// Every matchit route the segments stand for, most complete first.
fn expand(segments: &[Segment<'_>], optional_count: usize) -> Vec<String> {
    let combinations = 1usize << optional_count;

    let mut routes = Vec::with_capacity(combinations);
    // bit set = optional segment omitted; counting up keeps earlier segments present longer
    for omitted in 0..combinations {
        let mut route = String::new();
        let mut optional_index = 0;
        for segment in segments {
            match segment {
                Segment::Literal(text) => {
                    route.push('/');
                    route.push_str(text);
                }
                Segment::Param { name, optional } => {
                    if *optional {
                        let skip = omitted & (1 << (optional_count - 1 - optional_index)) != 0;
                        optional_index += 1;
                        if skip {
                            continue;
                        }
                    }
                    route.push_str("/{");
                    route.push_str(name);
                    route.push('}');
                }
                Segment::Wildcard(name) => {
                    route.push_str("/{*");
                    route.push_str(name);
                    route.push('}');
                }
            }
        }
        if route.is_empty() {
            route.push('/');
        }
        routes.push(route);
    }
    routes
}

fn shape_of(route: &str) -> String {
    let mut shape = String::with_capacity(route.len());
    let mut in_param = false;
    for c in route.chars() {
        match c {
            '{' => {
                in_param = true;
                shape.push('{');
            }
            '}' => {
                in_param = false;
                shape.push('}');
            }
            '*' if in_param => shape.push('*'),
            _ if in_param => {}
            _ => shape.push(c),
        }
    }
    shape
}
