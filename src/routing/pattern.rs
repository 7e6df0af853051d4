//! Route pattern compilation.
//!
//! # Responsibilities
//! - Turn a handler-tree relative path (`users/[userId]`) into a `RoutePattern`
//! - Turn a manually registered path (`/users/:userId`) into a `RoutePattern`
//! - Normalize mount prefixes (`api`, `/api/` → `/api`)
//!
//! # Design Decisions
//! - A trailing `index` segment maps to the parent directory's own route
//! - Literal comparison is case-sensitive, trailing slashes are dropped
//! - Parameter names are unique within a pattern; violations are startup errors

use std::collections::HashSet;
use std::fmt;

/// A single compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Fixed text that must match the request segment exactly.
    Literal(String),
    /// Named capture matching any non-empty request segment.
    Param(String),
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

/// Errors raised while compiling a path into a pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unterminated bracket in segment `{segment}` of `{path}`")]
    UnterminatedBracket { path: String, segment: String },

    #[error("stray bracket in segment `{segment}` of `{path}`")]
    StrayBracket { path: String, segment: String },

    #[error("invalid parameter name `{name}` in `{path}`")]
    InvalidParamName { path: String, name: String },

    #[error("duplicate parameter `{name}` in `{path}`")]
    DuplicateParam { path: String, name: String },

    #[error("empty segment in `{path}`")]
    EmptySegment { path: String },

    #[error("mount path `{0}` contains a parameter")]
    ParameterizedMount(String),
}

/// Normalized mount prefix applied to every discovered route.
///
/// Stored without a trailing slash; the root mount is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountPath(String);

impl MountPath {
    pub fn new(raw: &str) -> Result<Self, PatternError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(PatternError::EmptySegment { path: raw.to_string() });
            }
            if segment.contains(['[', ']', ':']) {
                return Err(PatternError::ParameterizedMount(raw.to_string()));
            }
        }
        Ok(Self(format!("/{trimmed}")))
    }

    pub fn as_str(&self) -> &str {
        if self.0.is_empty() {
            "/"
        } else {
            &self.0
        }
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for MountPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled, immutable route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a handler-tree relative path (extension already stripped).
    ///
    /// `posts/[postId]/comments/index` under mount `/api` becomes
    /// `/api/posts/:postId/comments`.
    pub fn from_file_path(relative: &str, mount: &MountPath) -> Result<Self, PatternError> {
        let normalized = relative.replace('\\', "/");
        let mut raw: Vec<&str> = normalized.split('/').collect();
        if raw.last() == Some(&"index") {
            raw.pop();
        }

        let mut segments: Vec<Segment> = mount
            .segments()
            .map(|s| Segment::Literal(s.to_string()))
            .collect();
        for part in raw {
            if part.is_empty() {
                return Err(PatternError::EmptySegment { path: relative.to_string() });
            }
            segments.push(compile_segment(relative, part, false)?);
        }
        Self::from_segments(relative, segments)
    }

    /// Compile a manually registered absolute path.
    ///
    /// Both `:name` and `[name]` denote a parameter. No mount prefix is applied.
    pub fn parse(path: &str) -> Result<Self, PatternError> {
        let trimmed = path.trim_start_matches('/');
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let mut segments = Vec::new();
        if !trimmed.is_empty() {
            for part in trimmed.split('/') {
                if part.is_empty() {
                    return Err(PatternError::EmptySegment { path: path.to_string() });
                }
                segments.push(compile_segment(path, part, true)?);
            }
        }
        Self::from_segments(path, segments)
    }

    fn from_segments(source: &str, segments: Vec<Segment>) -> Result<Self, PatternError> {
        let mut seen = HashSet::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if !seen.insert(name.as_str()) {
                    return Err(PatternError::DuplicateParam {
                        path: source.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of literal segments before the first parameter.
    pub fn literal_prefix_len(&self) -> usize {
        self.segments.iter().take_while(|s| s.is_literal()).count()
    }

    /// Parameter names in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "/{text}")?,
                Segment::Param(name) => write!(f, "/:{name}")?,
            }
        }
        Ok(())
    }
}

fn compile_segment(path: &str, part: &str, allow_colon: bool) -> Result<Segment, PatternError> {
    if let Some(rest) = part.strip_prefix('[') {
        let Some(name) = rest.strip_suffix(']') else {
            return Err(PatternError::UnterminatedBracket {
                path: path.to_string(),
                segment: part.to_string(),
            });
        };
        return param_segment(path, name);
    }
    if allow_colon {
        if let Some(name) = part.strip_prefix(':') {
            return param_segment(path, name);
        }
    }
    if part.contains(['[', ']']) {
        return Err(PatternError::StrayBracket {
            path: path.to_string(),
            segment: part.to_string(),
        });
    }
    Ok(Segment::Literal(part.to_string()))
}

fn param_segment(path: &str, name: &str) -> Result<Segment, PatternError> {
    if name.is_empty() || name.contains(['/', '[', ']']) {
        return Err(PatternError::InvalidParamName {
            path: path.to_string(),
            name: name.to_string(),
        });
    }
    Ok(Segment::Param(name.to_string()))
}
