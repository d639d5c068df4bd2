//! Path template compiler and matcher.
//!
//! Templates are absolute paths made of literal segments, `{name}`
//! captures, `{name:regex}` constrained captures and an optional trailing
//! `*name` segment that swallows the rest of the path.

use crate::captures::Captures;

use regex::Regex;
use smallvec::SmallVec;

const SLASH: char = '/';

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must start with '/': {0:?}")]
    MissingSlash(Box<str>),

    #[error("capture name can not be empty: {0:?}")]
    EmptyCaptureName(Box<str>),

    #[error("tail capture can only appear at end: {0:?}")]
    TailNotLast(Box<str>),

    #[error("invalid segment regex in {pattern:?}: {source}")]
    BadRegex {
        pattern: Box<str>,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug)]
enum Part {
    Literal(Box<str>),
    Capture(Box<str>),
    Converted(Box<str>, Regex),
}

#[derive(Debug)]
pub(crate) struct PathPattern {
    parts: Vec<Part>,
    tail: Option<Box<str>>,
    trailing_slash: bool,
}

/// Outcome of matching one rule pattern against a request path.
#[derive(Debug)]
pub(crate) enum PathMatch<'a> {
    Match(Captures<'a>),
    /// The pattern requires a trailing slash the path is missing.
    SlashNeeded,
    NoMatch,
}

impl PathPattern {
    pub(crate) fn compile(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with(SLASH) {
            return Err(PatternError::MissingSlash(pattern.into()));
        }

        let (segs, trailing) = split_segments(pattern);

        let mut parts = Vec::with_capacity(segs.len());
        let mut tail: Option<Box<str>> = None;

        for (i, &seg) in segs.iter().enumerate() {
            if let Some(name) = seg.strip_prefix('*') {
                if name.is_empty() {
                    return Err(PatternError::EmptyCaptureName(pattern.into()));
                }
                if i + 1 != segs.len() {
                    return Err(PatternError::TailNotLast(pattern.into()));
                }
                tail = Some(name.into());
                break;
            }

            if seg.starts_with('{') && seg.ends_with('}') && seg.len() >= 2 {
                let inner = &seg[1..seg.len() - 1];
                match inner.split_once(':') {
                    Some((name, raw)) => {
                        if name.is_empty() {
                            return Err(PatternError::EmptyCaptureName(pattern.into()));
                        }
                        let re = Regex::new(&format!(r"\A(?:{})\z", raw)).map_err(|source| {
                            PatternError::BadRegex {
                                pattern: pattern.into(),
                                source,
                            }
                        })?;
                        parts.push(Part::Converted(name.into(), re));
                    }
                    None => {
                        if inner.is_empty() {
                            return Err(PatternError::EmptyCaptureName(pattern.into()));
                        }
                        parts.push(Part::Capture(inner.into()));
                    }
                }
            } else {
                parts.push(Part::Literal(seg.into()));
            }
        }

        let trailing_slash = trailing && tail.is_none();
        Ok(Self {
            parts,
            tail,
            trailing_slash,
        })
    }

    pub(crate) fn matches<'p>(&'p self, path: &'p str, strict_slashes: bool) -> PathMatch<'p> {
        let (segs, trailing) = split_segments(path);

        if self.tail.is_some() {
            if segs.len() <= self.parts.len() {
                return PathMatch::NoMatch;
            }
        } else if segs.len() != self.parts.len() {
            return PathMatch::NoMatch;
        }

        let mut captures = Captures::new();
        for (part, &seg) in self.parts.iter().zip(segs.iter()) {
            match part {
                Part::Literal(lit) => {
                    if lit.as_ref() != seg {
                        return PathMatch::NoMatch;
                    }
                }
                Part::Capture(name) => {
                    if seg.is_empty() {
                        return PathMatch::NoMatch;
                    }
                    captures.buf.push((&**name, seg));
                }
                Part::Converted(name, re) => {
                    if !re.is_match(seg) {
                        return PathMatch::NoMatch;
                    }
                    captures.buf.push((&**name, seg));
                }
            }
        }

        if let Some(name) = &self.tail {
            let first = segs[self.parts.len()];
            let last = segs[segs.len() - 1];
            let start = calc_offset(path, first);
            let end = calc_offset(path, last) + last.len();
            captures.buf.push((&**name, &path[start..end]));
            return PathMatch::Match(captures);
        }

        if self.trailing_slash != trailing && strict_slashes {
            return if self.trailing_slash {
                PathMatch::SlashNeeded
            } else {
                PathMatch::NoMatch
            };
        }

        PathMatch::Match(captures)
    }

    /// Rebuilds a path from the pattern, resolving every capture through
    /// `lookup`. Returns `None` if any capture is unresolved.
    pub(crate) fn build<'v>(&self, lookup: impl Fn(&str) -> Option<&'v str>) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            out.push(SLASH);
            match part {
                Part::Literal(lit) => out.push_str(lit),
                Part::Capture(name) | Part::Converted(name, _) => out.push_str(lookup(name)?),
            }
        }
        if let Some(name) = &self.tail {
            out.push(SLASH);
            out.push_str(lookup(name)?);
        }
        if self.trailing_slash || out.is_empty() {
            out.push(SLASH);
        }
        Some(out)
    }

    pub(crate) fn capture_names(&self) -> impl Iterator<Item = &str> {
        let parts = self.parts.iter().filter_map(|part| match part {
            Part::Literal(_) => None,
            Part::Capture(name) | Part::Converted(name, _) => Some(&**name),
        });
        parts.chain(self.tail.iter().map(|name| &**name))
    }
}

/// Expands `{name}` placeholders in a redirect template. Unresolved
/// placeholders are kept verbatim.
pub(crate) fn expand_template<'v>(
    template: &str,
    lookup: impl Fn(&str) -> Option<&'v str>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start + 1..];
        match rest.find('}') {
            Some(end) => {
                let name = &rest[..end];
                match lookup(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &rest[end + 1..];
            }
            None => {
                out.push('{');
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn split_segments(s: &str) -> (SmallVec<[&str; 8]>, bool) {
    let trailing = s.len() > 1 && s.ends_with(SLASH);
    let trimmed = s.trim_start_matches(SLASH).trim_end_matches(SLASH);
    let segs = if trimmed.is_empty() {
        SmallVec::new()
    } else {
        trimmed.split(SLASH).collect()
    };
    (segs, trailing)
}

#[inline]
fn calc_offset(src: &str, dst: &str) -> usize {
    dst.as_ptr() as usize - src.as_ptr() as usize
}
