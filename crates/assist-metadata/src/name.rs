//! Dotted configuration property names.
//!
//! A [`PropertyName`] is a sequence of [`Segment`]s. Literal segments compare
//! under Spring's relaxed binding rules (`dataSource`, `data-source`,
//! `DATA_SOURCE` are the same segment); bracketed index/key segments
//! (`list[0]`, `map[key]`) compare verbatim.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Literal,
    /// Bracket notation: `[0]` or `[key]`.
    Index,
}

#[derive(Clone, Debug)]
pub struct Segment {
    text: String,
    normalized: String,
    kind: SegmentKind,
}

impl Segment {
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            normalized: normalize(&text),
            text,
            kind: SegmentKind::Literal,
        }
    }

    pub fn index(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            normalized: text.clone(),
            text,
            kind: SegmentKind::Index,
        }
    }

    /// The segment as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn is_index(&self) -> bool {
        self.kind == SegmentKind::Index
    }

    /// `true` for `[0]`-style list indices, `false` for map keys and literals.
    pub fn is_numeric_index(&self) -> bool {
        self.is_index() && !self.text.is_empty() && self.text.bytes().all(|b| b.is_ascii_digit())
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.normalized == other.normalized
    }
}

impl Eq for Segment {}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.normalized.hash(state);
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SegmentKind::Literal => f.write_str(&self.text),
            SegmentKind::Index => write!(f, "[{}]", self.text),
        }
    }
}

/// Normalize one name under relaxed binding.
///
/// Lower-cases, and collapses `-`, `_`, `.` and camelCase boundaries into a
/// single `-`. Leading and trailing delimiters are dropped.
pub fn normalize(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len() + 4);
    let mut pending_delimiter = false;

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '-' | '_' | '.') {
            pending_delimiter = true;
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            // `dataSource` -> data|Source, `URLPath` -> URL|Path.
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(char::is_lowercase))
            {
                pending_delimiter = true;
            }
        }

        if pending_delimiter && !out.is_empty() {
            out.push('-');
        }
        pending_delimiter = false;
        out.extend(c.to_lowercase());
    }

    out
}

/// The normalized form with every delimiter removed; used for prefix matching
/// so that `datas` reaches `data-source`.
pub fn compact(raw: &str) -> String {
    normalize(raw).replace('-', "")
}

/// `true` when two raw names are the same under relaxed binding.
pub fn relaxed_eq(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    EmptyElement,
    UnclosedBracket,
    UnopenedBracket,
    NestedBracket,
    EmptyBracket,
    TrailingCharacters,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MalformedReason::EmptyElement => "empty element",
            MalformedReason::UnclosedBracket => "`[` is never closed",
            MalformedReason::UnopenedBracket => "`]` without a matching `[`",
            MalformedReason::NestedBracket => "nested `[`",
            MalformedReason::EmptyBracket => "empty `[]`",
            MalformedReason::TrailingCharacters => "characters after `]` must start a new element",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("malformed property name `{path}` at byte {position}: {reason}")]
pub struct MalformedPathError {
    pub path: String,
    pub position: usize,
    pub reason: MalformedReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("the empty property name has no parent")]
pub struct EmptyPathError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertyName {
    segments: Vec<Segment>,
}

impl PropertyName {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a raw dotted name such as `spring.datasource[0].url`.
    pub fn adapt(raw: &str) -> Result<Self, MalformedPathError> {
        if raw.is_empty() {
            return Ok(Self::empty());
        }

        let malformed = |position: usize, reason: MalformedReason| MalformedPathError {
            path: raw.to_string(),
            position,
            reason,
        };

        let mut segments = Vec::new();
        for (offset, element) in split_elements(raw).map_err(|(pos, reason)| malformed(pos, reason))? {
            if element.is_empty() {
                return Err(malformed(offset, MalformedReason::EmptyElement));
            }

            let (name, mut rest) = match element.find('[') {
                Some(open) => element.split_at(open),
                None => (element, ""),
            };
            if !name.is_empty() {
                segments.push(Segment::literal(name));
            }

            let mut rest_offset = offset + name.len();
            while !rest.is_empty() {
                if !rest.starts_with('[') {
                    return Err(malformed(rest_offset, MalformedReason::TrailingCharacters));
                }
                // `split_elements` guarantees every `[` inside an element is closed.
                let Some(close) = rest.find(']') else {
                    return Err(malformed(rest_offset, MalformedReason::UnclosedBracket));
                };
                let key = &rest[1..close];
                if key.is_empty() {
                    return Err(malformed(rest_offset, MalformedReason::EmptyBracket));
                }
                segments.push(Segment::index(key));
                rest = &rest[close + 1..];
                rest_offset += close + 1;
            }
        }

        Ok(Self { segments })
    }

    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
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

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// This name without its last segment.
    pub fn parent(&self) -> Result<PropertyName, EmptyPathError> {
        match self.segments.split_last() {
            Some((_, parent)) => Ok(Self {
                segments: parent.to_vec(),
            }),
            None => Err(EmptyPathError),
        }
    }

    pub fn append(&self, segment: Segment) -> PropertyName {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// `true` when `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &PropertyName) -> bool {
        self.len() <= other.len() && self.segments[..] == other.segments[..self.len()]
    }

    /// This name, then its parent, grandparent, and so on; the empty name is
    /// not yielded.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: Some(self.clone()),
        }
    }

    /// Case/separator-insensitive canonical form, suitable as a cache key.
    pub fn normalized_key(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment.kind {
                SegmentKind::Literal => {
                    if i > 0 {
                        out.push('.');
                    }
                    out.push_str(&segment.normalized);
                }
                SegmentKind::Index => {
                    out.push('[');
                    out.push_str(&segment.normalized);
                    out.push(']');
                }
            }
        }
        out
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && segment.kind == SegmentKind::Literal {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for PropertyName {
    type Err = MalformedPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::adapt(s)
    }
}

pub struct Ancestors {
    next: Option<PropertyName>,
}

impl Iterator for Ancestors {
    type Item = PropertyName;

    fn next(&mut self) -> Option<PropertyName> {
        let current = self.next.take().filter(|name| !name.is_empty())?;
        self.next = current.parent().ok();
        Some(current)
    }
}

/// Split on `.` outside of brackets, returning each element with its byte offset.
fn split_elements(raw: &str) -> Result<Vec<(usize, &str)>, (usize, MalformedReason)> {
    let mut elements = Vec::new();
    let mut open_bracket: Option<usize> = None;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        match c {
            '[' => {
                if open_bracket.is_some() {
                    return Err((i, MalformedReason::NestedBracket));
                }
                open_bracket = Some(i);
            }
            ']' => {
                if open_bracket.take().is_none() {
                    return Err((i, MalformedReason::UnopenedBracket));
                }
            }
            '.' if open_bracket.is_none() => {
                elements.push((start, &raw[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }

    if let Some(open) = open_bracket {
        return Err((open, MalformedReason::UnclosedBracket));
    }
    elements.push((start, &raw[start..]));
    Ok(elements)
}
