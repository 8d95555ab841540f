//! Delimiter scanning
//!
//! Splits template source into literal text and directives using the three
//! configured patterns. Escape directives are matched first, then interpolate
//! directives in the text that remains, then evaluate directives: the default
//! delimiters share the `<%` prefix, and this order keeps `<%=` and `<%-`
//! from being read as evaluate blocks.

use super::error::InvalidInputError;
use super::settings::Settings;
use regex::Regex;
use std::ops::Range;

/// The kind of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Escape,
    Interpolate,
    Evaluate,
}

/// A piece of template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text at `range`
    Text { range: Range<usize> },
    /// A directive spanning `range` whose captured code is at `code`
    Directive {
        kind: DirectiveKind,
        range: Range<usize>,
        code: Range<usize>,
    },
}

/// Compiled delimiter patterns
#[derive(Debug, Clone)]
pub struct Patterns {
    escape: Regex,
    interpolate: Regex,
    evaluate: Option<Regex>,
}

impl Patterns {
    /// Compile the patterns named by `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self, InvalidInputError> {
        Ok(Self {
            escape: compile_pattern("escape", &settings.escape)?,
            interpolate: compile_pattern("interpolate", &settings.interpolate)?,
            evaluate: settings
                .evaluate
                .as_deref()
                .map(|p| compile_pattern("evaluate", p))
                .transpose()?,
        })
    }

    /// Patterns in matching order
    fn ordered(&self) -> impl Iterator<Item = (DirectiveKind, &Regex)> {
        [
            (DirectiveKind::Escape, Some(&self.escape)),
            (DirectiveKind::Interpolate, Some(&self.interpolate)),
            (DirectiveKind::Evaluate, self.evaluate.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, re)| re.map(|re| (kind, re)))
    }
}

fn compile_pattern(setting: &'static str, pattern: &str) -> Result<Regex, InvalidInputError> {
    let re = Regex::new(pattern).map_err(|e| InvalidInputError {
        setting,
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if re.captures_len() < 2 {
        return Err(InvalidInputError {
            setting,
            pattern: pattern.to_string(),
            reason: "pattern has no capture group".to_string(),
        });
    }
    Ok(re)
}

/// Split `source` into text and directive segments, in source order
pub fn scan(source: &str, patterns: &Patterns) -> Vec<Segment> {
    let mut segments = vec![Segment::Text {
        range: 0..source.len(),
    }];

    for (kind, re) in patterns.ordered() {
        let mut next = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Text { range } => split_text(source, range, kind, re, &mut next),
                directive => next.push(directive),
            }
        }
        segments = next;
    }

    segments.retain(|s| !matches!(s, Segment::Text { range } if range.is_empty()));
    segments
}

/// Find directives of one kind inside a text range
fn split_text(
    source: &str,
    range: Range<usize>,
    kind: DirectiveKind,
    re: &Regex,
    out: &mut Vec<Segment>,
) {
    let base = range.start;
    let text = &source[range.clone()];
    let mut cursor = base;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        // A pattern may have an optional group that did not take part
        let code = caps
            .get(1)
            .map_or(whole.end()..whole.end(), |m| m.start()..m.end());

        out.push(Segment::Text {
            range: cursor..base + whole.start(),
        });
        out.push(Segment::Directive {
            kind,
            range: base + whole.start()..base + whole.end(),
            code: base + code.start..base + code.end,
        });
        cursor = base + whole.end();
    }

    out.push(Segment::Text {
        range: cursor..range.end,
    });
}
