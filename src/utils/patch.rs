//! Line-oriented patch engine for Avalanche config documents.
//!
//! A [`Directive`] names the lines to look for (anchors), how far below the
//! anchor the field to rewrite sits, and what to write there. The document is
//! never parsed, only pattern-matched, so untouched lines stay byte-identical.

use regex::Regex;

use crate::error::PatchError;

/// What gets written into the target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// replaces the first digit of the field, `1` or `0`
    Flag(bool),
    /// replaces the first `{...}` group of the field, braces kept
    Payload(String),
}

impl Replacement {
    fn field_name(&self) -> &'static str {
        match self {
            Replacement::Flag(_) => "digit flag",
            Replacement::Payload(_) => "brace payload",
        }
    }
}

/// Restricts a directive to the load profiles with the given names.
///
/// A profile starts on a `loadProfile {<name>}` line and runs until the next
/// such line or the end of the document. Dotted references to a profile, such
/// as `association(0).loadProfile {Web}`, don't start one.
#[derive(Debug, Clone)]
pub struct ProfileScope {
    names: Vec<String>,
    start: Regex,
}

impl ProfileScope {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            start: anchor(r"(?:^|[^.\w])loadProfile\s+\{(?P<name>[^}]*)\}"),
        }
    }

    pub fn profile_name<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.start
            .captures(line)
            .and_then(|c| c.name("name"))
            .map(|m| m.as_str().trim())
    }

    fn includes(&self, profile: &str) -> bool {
        self.names.iter().any(|n| n == profile)
    }
}

#[derive(Debug, Clone)]
pub struct Directive {
    name: String,
    anchors: Vec<Regex>,
    offset: usize,
    replacement: Replacement,
    scope: Option<ProfileScope>,
}

impl Directive {
    /// A directive rewriting the anchor line itself.
    pub fn new(name: impl Into<String>, anchors: Vec<Regex>, replacement: Replacement) -> Self {
        Self {
            name: name.into(),
            anchors,
            offset: 0,
            replacement,
            scope: None,
        }
    }

    /// Rewrite the `offset`-th line below the anchor instead of the anchor line.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn scoped(mut self, scope: ProfileScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte position of the earliest anchor match on the line.
    fn anchor_match(&self, line: &str) -> Option<usize> {
        self.anchors
            .iter()
            .filter_map(|re| re.find(line))
            .map(|m| m.start())
            .min()
    }

    /// Rewrite the first field at or after byte `from`. `line_no` is 1-based.
    fn rewrite_field(&self, line: &str, from: usize, line_no: usize) -> Result<String, PatchError> {
        let missing = || PatchError::FieldMissing {
            directive: self.name.clone(),
            line: line_no,
            field: self.replacement.field_name(),
        };

        match &self.replacement {
            Replacement::Flag(on) => {
                let pos = line[from..]
                    .find(|c: char| c.is_ascii_digit())
                    .map(|p| p + from)
                    .ok_or_else(missing)?;
                let digit = if *on { "1" } else { "0" };
                Ok(format!("{}{}{}", &line[..pos], digit, &line[pos + 1..]))
            }
            Replacement::Payload(value) => {
                let open = line[from..]
                    .find('{')
                    .map(|p| p + from)
                    .ok_or_else(missing)?;
                let close = line[open + 1..]
                    .find('}')
                    .map(|p| p + open + 1)
                    .ok_or_else(missing)?;
                Ok(format!("{}{{{}}}{}", &line[..open], value, &line[close + 1..]))
            }
        }
    }
}

/// Result of one pass of a directive over a document.
#[derive(Debug, PartialEq, Eq)]
pub struct PatchOutcome {
    pub lines: Vec<String>,
    pub matches: usize,
}

/// Apply `directive` to `lines` in a single pass, returning a new document.
///
/// Lines skipped on the way from an anchor to its target are copied verbatim
/// and not checked for further anchors.
pub fn apply_directive(lines: &[String], directive: &Directive) -> Result<PatchOutcome, PatchError> {
    let mut out = Vec::with_capacity(lines.len());
    let mut matches = 0;
    let mut in_scope = directive.scope.is_none();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];

        if let Some(scope) = &directive.scope {
            if let Some(profile) = scope.profile_name(line) {
                in_scope = scope.includes(profile);
                out.push(line.clone());
                i += 1;
                continue;
            }
        }

        let found = if in_scope {
            directive.anchor_match(line)
        } else {
            None
        };
        let Some(start) = found else {
            out.push(line.clone());
            i += 1;
            continue;
        };
        matches += 1;

        if directive.offset == 0 {
            out.push(directive.rewrite_field(line, start, i + 1)?);
            i += 1;
            continue;
        }

        let target = i + directive.offset;
        if target >= lines.len() {
            return Err(PatchError::Truncated {
                directive: directive.name.clone(),
                anchor_line: i + 1,
                offset: directive.offset,
            });
        }
        if let Some(scope) = &directive.scope {
            if let Some(p) = (i + 1..=target).find(|&j| scope.profile_name(&lines[j]).is_some()) {
                return Err(PatchError::CrossesProfile {
                    directive: directive.name.clone(),
                    anchor_line: i + 1,
                    profile_line: p + 1,
                });
            }
        }

        out.extend(lines[i..target].iter().cloned());
        out.push(directive.rewrite_field(&lines[target], 0, target + 1)?);
        i = target + 1;
    }

    Ok(PatchOutcome {
        lines: out,
        matches,
    })
}

/// Compile a case-insensitive anchor pattern.
pub fn anchor(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).expect("anchor patterns are valid regexes")
}
