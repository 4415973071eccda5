/// Compiled URL patterns
///
/// A pattern is compiled once, when the rule engine is built, into either a
/// glob matcher or a regex matcher. Both answer the same question through
/// [`PatternMatcher::matches`].
use crate::{ConfigError, PatternKind};
use regex::Regex;

/// A single compiled include or exclude pattern
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    /// Shell-style glob, translated to a regex
    Glob { pattern: String, regex: Regex },
    /// Regular expression, searched anywhere in the URL
    Regex { pattern: String, regex: Regex },
}

impl PatternMatcher {
    /// Compiles a glob pattern
    ///
    /// # Arguments
    ///
    /// * `pattern` - Glob text, e.g. `"/docs/*"` or `"*/v[12]/*"`
    ///
    /// # Returns
    ///
    /// * `Ok(PatternMatcher)` - The compiled matcher
    /// * `Err(ConfigError::InvalidPattern)` - The pattern could not be compiled
    pub fn glob(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| invalid(pattern, PatternKind::Glob, e))?;
        Ok(Self::Glob {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Compiles a regular expression pattern
    pub fn regex(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| invalid(pattern, PatternKind::Regex, e))?;
        Ok(Self::Regex {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Compiles a pattern of the given kind
    pub fn compile(pattern: &str, kind: PatternKind) -> Result<Self, ConfigError> {
        match kind {
            PatternKind::Glob => Self::glob(pattern),
            PatternKind::Regex => Self::regex(pattern),
        }
    }

    /// Returns true if the pattern occurs anywhere in the URL
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Glob { regex, .. } | Self::Regex { regex, .. } => regex.is_match(url),
        }
    }

    /// The pattern text as configured
    pub fn pattern(&self) -> &str {
        match self {
            Self::Glob { pattern, .. } | Self::Regex { pattern, .. } => pattern,
        }
    }

    pub fn kind(&self) -> PatternKind {
        match self {
            Self::Glob { .. } => PatternKind::Glob,
            Self::Regex { .. } => PatternKind::Regex,
        }
    }
}

fn invalid(pattern: &str, kind: PatternKind, error: regex::Error) -> ConfigError {
    ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        kind,
        message: error.to_string(),
    }
}

/// Translates glob syntax into an unanchored regex
///
/// - `*` and `**` match any run of characters, including `/`
/// - `?` matches exactly one character, which may be `/`
///
/// Neither wildcard stops at path separators, so `/docs/*.html` matches
/// `/docs/a/b.html` as well as `/docs/b.html`. Use regex mode with `[^/]*`
/// to keep a match inside one path segment.
/// - `[seq]` and `[!seq]` are character classes; an unterminated `[` is literal
/// - everything else matches itself
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i + 1..end]));
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    out
}

/// Finds the `]` closing the class opened at `start`
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if j < chars.len() && chars[j] == '!' {
        j += 1;
    }
    // A `]` right after the opening bracket is part of the class
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut class = String::from("[");
    if negated {
        class.push('^');
    }
    for &c in body {
        match c {
            '\\' | '[' | ']' | '^' | '&' | '~' => {
                class.push('\\');
                class.push(c);
            }
            _ => class.push(c),
        }
    }
    class.push(']');
    class
}
