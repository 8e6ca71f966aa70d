//! Line classification for the tool's stdout.
//!
//! The tool prints a loose line-oriented protocol: most lines begin with a
//! bracketed tag (`[youtube]`, `[download]`, `[Merger]`), and download lines
//! additionally carry a progress report. Parsing is regex based and
//! permissive since the output format is not a stable contract.

use std::fmt;

use regex::Regex;

use super::{LifecycleEvent, Progress, OTHER_EVENT};

/// Default progress pattern.
///
/// Capture groups: 1 = percent text, 2 = total size, 4 = speed, 6 = ETA.
pub const DEFAULT_PROGRESS_PATTERN: &str =
    r"(?i)\[download\] *(.*) of[ ~]*([^ ]*)(:? *at *([^ ]*))?(:? *ETA *([^ ]*))?";

/// Compiled regex used to recognise progress lines.
///
/// Immutable once built; a different pattern means building a new value.
#[derive(Clone)]
pub struct ProgressPattern {
    regex: Regex,
}

impl ProgressPattern {
    /// Compile a custom progress pattern.
    ///
    /// The pattern must use the same capture group layout as
    /// [`DEFAULT_PROGRESS_PATTERN`].
    ///
    /// # Errors
    ///
    /// Returns `regex::Error` if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// The pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    fn parse(&self, line: &str) -> Option<Progress> {
        let caps = self.regex.captures(line)?;
        let group = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
        };

        let percent = group(1)
            .and_then(|text| text.replacen('%', "", 1).trim().parse::<f64>().ok())
            .filter(|p| p.is_finite());
        let total_size = group(2).map(|s| s.replacen('~', "", 1));

        Some(Progress {
            percent,
            total_size,
            current_speed: group(4).map(str::to_string),
            eta: group(6).map(str::to_string),
        })
    }
}

impl Default for ProgressPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_PROGRESS_PATTERN).expect("default progress pattern is valid"),
        }
    }
}

impl fmt::Debug for ProgressPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProgressPattern").field(&self.as_str()).finish()
    }
}

/// Result of classifying one line of output.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedLine {
    /// Line began with a bracketed tag.
    Tagged {
        /// Set when the line also matched the progress pattern.
        progress: Option<Progress>,
        /// The tag and the text after it.
        event: LifecycleEvent,
    },
    /// Line without a tag, kept verbatim.
    Other(String),
}

impl ClassifiedLine {
    /// Progress payload, if the line was a progress line.
    #[must_use]
    pub fn progress(&self) -> Option<&Progress> {
        match self {
            Self::Tagged { progress, .. } => progress.as_ref(),
            Self::Other(_) => None,
        }
    }

    /// The lifecycle event every line yields; untagged lines use kind `"other"`.
    #[must_use]
    pub fn into_event(self) -> LifecycleEvent {
        match self {
            Self::Tagged { event, .. } => event,
            Self::Other(line) => LifecycleEvent::new(OTHER_EVENT, line),
        }
    }
}

/// Classify a trimmed, non-empty line.
#[must_use]
pub fn classify(line: &str, pattern: &ProgressPattern) -> ClassifiedLine {
    if !line.starts_with('[') {
        return ClassifiedLine::Other(line.to_string());
    }

    let progress = pattern.parse(line);
    let (kind, data) = split_tag(line);

    ClassifiedLine::Tagged {
        progress,
        event: LifecycleEvent::new(kind.trim().to_lowercase(), data.trim()),
    }
}

/// Split `[tag] data` into its tag and data parts.
fn split_tag(line: &str) -> (&str, &str) {
    let body = &line[1..];

    match body.find(']') {
        Some(close) => (&body[..close], after_first_space(&body[close + 1..])),
        // Unterminated tag: the first word is the tag.
        None => {
            let end = body.find(' ').unwrap_or(body.len());
            (&body[..end], &body[end..])
        }
    }
}

/// Everything from the first space on, or nothing if there is none.
fn after_first_space(s: &str) -> &str {
    s.find(' ').map_or("", |i| &s[i..])
}

/// Splits decoded chunks into lines on `\r` and `\n`.
///
/// Text after the last separator is held back until the next chunk or
/// [`LineBuffer::finish`], so a line cut by a read boundary is emitted once.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the complete, trimmed, non-empty lines it finished.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let Some(last) = self.pending.rfind(['\r', '\n']) else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        split_lines(&complete)
    }

    /// Return whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = rest.trim();
        (!line.is_empty()).then(|| line.to_string())
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
