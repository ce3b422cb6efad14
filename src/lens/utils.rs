//! Output formatting shared by lenses and CLI commands

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// How command output is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Rounded table (default)
    #[default]
    Table,
    Markdown,
    /// Compact JSON
    Json,
    JsonPretty,
    /// One JSON object per line
    JsonLine,
    /// Pipe-separated values with header
    Psv,
}

/// Canonical names, in declaration order, plus accepted aliases
const NAMES: &[(OutputFormat, &str, &[&str])] = &[
    (OutputFormat::Table, "table", &["pretty"]),
    (OutputFormat::Markdown, "markdown", &["md"]),
    (OutputFormat::Json, "json", &[]),
    (OutputFormat::JsonPretty, "json-pretty", &["jsonpretty"]),
    (OutputFormat::JsonLine, "json-line", &["jsonline", "jsonl", "ndjson"]),
    (OutputFormat::Psv, "psv", &["pipe"]),
];

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Serialize a single value for the JSON formats; `None` for the others.
    ///
    /// `JsonLine` renders the value compactly, like `Json`.
    pub fn render_json<T: Serialize>(&self, value: &T) -> Option<String> {
        match self {
            Self::Json | Self::JsonLine => serde_json::to_string(value).ok(),
            Self::JsonPretty => serde_json::to_string_pretty(value).ok(),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(format, _, _)| format == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("table")
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        NAMES
            .iter()
            .find(|(_, name, aliases)| *name == wanted || aliases.contains(&wanted.as_str()))
            .map(|(format, _, _)| *format)
            .ok_or_else(|| {
                let valid: Vec<&str> = NAMES.iter().map(|(_, name, _)| *name).collect();
                format!(
                    "unknown output format '{}', expected one of: {}",
                    s,
                    valid.join(", ")
                )
            })
    }
}
