//! Compile options.

use std::fmt;
use std::str::FromStr;

use crate::error::OptionError;

/// Widest accepted indentation step, in columns.
pub const MAX_INDENT_DEPTH: usize = 64;

/// Output markup flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    Html4,
    #[default]
    Html5,
    Xhtml,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Html4 => "html4",
            Format::Html5 => "html5",
            Format::Xhtml => "xhtml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = OptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.strip_prefix(':').unwrap_or(value) {
            "html4" => Ok(Format::Html4),
            "html5" => Ok(Format::Html5),
            "xhtml" => Ok(Format::Xhtml),
            _ => Err(OptionError::UnknownParameter {
                key: "format".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// A raw option value as supplied by a caller or a config file.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Nil => f.write_str("nil"),
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<Format> for OptionValue {
    fn from(value: Format) -> Self {
        OptionValue::Str(value.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub format: Format,
    /// Escape free text and inline tag content.
    pub escape_html: bool,
    /// Reject unknown option keys instead of ignoring them.
    pub raise_unknown_option: bool,
    /// Columns per indentation level.
    pub default_indent_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: Format::Html5,
            escape_html: false,
            raise_unknown_option: true,
            default_indent_depth: 2,
        }
    }
}

impl Options {
    /// Validates and applies one option. Keys may carry a leading `:`.
    pub fn apply(&mut self, key: &str, value: OptionValue) -> Result<(), OptionError> {
        let key = key.strip_prefix(':').unwrap_or(key);
        match key {
            "format" => {
                self.format = match &value {
                    OptionValue::Str(name) => name.parse()?,
                    other => {
                        return Err(OptionError::UnknownParameter {
                            key: key.to_string(),
                            value: other.to_string(),
                        });
                    }
                };
            }
            "escape_html" => self.escape_html = expect_flag(key, value)?,
            "raise_unknown_option" => self.raise_unknown_option = expect_flag(key, value)?,
            "default_indent_depth" => {
                self.default_indent_depth = match value {
                    OptionValue::Int(depth) if (1..=MAX_INDENT_DEPTH as i64).contains(&depth) => {
                        depth as usize
                    }
                    other => {
                        return Err(OptionError::InvalidType {
                            key: key.to_string(),
                            expected: "an integer between 1 and 64",
                            value: other.to_string(),
                        });
                    }
                };
            }
            _ if self.raise_unknown_option => {
                return Err(OptionError::UnknownOption(key.to_string()));
            }
            _ => log::debug!("ignoring unknown option `{key}`"),
        }
        Ok(())
    }

    /// Builds options from key/value pairs on top of the defaults.
    ///
    /// A `raise_unknown_option` entry takes effect before any other key,
    /// wherever it appears.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let pairs: Vec<(K, OptionValue)> = pairs
            .into_iter()
            .map(|(key, value)| (key, value.into()))
            .collect();
        let is_raise = |key: &str| key.strip_prefix(':').unwrap_or(key) == "raise_unknown_option";

        let mut options = Options::default();
        for (key, value) in pairs.iter().filter(|(key, _)| is_raise(key.as_ref())) {
            options.apply(key.as_ref(), value.clone())?;
        }
        for (key, value) in pairs.into_iter().filter(|(key, _)| !is_raise(key.as_ref())) {
            options.apply(key.as_ref(), value)?;
        }
        Ok(options)
    }

    pub fn indent_width(&self) -> usize {
        self.default_indent_depth.clamp(1, MAX_INDENT_DEPTH)
    }

    pub fn is_xhtml(&self) -> bool {
        self.format == Format::Xhtml
    }
}

fn expect_flag(key: &str, value: OptionValue) -> Result<bool, OptionError> {
    match value {
        OptionValue::Bool(flag) => Ok(flag),
        OptionValue::Nil => Ok(false),
        other => Err(OptionError::InvalidType {
            key: key.to_string(),
            expected: "a boolean",
            value: other.to_string(),
        }),
    }
}
