//! Tag attributes: parsing the source forms and serializing the result.
//!
//! A tag may carry any mix of `{...}` hashes, `(k=v ...)` lists, `.class`
//! and `#id` shorthands. Each segment is first lowered to an
//! [`AttrSource`]; the sources are then evaluated in order into an
//! [`AttributeSet`], which renders the final attribute string.

use std::fmt;

use crate::error::ScriptError;
use crate::interpolate;
use crate::options::Format;
use crate::scan;
use crate::script::{ScriptEvaluator, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrSource {
    /// `{...}` hash code, braces included.
    Hash(String),
    /// One `key=value` entry of a `(...)` list.
    Pair { key: String, value: AttrValue },
    Class(String),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrValue {
    /// `'text'`
    Literal(String),
    /// `"text #{code}"`
    Interpolated(String),
    /// `key=expr`
    Eval(String),
    /// A bare `key`.
    True,
}

impl fmt::Display for AttrSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrSource::Hash(code) => f.write_str(code),
            AttrSource::Pair { key, value } => match value {
                AttrValue::Literal(text) => write!(f, "({key}='{text}')"),
                AttrValue::Interpolated(text) => write!(f, "({key}=\"{text}\")"),
                AttrValue::Eval(code) => write!(f, "({key}={code})"),
                AttrValue::True => write!(f, "({key})"),
            },
            AttrSource::Class(name) => write!(f, ".{name}"),
            AttrSource::Id(name) => write!(f, "#{name}"),
        }
    }
}

/// Parses attribute segments starting at `*index`.
///
/// Stops at the first byte that does not open a segment and leaves
/// `*index` there. Unterminated segments run to the end of the text.
pub(crate) fn parse(text: &str, index: &mut usize) -> Vec<AttrSource> {
    let bytes = text.as_bytes();
    let mut sources = Vec::new();
    let mut i = *index;

    while let Some(&ch) = bytes.get(i) {
        match ch {
            b'{' => {
                let end = scan::balanced_end(bytes, i);
                sources.push(AttrSource::Hash(text[i..end].to_string()));
                i = end;
            }
            b'(' => i = parse_html_list(text, i + 1, &mut sources),
            b'.' | b'#' => {
                let start = i + 1;
                let end = scan::first_invalid(bytes, start);
                let name = text[start..end].to_string();
                sources.push(if ch == b'.' {
                    AttrSource::Class(name)
                } else {
                    AttrSource::Id(name)
                });
                i = end;
            }
            _ => break,
        }
    }

    *index = i;
    sources
}

fn parse_html_list(text: &str, mut i: usize, sources: &mut Vec<AttrSource>) -> usize {
    let bytes = text.as_bytes();
    let skip_blanks = |mut i: usize| {
        while bytes.get(i).is_some_and(|&ch| scan::is_blank(ch)) {
            i += 1;
        }
        i
    };

    loop {
        i = skip_blanks(i);
        match bytes.get(i) {
            None => return i,
            Some(b')') => return i + 1,
            Some(_) => {}
        }

        let key_start = i;
        while bytes
            .get(i)
            .is_some_and(|&ch| !scan::is_blank(ch) && ch != b'=' && ch != b')')
        {
            i += 1;
        }
        let key = text[key_start..i].to_string();
        if key.is_empty() {
            // stray `=`
            i += 1;
            continue;
        }

        i = skip_blanks(i);
        if bytes.get(i) != Some(&b'=') {
            sources.push(AttrSource::Pair {
                key,
                value: AttrValue::True,
            });
            continue;
        }
        i = skip_blanks(i + 1);

        let value = match bytes.get(i) {
            Some(&quote @ (b'\'' | b'"')) => {
                let close = scan::find_unescaped(bytes, i + 1, quote).unwrap_or(bytes.len());
                let body = text[i + 1..close].to_string();
                i = (close + 1).min(bytes.len());
                if quote == b'\'' {
                    AttrValue::Literal(body)
                } else {
                    AttrValue::Interpolated(body)
                }
            }
            _ => {
                let start = i;
                while bytes
                    .get(i)
                    .is_some_and(|&ch| !scan::is_blank(ch) && ch != b')')
                {
                    i += 1;
                }
                AttrValue::Eval(text[start..i].to_string())
            }
        };
        sources.push(AttrSource::Pair { key, value });
    }
}

/// Evaluated attributes of one tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AttributeSet {
    pairs: Vec<(String, Value)>,
    classes: Vec<Value>,
    /// Set by `#id`; always rendered first.
    shorthand_id: Option<String>,
    ids: Vec<Value>,
}

impl AttributeSet {
    pub(crate) fn collect(
        sources: &[AttrSource],
        evaluator: &mut dyn ScriptEvaluator,
    ) -> Result<Self, ScriptError> {
        let mut set = AttributeSet::default();
        for source in sources {
            match source {
                AttrSource::Hash(code) => match evaluator.evaluate(code)? {
                    Value::Map(pairs) => set.absorb_map(pairs),
                    other => {
                        return Err(ScriptError::Type(format!(
                            "attribute hash `{code}` evaluated to {}",
                            other.type_name()
                        )));
                    }
                },
                AttrSource::Pair { key, value } => {
                    let value = match value {
                        AttrValue::Literal(text) => Value::Str(unescape_single(text)),
                        AttrValue::Interpolated(text) => {
                            Value::Str(interpolate::interpolate(text, evaluator)?)
                        }
                        AttrValue::Eval(code) => evaluator.evaluate(code)?,
                        AttrValue::True => Value::Bool(true),
                    };
                    set.insert(key.clone(), value);
                }
                AttrSource::Class(name) => set.classes.push(Value::Str(name.clone())),
                AttrSource::Id(name) => set.shorthand_id = Some(name.clone()),
            }
        }
        Ok(set)
    }

    fn absorb_map(&mut self, pairs: Vec<(String, Value)>) {
        for (key, value) in pairs {
            match value {
                Value::Map(nested) if key != "id" && key != "class" => {
                    for (sub, value) in nested {
                        self.set(format!("{key}-{sub}").replace('_', "-"), value);
                    }
                }
                value => self.insert(key, value),
            }
        }
    }

    fn insert(&mut self, key: String, value: Value) {
        match key.as_str() {
            "id" => self.ids.push(value),
            "class" => self.classes.push(value),
            _ => self.set(key, value),
        }
    }

    fn set(&mut self, key: String, value: Value) {
        match self.pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Renders the attribute string, every attribute preceded by a space.
    pub(crate) fn render(&self, format: Format) -> String {
        let mut out = String::new();
        for (key, value) in &self.pairs {
            match value {
                Value::Nil | Value::Bool(false) => {}
                Value::Bool(true) if format == Format::Xhtml => {
                    out.push_str(&format!(" {key}='{key}'"));
                }
                Value::Bool(true) => {
                    out.push(' ');
                    out.push_str(key);
                }
                other => out.push_str(&format!(" {key}='{}'", quote(&other.to_text()))),
            }
        }

        let mut classes = Vec::new();
        flatten_into(&self.classes, &mut classes);
        if !classes.is_empty() {
            classes.sort();
            out.push_str(&format!(" class='{}'", quote(&classes.join(" "))));
        }

        let mut ids: Vec<String> = self.shorthand_id.iter().cloned().collect();
        flatten_into(&self.ids, &mut ids);
        if !ids.is_empty() {
            out.push_str(&format!(" id='{}'", quote(&ids.join("_"))));
        }
        out
    }
}

fn flatten_into(values: &[Value], out: &mut Vec<String>) {
    for value in values {
        match value {
            Value::Nil | Value::Bool(false) => {}
            Value::Array(items) => flatten_into(items, out),
            other => out.push(other.to_text()),
        }
    }
}

fn quote(text: &str) -> String {
    text.replace('\'', "&#39;")
}

fn unescape_single(text: &str) -> String {
    text.replace("\\'", "'").replace("\\\\", "\\")
}
