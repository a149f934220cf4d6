use std::fs;
use std::path::Path;

use crate::arena::Arena;
use crate::emit;
use crate::error::{CoreError, OptionError};
use crate::flatten::flatten;
use crate::lexer::split_lines;
use crate::multiline::join_continuations;
use crate::options::{OptionValue, Options};
use crate::resolve;
use crate::script::ScriptEvaluator;
use crate::tree;

/// Compiles a template into markup.
///
/// Every embedded expression is evaluated through `evaluator`, in document
/// order. All intermediate state lives in one arena that is released when
/// this function returns, whether it succeeds or not.
pub fn compile(
    template: &str,
    options: &Options,
    evaluator: &mut dyn ScriptEvaluator,
) -> Result<String, CoreError> {
    let mut arena = Arena::new();

    let mut source = String::with_capacity(template.len() + 1);
    source.push_str(template);
    source.push('\n');

    let lines = split_lines(&mut arena, &source, options.indent_width());
    let lines = join_continuations(&mut arena, lines);
    log::debug!("{} logical lines", lines.len());

    let root = tree::build(&mut arena, lines)?;
    let root = tree::remove_silent_comments(&mut arena, root);
    log::debug!("built tree of {} nodes", arena.node_count());

    resolve::resolve(&mut arena, root, options, evaluator)?;
    emit::emit(&mut arena, root, options);
    Ok(flatten(&arena, root))
}

/// A template and its options, accumulated before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engine {
    template: String,
    options: Options,
}

impl Engine {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            options: Options::default(),
        }
    }

    pub fn with_options(template: impl Into<String>, options: Options) -> Self {
        Self {
            template: template.into(),
            options,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        Ok(Self::new(fs::read_to_string(path)?))
    }

    /// Replaces the template with the contents of `path`.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, CoreError> {
        self.template = fs::read_to_string(path)?;
        Ok(self)
    }

    pub fn append_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, CoreError> {
        let text = fs::read_to_string(path)?;
        Ok(self.concat(&text))
    }

    pub fn concat(&mut self, text: &str) -> &mut Self {
        self.template.push_str(text);
        self
    }

    pub fn append_option(
        &mut self,
        key: &str,
        value: impl Into<OptionValue>,
    ) -> Result<&mut Self, OptionError> {
        self.options.apply(key, value.into())?;
        Ok(self)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render(&self, evaluator: &mut dyn ScriptEvaluator) -> Result<String, CoreError> {
        compile(&self.template, &self.options, evaluator)
    }
}
