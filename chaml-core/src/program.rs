//! Lowered form of a dynamic line.
//!
//! A [`Program`] is a list of steps run against a [`ScriptEvaluator`]:
//! statements executed for their side effects, and pieces whose text is
//! appended to the line's new content.

use std::fmt;

use crate::attributes::{AttrSource, AttributeSet};
use crate::error::ScriptError;
use crate::interpolate;
use crate::options::Format;
use crate::preserve;
use crate::script::ScriptEvaluator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Piece {
    Text(String),
    /// Text with `\` escapes and `#{}` interpolation.
    Interpolate(String),
    Eval(String),
    /// Evaluated, then preserve-tag bodies rewritten.
    Preserve(String),
    /// Serialized attribute string, escaped for a `{...}` tag segment.
    Attributes(Vec<AttrSource>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Exec(String),
    Emit(Piece),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Program {
    steps: Vec<Step>,
}

impl Program {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn exec(&mut self, code: impl Into<String>) {
        self.steps.push(Step::Exec(code.into()));
    }

    pub(crate) fn emit(&mut self, piece: Piece) {
        self.steps.push(Step::Emit(piece));
    }

    pub(crate) fn text(&mut self, text: impl Into<String>) {
        self.emit(Piece::Text(text.into()));
    }

    /// Runs every step in order.
    ///
    /// Returns `None` when the program only executes statements, meaning
    /// the line produces no output.
    pub(crate) fn run(
        &self,
        evaluator: &mut dyn ScriptEvaluator,
        format: Format,
    ) -> Result<Option<String>, ScriptError> {
        let mut out: Option<String> = None;
        for step in &self.steps {
            match step {
                Step::Exec(code) => {
                    evaluator.evaluate(code)?;
                }
                Step::Emit(piece) => {
                    let text = render_piece(piece, evaluator, format)?;
                    out.get_or_insert_with(String::new).push_str(&text);
                }
            }
        }
        Ok(out)
    }
}

fn render_piece(
    piece: &Piece,
    evaluator: &mut dyn ScriptEvaluator,
    format: Format,
) -> Result<String, ScriptError> {
    Ok(match piece {
        Piece::Text(text) => text.clone(),
        Piece::Interpolate(text) => interpolate::interpolate(text, evaluator)?,
        Piece::Eval(code) => evaluator.evaluate(code)?.to_text(),
        Piece::Preserve(code) => preserve::preserve_elements(&evaluator.evaluate(code)?.to_text()),
        Piece::Attributes(sources) => {
            let rendered = AttributeSet::collect(sources, evaluator)?.render(format);
            rendered.replace('\\', "\\\\").replace('}', "\\}")
        }
    })
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            match step {
                Step::Exec(code) => write!(f, "{}", code.trim_end())?,
                Step::Emit(Piece::Text(text)) => write!(f, "<< {text:?}")?,
                Step::Emit(Piece::Interpolate(text)) => write!(f, "<< \"{}\"", text.trim_end())?,
                Step::Emit(Piece::Eval(code)) => write!(f, "<< ({})", code.trim_end())?,
                Step::Emit(Piece::Preserve(code)) => {
                    write!(f, "<< preserve({})", code.trim_end())?
                }
                Step::Emit(Piece::Attributes(sources)) => {
                    f.write_str("<< attributes(")?;
                    for source in sources {
                        write!(f, "{source}")?;
                    }
                    f.write_str(")")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Interpreter, Value};

    #[test]
    fn statements_alone_produce_no_output() {
        let mut program = Program::new();
        program.exec("x = 1");
        let mut interpreter = Interpreter::new();
        let out = program
            .run(&mut interpreter, Format::Html5)
            .expect("program should run");
        assert_eq!(out, None);
        assert_eq!(interpreter.local("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn pieces_concatenate_in_order() {
        let mut program = Program::new();
        program.text("\\");
        program.emit(Piece::Eval("1 + 2".to_string()));
        program.emit(Piece::Interpolate(" and #{'x'}".to_string()));
        program.text("\n");
        let out = program
            .run(&mut Interpreter::new(), Format::Html5)
            .expect("program should run");
        assert_eq!(out.as_deref(), Some("\\3 and x\n"));
    }

    #[test]
    fn preserve_encodes_element_bodies() {
        let mut program = Program::new();
        program.emit(Piece::Preserve("'<pre>a\nb</pre>'".to_string()));
        let out = program
            .run(&mut Interpreter::new(), Format::Html5)
            .expect("program should run");
        assert_eq!(out.as_deref(), Some("<pre>a&#x000A;b</pre>"));
    }

    #[test]
    fn attributes_escape_closing_braces() {
        let mut program = Program::new();
        program.emit(Piece::Attributes(vec![AttrSource::Hash(
            "{title: 'a}b'}".to_string(),
        )]));
        let out = program
            .run(&mut Interpreter::new(), Format::Html5)
            .expect("program should run");
        assert_eq!(out.as_deref(), Some(" title='a\\}b'"));
    }

    #[test]
    fn display_reads_like_code() {
        let mut program = Program::new();
        program.exec("x = 1\n");
        program.text("\\");
        program.emit(Piece::Eval("x".to_string()));
        assert_eq!(program.to_string(), "x = 1; << \"\\\\\"; << (x)");
    }
}
