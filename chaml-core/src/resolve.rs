//! Dynamic resolution pass.
//!
//! Walks the tree in document order and replaces every dynamic line with
//! the text its script produces. Filters rewrite their subtree
//! structurally; everything else is lowered to a [`Program`] and run
//! through the evaluator. Static lines are left for emission.

use crate::arena::Arena;
use crate::attributes;
use crate::error::CoreError;
use crate::filters;
use crate::line::{Chain, Line};
use crate::options::Options;
use crate::program::{Piece, Program};
use crate::scan;
use crate::script::ScriptEvaluator;
use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Static,
    Filter,
    Dynamic,
}

fn classify(text: &str) -> Kind {
    let bytes = text.as_bytes();
    let Some(&first) = bytes.first() else {
        return Kind::Static;
    };
    match first {
        b'\\' => Kind::Static,
        b':' => Kind::Filter,
        b'-' | b'=' | b'~' | b'.' | b'#' => Kind::Dynamic,
        b'%' => {
            let mut index = scan::first_invalid(bytes, 1);
            if matches!(bytes.get(index), Some(b'.' | b'#' | b'(' | b'{'))
                || scan::skip_tag_options(bytes, &mut index).is_some()
                || scan::has_dynamic_part(bytes, index)
            {
                Kind::Dynamic
            } else {
                Kind::Static
            }
        }
        b'&' | b'!' if bytes.get(1) == Some(&b'=') => Kind::Dynamic,
        b'&' | b'!' if scan::has_dynamic_part(bytes, 1) => Kind::Dynamic,
        _ if scan::has_dynamic_part(bytes, 0) => Kind::Dynamic,
        _ => Kind::Static,
    }
}

/// Resolves every dynamic node reachable from `first`.
pub fn resolve(
    arena: &mut Arena,
    first: Option<NodeId>,
    options: &Options,
    evaluator: &mut dyn ScriptEvaluator,
) -> Result<(), CoreError> {
    let mut resolver = Resolver {
        arena,
        options,
        evaluator,
    };
    resolver.run(first)
}

struct Resolver<'a, 'e> {
    arena: &'a mut Arena,
    options: &'a Options,
    evaluator: &'e mut dyn ScriptEvaluator,
}

impl Resolver<'_, '_> {
    fn run(&mut self, first: Option<NodeId>) -> Result<(), CoreError> {
        let mut pending: Vec<NodeId> = first.into_iter().collect();
        while let Some(id) = pending.pop() {
            let text = self.arena.content(id);
            let (last, descend) = match classify(&text) {
                Kind::Static => (id, true),
                Kind::Filter => {
                    let last = filters::apply(self.arena, id, self.options, self.evaluator)?;
                    (last, false)
                }
                Kind::Dynamic => {
                    self.run_line(id, &text)?;
                    (id, true)
                }
            };
            pending.extend(self.arena.node(last).next);
            if descend {
                pending.extend(self.arena.node(id).subtree);
            }
        }
        Ok(())
    }

    fn run_line(&mut self, id: NodeId, text: &str) -> Result<(), CoreError> {
        let program = lower(text, self.options);
        log::trace!("{id:?}: {program}");
        match program.run(self.evaluator, self.options.format)? {
            Some(out) => {
                let slice = self.arena.intern(&out);
                self.arena.node_mut(id).line.content = Chain::single(slice);
            }
            None => self.arena.node_mut(id).line = Line::empty(),
        }
        Ok(())
    }
}

/// Marker that makes emission treat evaluated text as plain text.
fn text_marker(options: &Options) -> &'static str {
    if options.escape_html { "&" } else { "\\" }
}

fn rest_after(text: &str, from: usize) -> &str {
    let bytes = text.as_bytes();
    scan::chomp(&text[scan::rest_start(bytes, from)..])
}

/// Lowers one dynamic line to the program that produces its new content.
pub(crate) fn lower(text: &str, options: &Options) -> Program {
    let bytes = text.as_bytes();
    let mut program = Program::new();

    match bytes.first().copied() {
        Some(b'-') => program.exec(rest_after(text, 1)),
        Some(marker @ (b'=' | b'~')) => {
            program.text(text_marker(options));
            let code = rest_after(text, 1).to_string();
            program.emit(if marker == b'=' {
                Piece::Eval(code)
            } else {
                Piece::Preserve(code)
            });
            program.text("\n");
        }
        Some(marker @ (b'&' | b'!')) => {
            program.text(if marker == b'&' { "& " } else { "! " });
            if bytes.get(1) == Some(&b'=') {
                program.emit(Piece::Eval(rest_after(text, 2).to_string()));
            } else {
                program.emit(Piece::Interpolate(rest_after(text, 1).to_string()));
            }
            program.text("\n");
        }
        Some(b'%') => {
            let end = scan::first_invalid(bytes, 1);
            lower_tag(&mut program, text, &text[1..end], end);
        }
        Some(b'.') => lower_tag(&mut program, text, "div", 0),
        Some(b'#') if bytes.get(1) != Some(&b'{') => lower_tag(&mut program, text, "div", 0),
        Some(b'/') => {
            program.emit(Piece::Interpolate(scan::chomp(text).to_string()));
            program.text("\n");
        }
        _ => {
            program.text(text_marker(options));
            program.emit(Piece::Interpolate(scan::chomp(text).to_string()));
            program.text("\n");
        }
    }
    program
}

fn lower_tag(program: &mut Program, text: &str, name: &str, mut index: usize) {
    let bytes = text.as_bytes();
    program.text(format!("%{name}"));

    let sources = attributes::parse(text, &mut index);
    if !sources.is_empty() {
        program.text("{");
        program.emit(Piece::Attributes(sources));
        program.text("}");
    }

    let options_start = index;
    let evaluated = scan::skip_tag_options(bytes, &mut index).map(|position| bytes[position]);
    let tag_options: String = text[options_start..index]
        .chars()
        .filter(|ch| !matches!(ch, '=' | '~'))
        .collect();
    if !tag_options.is_empty() {
        program.text(tag_options);
    }

    let rest = rest_after(text, index).to_string();
    match evaluated {
        Some(b'~') => {
            program.text(" ");
            program.emit(Piece::Preserve(rest));
        }
        Some(_) => {
            program.text(" ");
            program.emit(Piece::Eval(rest));
        }
        None if !rest.is_empty() => {
            program.text(" ");
            program.emit(Piece::Interpolate(rest));
        }
        None => {}
    }
    program.text("\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use crate::lexer::split_lines;
    use crate::options::Format;
    use crate::script::Interpreter;
    use crate::tree;

    fn resolved(template: &str, options: &Options, interpreter: &mut Interpreter) -> String {
        let mut arena = Arena::new();
        let lines = split_lines(&mut arena, template, options.indent_width());
        let first = tree::build(&mut arena, lines).expect("tree builds");
        resolve(&mut arena, first, options, interpreter).expect("template resolves");
        flatten(&arena, first)
    }

    #[test]
    fn classification_follows_the_leading_bytes() {
        assert_eq!(classify("\\= x\n"), Kind::Static);
        assert_eq!(classify(":css\n"), Kind::Filter);
        assert_eq!(classify("- x = 1\n"), Kind::Dynamic);
        assert_eq!(classify("%p text\n"), Kind::Static);
        assert_eq!(classify("%p.x\n"), Kind::Dynamic);
        assert_eq!(classify("%p= x\n"), Kind::Dynamic);
        assert_eq!(classify("%p<~ x\n"), Kind::Dynamic);
        assert_eq!(classify("%p a #{b}\n"), Kind::Dynamic);
        assert_eq!(classify("#main\n"), Kind::Dynamic);
        assert_eq!(classify("&= x\n"), Kind::Dynamic);
        assert_eq!(classify("& a < b\n"), Kind::Static);
        assert_eq!(classify("!!! 5\n"), Kind::Static);
        assert_eq!(classify("plain #{x}\n"), Kind::Dynamic);
        assert_eq!(classify("plain\n"), Kind::Static);
    }

    #[test]
    fn tags_lower_to_attribute_programs() {
        let program = lower("%a.b(href='/')= link\n", &Options::default());
        assert_eq!(
            program.to_string(),
            "<< \"%a\"; << \"{\"; << attributes(.b(href='/')); << \"}\"; << \" \"; << (link); << \"\\n\""
        );
    }

    #[test]
    fn statements_clear_their_line() {
        let mut interpreter = Interpreter::new();
        let out = resolved("- x = 2\n= x * 3\n", &Options::default(), &mut interpreter);
        assert_eq!(out, "\\6\n");
    }

    #[test]
    fn evaluated_text_is_marked_for_escaping_when_enabled() {
        let options = Options {
            escape_html: true,
            ..Options::default()
        };
        let mut interpreter = Interpreter::new().with_local("x", "<b>");
        assert_eq!(resolved("= x\n", &options, &mut interpreter), "&<b>\n");
        assert_eq!(resolved("hi #{x}\n", &options, &mut interpreter), "&hi <b>\n");
    }

    #[test]
    fn tags_keep_their_options_and_resolve_attributes() {
        let mut interpreter = Interpreter::new().with_local("n", 3_i64);
        let out = resolved("%p{a: n}<= n + 1\n", &Options::default(), &mut interpreter);
        assert_eq!(out, "%p{ a='3'}< 4\n");
    }

    #[test]
    fn shorthand_selectors_become_divs() {
        let options = Options {
            format: Format::Xhtml,
            ..Options::default()
        };
        let mut interpreter = Interpreter::new();
        let out = resolved(".a#b\n  text\n", &options, &mut interpreter);
        assert_eq!(out, "%div{ class='a' id='b'}\n  text\n");
    }

    #[test]
    fn unescape_markers_keep_their_prefix() {
        let mut interpreter = Interpreter::new().with_local("x", "<i>");
        let out = resolved("!= x\n& #{x}\n", &Options::default(), &mut interpreter);
        assert_eq!(out, "! <i>\n& <i>\n");
    }

    #[test]
    fn interpolated_comments_keep_their_marker() {
        let mut interpreter = Interpreter::new().with_local("x", 1_i64);
        let out = resolved("/ note #{x}\n", &Options::default(), &mut interpreter);
        assert_eq!(out, "/ note 1\n");
    }

    #[test]
    fn script_children_are_resolved_too() {
        let mut interpreter = Interpreter::new();
        let out = resolved("= 1\n  = 2\n", &Options::default(), &mut interpreter);
        assert_eq!(out, "\\1\n  \\2\n");
    }

    #[test]
    fn evaluator_errors_abort_resolution() {
        let mut arena = Arena::new();
        let lines = split_lines(&mut arena, "= missing\n", 2);
        let first = tree::build(&mut arena, lines).expect("tree builds");
        let err = resolve(&mut arena, first, &Options::default(), &mut Interpreter::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Script(crate::error::ScriptError::UndefinedVariable(_))
        ));
    }
}
