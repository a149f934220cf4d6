//! Continuation joining.
//!
//! Two kinds of physical lines are merged into one logical line:
//!
//! * runs of lines ending in `|` (pipe continuation);
//! * tag lines whose attribute list is still open at the end of the line
//!   (attribute continuation).

use std::iter::Peekable;

use crate::arena::Arena;
use crate::line::Line;
use crate::scan::{self, Nesting};

pub fn join_continuations(arena: &mut Arena, lines: Vec<Line>) -> Vec<Line> {
    let mut joined = Vec::with_capacity(lines.len());
    let mut lines = lines.into_iter().peekable();
    while let Some(line) = lines.next() {
        let line = join_pipes(arena, line, &mut lines);
        let line = join_attributes(arena, line, &mut lines);
        joined.push(line);
    }
    joined
}

fn pipe_body(text: &str) -> Option<&str> {
    text.trim_end_matches([' ', '\t', '\n', '\r'])
        .strip_suffix('|')
        .map(|body| body.trim_end_matches([' ', '\t']))
}

fn join_pipes<I>(arena: &mut Arena, line: Line, rest: &mut Peekable<I>) -> Line
where
    I: Iterator<Item = Line>,
{
    let text = arena.text(&line.content);
    let Some(body) = pipe_body(&text) else {
        return line;
    };

    let mut merged = body.to_string();
    while let Some(next) = rest.peek() {
        let next_text = arena.text(&next.content);
        let Some(next_body) = pipe_body(&next_text) else {
            break;
        };
        merged.push(' ');
        merged.push_str(next_body);
        rest.next();
    }
    merged.push('\n');
    Line::new(line.indent, arena.intern(&merged))
}

/// Whether the line is a tag whose name runs straight into an attribute
/// or shorthand opener.
fn opens_attributes(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&b'%') {
        return None;
    }
    let index = scan::first_invalid(bytes, 1);
    match bytes.get(index) {
        Some(b'.' | b'#' | b'(' | b'{') => Some(index),
        _ => None,
    }
}

fn join_attributes<I>(arena: &mut Arena, line: Line, rest: &mut Peekable<I>) -> Line
where
    I: Iterator<Item = Line>,
{
    let mut merged = arena.text(&line.content);
    let Some(mut index) = opens_attributes(merged.as_bytes()) else {
        return line;
    };

    let mut nesting = Nesting::default();
    let mut consumed = 0usize;
    while let Some(&ch) = merged.as_bytes().get(index) {
        match ch {
            b'\n' if nesting.is_open() => {
                let Some(next) = rest.next() else {
                    break;
                };
                merged.replace_range(index..=index, " ");
                merged.push_str(&arena.text(&next.content));
                consumed += 1;
            }
            b'\n' => break,
            b' ' | b'\t' if !nesting.is_open() => break,
            _ => nesting.feed(ch),
        }
        index += 1;
    }

    if consumed == 0 {
        return line;
    }
    log::trace!("joined {consumed} attribute continuation line(s)");
    Line::new(line.indent, arena.intern(&merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::split_lines;

    fn join(template: &str) -> Vec<(usize, String)> {
        let mut arena = Arena::new();
        let lines = split_lines(&mut arena, template, 2);
        join_continuations(&mut arena, lines)
            .iter()
            .map(|line| (line.indent, arena.text(&line.content)))
            .collect()
    }

    #[test]
    fn pipe_runs_merge_into_one_line() {
        let lines = join("foo |\nbar |\nbaz\n");
        assert_eq!(
            lines,
            vec![(0, "foo bar\n".to_string()), (0, "baz\n".to_string())]
        );
    }

    #[test]
    fn pipe_run_keeps_the_first_indent() {
        let lines = join("%p\n  one  |\n    two |\n  three\n");
        assert_eq!(lines[1], (2, "one two\n".to_string()));
        assert_eq!(lines[2], (2, "three\n".to_string()));
    }

    #[test]
    fn open_attribute_hash_pulls_in_following_lines() {
        let lines = join("%a{href: '/',\n   title: 'x'} link\n%p\n");
        assert_eq!(
            lines,
            vec![
                (0, "%a{href: '/', title: 'x'} link\n".to_string()),
                (0, "%p\n".to_string()),
            ]
        );
    }

    #[test]
    fn html_style_attributes_continue_too() {
        let lines = join("%input(type='text'\n  name='q')\n");
        assert_eq!(lines, vec![(0, "%input(type='text' name='q')\n".to_string())]);
    }

    #[test]
    fn closed_attributes_leave_lines_alone() {
        let lines = join("%p{a: 1}\n  text\n");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn unterminated_attributes_stop_at_end_of_input() {
        let lines = join("%p{a: 1,\nb: 2\n");
        assert_eq!(lines, vec![(0, "%p{a: 1, b: 2\n".to_string())]);
    }
}
