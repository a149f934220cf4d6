//! Line lexer for CHaml templates.

use crate::arena::{Arena, Slice};
use crate::line::Line;

/// Split template text into indent-tagged lines.
///
/// The template is copied into the arena once; every returned line refers
/// to a slice of that copy. Leading tabs advance the indent to the next
/// multiple of `indent_width`, spaces count one column. Lines holding only
/// whitespace are dropped. Each line keeps its terminating `\n`.
pub fn split_lines(arena: &mut Arena, template: &str, indent_width: usize) -> Vec<Line> {
    let mut lexer = Lexer {
        chars: template.as_bytes(),
        len: template.len(),
        index: 0,
        indent_width: indent_width.max(1),
        source: arena.intern(template),
    };
    lexer.run()
}

struct Lexer<'src> {
    chars: &'src [u8],
    len: usize,
    index: usize,
    indent_width: usize,
    source: Slice,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Vec<Line> {
        let mut lines = Vec::new();

        while self.peek_char().is_some() {
            let indent = self.lex_indent();
            match self.peek_char() {
                None => break,
                Some(b'\n') => {
                    self.consume_char();
                    continue;
                }
                Some(b'\r') if self.peek_next() == Some(b'\n') => {
                    self.consume_char();
                    self.consume_char();
                    continue;
                }
                Some(_) => {}
            }

            let start = self.index;
            while let Some(ch) = self.peek_char() {
                self.consume_char();
                if ch == b'\n' {
                    break;
                }
            }
            lines.push(Line::new(indent, self.source.sub(start, self.index)));
        }

        lines
    }

    fn lex_indent(&mut self) -> usize {
        let mut indent = 0;
        while let Some(ch) = self.peek_char() {
            match ch {
                b' ' => indent += 1,
                b'\t' => indent = (indent / self.indent_width + 1) * self.indent_width,
                _ => break,
            }
            self.consume_char();
        }
        indent
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.len {
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(template: &str, width: usize) -> Vec<(usize, String)> {
        let mut arena = Arena::new();
        split_lines(&mut arena, template, width)
            .iter()
            .map(|line| (line.indent, arena.text(&line.content)))
            .collect()
    }

    #[test]
    fn splits_and_measures_indentation() {
        let lines = lines_of("%html\n  %body\n    hi\n", 2);
        assert_eq!(
            lines,
            vec![
                (0, "%html\n".to_string()),
                (2, "%body\n".to_string()),
                (4, "hi\n".to_string()),
            ]
        );
    }

    #[test]
    fn drops_blank_lines() {
        let lines = lines_of("a\n\n   \n\t\nb\n", 2);
        assert_eq!(lines, vec![(0, "a\n".to_string()), (0, "b\n".to_string())]);
    }

    #[test]
    fn tabs_round_up_to_the_indent_width() {
        let lines = lines_of("\tx\n \ty\n", 4);
        assert_eq!(lines[0].0, 4);
        assert_eq!(lines[1].0, 4);
    }

    #[test]
    fn keeps_a_final_line_without_terminator() {
        let lines = lines_of("a\nb", 2);
        assert_eq!(lines[1], (0, "b".to_string()));
    }
}
