//! Indentation-aware text output for the code generators.

use std::fmt;

/// A simple code formatter for generated code.
#[derive(Debug)]
pub struct CodeFormatter {
    output: String,
    indent_level: usize,
    indent_str: String,
    at_line_start: bool,
}

impl CodeFormatter {
    /// Create a new formatter with the given indent string.
    pub fn new(indent_str: &str) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: indent_str.to_string(),
            at_line_start: true,
        }
    }

    /// Increase indentation level.
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Decrease indentation level.
    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write text, indenting at the start of every line.
    pub fn write(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.output.push('\n');
                self.at_line_start = true;
                continue;
            }
            if self.at_line_start {
                for _ in 0..self.indent_level {
                    self.output.push_str(&self.indent_str);
                }
                self.at_line_start = false;
            }
            self.output.push(c);
        }
    }

    /// Write a line.
    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.write("\n");
    }

    /// Get the formatted output.
    pub fn finish(self) -> String {
        self.output
    }
}

impl fmt::Write for CodeFormatter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s);
        Ok(())
    }
}

/// Join displayable items with a separator.
pub fn format_list<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_formatter_indents_nested_lines() {
        let mut f = CodeFormatter::new("  ");
        f.writeln("while (i < 3) {");
        f.indent();
        f.writeln("i = (i + 1);");
        f.dedent();
        f.writeln("}");
        assert_eq!(f.finish(), "while (i < 3) {\n  i = (i + 1);\n}\n");
    }

    #[test]
    fn test_dedent_saturates() {
        let mut f = CodeFormatter::new("    ");
        f.dedent();
        f.writeln("x");
        assert_eq!(f.finish(), "x\n");
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(&[1, 2, 3], ", "), "1, 2, 3");
    }
}
