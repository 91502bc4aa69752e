//! User-facing diagnostic lines.

use std::fmt;

use crate::Span;

/// A message with an optional source location.
///
/// Renders as `<line>:<column>: <message>`, or just the message when there
/// is no location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Option<Span>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(span: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }

    /// Format the diagnostic with the offending source line and a caret.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut output = format!("{self}\n");

        let Some(span) = self.span else {
            return output;
        };

        if let Some(line_text) = get_line(source, span.line) {
            output.push_str("  |\n");
            output.push_str(&format!("{:>3} | {}\n", span.line, line_text));

            let indent = " ".repeat(span.col.saturating_sub(1) as usize);
            let pointer = if span.len <= 1 {
                "^".to_string()
            } else {
                "^".to_string() + &"~".repeat((span.len - 1) as usize)
            };
            output.push_str(&format!("  | {}{}\n", indent, pointer));
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}:{}: {}", span.line, span.col, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Get the text of a specific line (1-indexed).
fn get_line(source: &str, line_num: u32) -> Option<&str> {
    source.lines().nth(line_num.checked_sub(1)? as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_prefix() {
        let diag = Diagnostic::new(Some(Span::new(3, 7, 1)), "Undefined variable 'y'");
        assert_eq!(diag.to_string(), "3:7: Undefined variable 'y'");
    }

    #[test]
    fn renders_bare_message_without_location() {
        let diag = Diagnostic::new(None, "Cannot redefine function 'print'");
        assert_eq!(diag.to_string(), "Cannot redefine function 'print'");
    }

    #[test]
    fn caret_points_at_column() {
        let source = "int main() {\n  return y;\n}\n";
        let diag = Diagnostic::new(Some(Span::new(2, 10, 1)), "Undefined variable 'y'");
        let rendered = diag.display_with_source(source);
        assert!(rendered.contains("  2 |   return y;"));
        assert!(rendered.ends_with("  |          ^\n"));
    }
}
