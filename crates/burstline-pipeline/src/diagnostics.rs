//! Compiler output parsing.
//!
//! The compiler reports problems as `path(line,col): kind code: message`
//! lines mixed into its regular output. Anything that does not match that
//! shape is ignored here and left to the raw captured output.

use regex::Regex;
use serde::{Deserialize, Serialize};

const DIAGNOSTIC_LINE: &str =
    r"^(?P<file>.+)\((?P<line>\d+),(?P<col>\d+)\):\s+(?P<kind>error|warning)\s+(?P<code>[A-Za-z0-9_]+):\s+(?P<message>.*)$";

/// Severity of a parsed diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// One structured diagnostic parsed from compiler output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file the compiler attributed the problem to.
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub kind: DiagnosticKind,
    /// Compiler diagnostic code, e.g. `BC1370`.
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }
}

/// Parse every diagnostic line out of a captured output stream.
pub fn parse_diagnostics(output: &str) -> Vec<Diagnostic> {
    let Ok(pattern) = Regex::new(DIAGNOSTIC_LINE) else {
        return Vec::new();
    };

    output
        .lines()
        .filter_map(|line| {
            let captures = pattern.captures(line.trim_end())?;
            let parsed = Diagnostic {
                file: captures["file"].to_string(),
                line: captures["line"].parse().ok()?,
                column: captures["col"].parse().ok()?,
                kind: match &captures["kind"] {
                    "error" => DiagnosticKind::Error,
                    _ => DiagnosticKind::Warning,
                },
                code: captures["code"].to_string(),
                message: captures["message"].to_string(),
            };
            Some(parsed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_line() {
        let output = "Assets/Foo.cs(42,13): error BC1042: unsupported call to managed code";
        let diagnostics = parse_diagnostics(output);
        assert_eq!(diagnostics.len(), 1);
        let d = &diagnostics[0];
        assert_eq!(d.file, "Assets/Foo.cs");
        assert_eq!(d.line, 42);
        assert_eq!(d.column, 13);
        assert_eq!(d.kind, DiagnosticKind::Error);
        assert_eq!(d.code, "BC1042");
        assert_eq!(d.message, "unsupported call to managed code");
        assert!(d.is_error());
    }

    #[test]
    fn test_parse_warning_line() {
        let output = r"C:\src\Bar.cs(7,1): warning BC1370: safety checks disabled";
        let diagnostics = parse_diagnostics(output);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Warning);
        assert_eq!(diagnostics[0].file, r"C:\src\Bar.cs");
        assert!(!diagnostics[0].is_error());
    }

    #[test]
    fn test_parse_mixed_output() {
        let output = "\
Compiling assembly Foo...
Assets/Foo.cs(1,2): error BC1000: first
progress 50%
Assets/Bar.cs(3,4): warning BC2000: second
done
";
        let diagnostics = parse_diagnostics(output);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].is_error());
        assert!(!diagnostics[1].is_error());
    }

    #[test]
    fn test_non_matching_lines_ignored() {
        let output = "error: something vague\nwarning without location\n";
        assert!(parse_diagnostics(output).is_empty());
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_diagnostics("").is_empty());
    }
}
