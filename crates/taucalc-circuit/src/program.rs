//! Engine programs: newline-separated definitions and display directives.

use crate::error::{CircuitError, Result};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

static DISPLAY_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^n\s+(\w+)\(x\)").expect("display directive pattern is valid")
});

/// One executable line of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    /// Anything that is not a display directive, sent as-is.
    Setup(&'a str),
    /// `n <name>(x)`: asks the engine to normalize and print a definition.
    Display { name: &'a str, text: &'a str },
}

impl<'a> Statement<'a> {
    /// Classifies a trimmed, non-comment line.
    pub fn parse(line: &'a str) -> Self {
        if line.starts_with("n ") {
            if let Some(name) = DISPLAY_DIRECTIVE
                .captures(line)
                .and_then(|caps| caps.get(1))
            {
                return Statement::Display {
                    name: name.as_str(),
                    text: line,
                };
            }
        }
        Statement::Setup(line)
    }

    pub fn text(&self) -> &'a str {
        match *self {
            Statement::Setup(text) => text,
            Statement::Display { text, .. } => text,
        }
    }
}

/// An immutable program in the engine's formula language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProgram {
    source: String,
}

impl EngineProgram {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Reads a program file.
    pub fn load(path: &Path) -> Result<Self> {
        std::fs::read_to_string(path)
            .map(Self::from_source)
            .map_err(|e| {
                CircuitError::Configuration(format!(
                    "failed to read program {}: {e}",
                    path.display()
                ))
            })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Executable lines: trimmed, with blanks and `#` comments removed.
    pub fn statements(&self) -> impl Iterator<Item = Statement<'_>> {
        self.source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Statement::parse)
    }

    /// Names of every displayed definition, in program order.
    pub fn display_names(&self) -> Vec<&str> {
        self.statements()
            .filter_map(|stmt| match stmt {
                Statement::Display { name, .. } => Some(name),
                Statement::Setup(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for EngineProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Accumulates program text section by section.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    source: String,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.source.push_str("# ");
        self.source.push_str(text.as_ref());
        self.source.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.source.push('\n');
        self
    }

    /// Emits `name(params) := body`.
    pub fn define(&mut self, name: &str, params: &str, body: impl AsRef<str>) -> &mut Self {
        self.source.push_str(&format!("{name}({params}) := {}\n", body.as_ref()));
        self
    }

    /// Emits `name(x) := body`, the single-argument form every bit uses.
    pub fn bit(&mut self, name: impl fmt::Display, body: impl AsRef<str>) -> &mut Self {
        self.source.push_str(&format!("{name}(x) := {}\n", body.as_ref()));
        self
    }

    /// Emits display directives for `bit0..=bit{last}`.
    pub fn display_bits(&mut self, last: u32) -> &mut Self {
        for i in 0..=last {
            self.source.push_str(&format!("n bit{i}(x)\n"));
        }
        self
    }

    pub fn build(&mut self) -> EngineProgram {
        EngineProgram::from_source(std::mem::take(&mut self.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_skip_comments_and_blanks() {
        let program = EngineProgram::from_source(
            "\n# header\n  a1(x) := 1  \n\n# Display\nn bit0(x)\n",
        );
        let statements: Vec<_> = program.statements().collect();
        assert_eq!(
            statements,
            vec![
                Statement::Setup("a1(x) := 1"),
                Statement::Display {
                    name: "bit0",
                    text: "n bit0(x)"
                },
            ]
        );
    }

    #[test]
    fn test_display_requires_argument_form() {
        assert_eq!(Statement::parse("n bit3"), Statement::Setup("n bit3"));
        assert_eq!(
            Statement::parse("n carry2(x)").text(),
            "n carry2(x)"
        );
    }

    #[test]
    fn test_builder_layout() {
        let program = ProgramBuilder::new()
            .comment("demo")
            .bit("bit0", "1")
            .define("halfAdderSum", "a, b", "a + b")
            .blank()
            .display_bits(1)
            .build();
        assert_eq!(
            program.source(),
            "# demo\nbit0(x) := 1\nhalfAdderSum(a, b) := a + b\n\nn bit0(x)\nn bit1(x)\n"
        );
        assert_eq!(program.display_names(), vec!["bit0", "bit1"]);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().expect("TempDir should create test directory");
        let path = dir.path().join("sum.tau");
        std::fs::write(&path, "bit0(x) := 1\nn bit0(x)\n").expect("write program");
        let program = EngineProgram::load(&path).expect("program should load");
        assert_eq!(program.display_names(), vec!["bit0"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineProgram::load(Path::new("/nonexistent/program.tau"));
        assert!(matches!(result, Err(CircuitError::Configuration(_))));
    }
}
