//! Terminal diagnostics.
//!
//! A diagnostic names the root cause, the artifacts involved, and what to
//! change in the build to get a plannable layout.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when the graph file cannot be read.
    pub const NO_GRAPH: &str =
        "help: Export the build graph records as JSON and pass them with `--graph`";

    /// Suggestion when the package list cannot be read.
    pub const NO_PACKAGES: &str =
        "help: Pass the declared packages as a JSON list with `--packages`";

    /// Suggestion when a command fails without a layout error.
    pub const PLAN_FAILED: &str = "help: Re-run with `--verbose` for more details";
}

/// An error diagnostic with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (destination or build output path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color {
            "\x1b[1;31merror\x1b[0m"
        } else {
            "error"
        };

        output.push_str(&format!("{}: {}\n", label, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("path conflict at `mypkg/_examplemod.abi3.so`")
            .with_location("mypkg/_examplemod.abi3.so")
            .with_context("planned for `mypkg._examplemod` and `examplelib`")
            .with_suggestion("Give the artifacts distinct file names");

        let output = diag.format(false);
        assert!(output.starts_with("error: path conflict"));
        assert!(output.contains("--> mypkg/_examplemod.abi3.so"));
        assert!(output.contains("= planned for"));
        assert!(output.contains("1. Give the artifacts"));
    }

    #[test]
    fn test_no_suggestions_block_without_suggestions() {
        let output = Diagnostic::error("build graph not found").format(false);
        assert_eq!(output, "error: build graph not found\n");
    }
}
