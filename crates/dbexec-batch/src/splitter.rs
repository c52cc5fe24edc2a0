//! Statement splitting on `GO` delimiter lines
//!
//! This is a lexical heuristic, not a SQL parser. A line whose only content
//! is `GO` (upper case, surrounding whitespace ignored) ends the current
//! statement; anything else, including `GO` inside
//! a longer line, a string literal or an identifier, is kept as-is. A `GO`
//! line inside a block comment or a multi-line string literal still splits.

/// One independently executable unit of SQL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based position within the script
    pub ordinal: usize,
    /// Trimmed, non-empty statement text
    pub sql: String,
}

/// Splits a script into statements.
///
/// The batch executor only depends on this trait, so a real tokenizer can
/// replace the `GO` heuristic without touching execution.
pub trait StatementSplitter: Send + Sync {
    fn split(&self, script: &str) -> Vec<Statement>;
}

/// Splitter for scripts using SQL Server style `GO` separator lines
#[derive(Debug, Clone, Copy, Default)]
pub struct GoDelimiterSplitter;

impl GoDelimiterSplitter {
    fn is_delimiter(line: &str) -> bool {
        line.trim() == "GO"
    }

    fn flush(current: &mut Vec<&str>, statements: &mut Vec<Statement>) {
        let joined = current.join("\n");
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            statements.push(Statement {
                ordinal: statements.len() + 1,
                sql: trimmed.to_string(),
            });
        }
        current.clear();
    }
}

impl StatementSplitter for GoDelimiterSplitter {
    fn split(&self, script: &str) -> Vec<Statement> {
        let mut statements = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in script.lines() {
            if Self::is_delimiter(line) {
                Self::flush(&mut current, &mut statements);
            } else {
                current.push(line);
            }
        }
        Self::flush(&mut current, &mut statements);

        statements
    }
}

/// Split `script` with the default `GO` splitter
pub fn split(script: &str) -> Vec<Statement> {
    GoDelimiterSplitter.split(script)
}
