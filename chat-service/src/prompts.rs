//! Prompt templates.
//!
//! Completion quality depends on the exact wording and ordering of these
//! texts; change them only together with an evaluation run.

use std::collections::HashMap;

use common::errors::{AppError, AppResult};

/// Question → SQL. Placeholders: `{schema}`, `{question}`.
pub const SQL_QUERY_TEMPLATE: &str = "Below is the schema of the connected database. Read the schema carefully, paying attention to the table and column names. Ensure that table or column names are used exactly as they appear in the schema. Answer the user's question in the form of an SQL query.

    {schema}

    Please provide only the SQL query and nothing else.

    question: {question}
    SQL query:";

/// Result → answer. Placeholders: `{schema}`, `{question}`, `{query}`, `{result}`.
pub const RESPONSE_TEMPLATE: &str = "Below is the schema of the connected database. Based on the schema and the query result, write a natural language response to the user's question.

    {schema}

    Examples:
    question: How many albums are in the database?
    SQL query: SELECT COUNT(*) FROM album;
    Result: [(34,)]
    Response: There are 34 albums in the database.

    Now it's your turn to write a response based on the result:
    question: {question}
    SQL query: {query}
    Result: {result}
    Response:";

/// A text with `{name}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    text: &'static str,
}

impl PromptTemplate {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    /// Template turning a question into SQL.
    pub const fn sql_query() -> Self {
        Self::new(SQL_QUERY_TEMPLATE)
    }

    /// Template turning a query result into an answer.
    pub const fn response() -> Self {
        Self::new(RESPONSE_TEMPLATE)
    }

    /// Substitutes every placeholder in a single pass, so values that
    /// themselves contain `{...}` are left untouched. Fails if a placeholder
    /// has no value.
    pub fn fill(&self, variables: &HashMap<&str, String>) -> AppResult<String> {
        let mut out = String::with_capacity(self.text.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = variables.get(name).ok_or_else(|| {
                        AppError::Validation(format!("missing prompt variable '{}'", name))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut rest = self.text;
        while let Some(open) = rest.find('{') {
            let Some(len) = rest[open + 1..].find('}') else {
                break;
            };
            let name = &rest[open + 1..open + 1 + len];
            if is_identifier(name) {
                segments.push(Segment::Literal(&rest[..open]));
                segments.push(Segment::Placeholder(name));
            } else {
                segments.push(Segment::Literal(&rest[..open + 1]));
                rest = &rest[open + 1..];
                continue;
            }
            rest = &rest[open + len + 2..];
        }
        segments.push(Segment::Literal(rest));
        segments
    }
}

enum Segment {
    Literal(&'static str),
    Placeholder(&'static str),
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
