//! SQL query result models.
//!
//! Results are fed to the language model as text, so besides the structured
//! [`QueryResult`] this module owns the textual rendering: a Python-style list
//! of tuples such as `[(34,)]`, the shape the answer prompt's worked example
//! uses.

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Longest string cell rendered into the prompt before it is cut.
pub const MAX_CELL_LENGTH: usize = 300;

/// Result of a SQL query execution.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueryResult {
    /// Column information.
    pub columns: Vec<ColumnInfo>,

    /// Row data (each row is a vector of JSON values).
    pub rows: Vec<Vec<Value>>,

    /// Number of rows returned.
    pub row_count: usize,

    /// Query execution time in milliseconds.
    pub execution_time_ms: u64,
}

/// Column information in query result.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as reported by the driver.
    pub data_type: String,
}

impl QueryResult {
    /// Creates a result from rows.
    pub fn from_rows(columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>, execution_time_ms: u64) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
            execution_time_ms,
        }
    }

    /// Renders rows as a list of tuples. Statements without rows render as
    /// an empty string.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        let kinds: Vec<ColumnKind> = self
            .columns
            .iter()
            .map(|c| ColumnKind::from_type_name(&c.data_type))
            .collect();
        let rows: Vec<String> = self.rows.iter().map(|row| render_tuple(row, &kinds)).collect();
        format!("[{}]", rows.join(", "))
    }
}

/// Outcome of running model-generated SQL.
///
/// Driver failures are values, not errors: the pipeline forwards them to the
/// answer prompt.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// The statement ran.
    Rows(QueryResult),
    /// The driver rejected the statement; holds its message.
    Failed(String),
}

impl QueryOutcome {
    /// Text placed in the `{result}` placeholder.
    pub fn to_prompt_text(&self) -> String {
        match self {
            QueryOutcome::Rows(result) => result.render(),
            QueryOutcome::Failed(message) => format!("Error: {}", message),
        }
    }

    /// Whether the statement failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, QueryOutcome::Failed(_))
    }
}

/// Coarse value class of a column, derived from the driver's type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    /// Exact numeric; cells keep the driver's text.
    Decimal,
    Boolean,
    Text,
}

impl ColumnKind {
    /// Classifies a MySQL or PostgreSQL type name.
    pub fn from_type_name(type_name: &str) -> Self {
        let upper = type_name.to_ascii_uppercase();
        let base = upper.trim_end_matches(" UNSIGNED");
        match base {
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "INT2"
            | "INT4" | "INT8" | "YEAR" => ColumnKind::Integer,
            "FLOAT" | "DOUBLE" | "REAL" | "FLOAT4" | "FLOAT8" => ColumnKind::Float,
            "DECIMAL" | "NUMERIC" => ColumnKind::Decimal,
            "BOOL" | "BOOLEAN" => ColumnKind::Boolean,
            _ => ColumnKind::Text,
        }
    }

    /// Converts a textual cell into a JSON value of this kind.
    pub fn parse_cell(&self, raw: Option<String>) -> Value {
        let Some(raw) = raw else {
            return Value::Null;
        };
        match self {
            ColumnKind::Integer => match (raw.parse::<i64>(), raw.parse::<u64>()) {
                (Ok(v), _) => Value::from(v),
                (_, Ok(v)) => Value::from(v),
                _ => Value::String(raw),
            },
            ColumnKind::Float => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Value::from(v),
                _ => Value::String(raw),
            },
            ColumnKind::Boolean => match raw.as_str() {
                "t" | "true" | "1" => Value::Bool(true),
                "f" | "false" | "0" => Value::Bool(false),
                _ => Value::String(raw),
            },
            ColumnKind::Decimal | ColumnKind::Text => Value::String(raw),
        }
    }
}

fn render_tuple(row: &[Value], kinds: &[ColumnKind]) -> String {
    let cells: Vec<String> = row
        .iter()
        .enumerate()
        .map(|(i, value)| match (kinds.get(i), value) {
            (Some(ColumnKind::Decimal), Value::String(s)) if is_decimal_literal(s) => s.clone(),
            _ => render_value(value),
        })
        .collect();
    match cells.len() {
        1 => format!("({},)", cells[0]),
        _ => format!("({})", cells.join(", ")),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            let s = truncate_words(s, MAX_CELL_LENGTH);
            format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
        }
        other => other.to_string(),
    }
}

/// `-12.50`, `100`, `1E+3`: digits with optional sign, point and exponent.
fn is_decimal_literal(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (mantissa, exponent) = match body.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e.strip_prefix(['-', '+']).unwrap_or(e))),
        None => (body, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    !(int.is_empty() && frac.is_empty())
        && digits(int)
        && digits(frac)
        && exponent.map_or(true, |e| !e.is_empty() && digits(e))
}

/// Cuts text to at most `max` characters on a word boundary, appending `...`.
pub fn truncate_words(text: &str, max: usize) -> String {
    const SUFFIX: &str = "...";
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep: String = text.chars().take(max.saturating_sub(SUFFIX.len())).collect();
    let head = match keep.rsplit_once(' ') {
        Some((head, _)) => head,
        None => keep.as_str(),
    };
    format!("{}{}", head, SUFFIX)
}
