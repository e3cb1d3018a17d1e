//! Database schema description used in the `{schema}` prompt placeholder.

use serde::Serialize;
use utoipa::ToSchema;

use super::query::truncate_words;

/// Longest sample cell shown in the schema text.
const MAX_SAMPLE_CELL_LENGTH: usize = 100;

/// One column of a table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Full column type, e.g. `varchar(160)`.
    pub data_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
}

/// One table with its columns and a few sample rows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnSchema>,
    /// Sample rows, cells as text (`None` for NULL).
    pub sample_rows: Vec<Vec<Option<String>>>,
}

impl TableSchema {
    /// Renders a `CREATE TABLE` block followed by the sample rows, if any.
    pub fn render(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let null = if c.nullable { "" } else { " NOT NULL" };
                format!("\t{} {}{}", c.name, c.data_type.to_uppercase(), null)
            })
            .collect();

        let mut out = format!("CREATE TABLE {} (\n{}\n)", self.name, columns.join(", \n"));

        if !self.sample_rows.is_empty() {
            let header: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
            let rows: Vec<String> = self
                .sample_rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| match cell {
                            Some(v) => truncate_words(v, MAX_SAMPLE_CELL_LENGTH),
                            None => "None".to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect();
            out.push_str(&format!(
                "\n\n/*\n{} rows from {} table:\n{}\n{}\n*/",
                self.sample_rows.len(),
                self.name,
                header.join("\t"),
                rows.join("\n")
            ));
        }
        out
    }
}

/// All tables of the connected database.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DatabaseSchema {
    /// Tables sorted by name.
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    /// Text handed to the language model.
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(TableSchema::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
