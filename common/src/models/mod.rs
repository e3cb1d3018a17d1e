//! Data models shared by the pipeline components and the HTTP surface.

pub mod chat;
pub mod connection;
pub mod language;
pub mod query;
pub mod schema;

pub use chat::{AskRequest, AskResponse, ChatRole, ChatTurn};
pub use connection::{ConnectRequest, ConnectionConfig, ConnectionInfo, DbType};
pub use language::{Language, LanguagesResponse, SelectLanguageRequest, SUPPORTED_LANGUAGES};
pub use query::{ColumnInfo, ColumnKind, QueryOutcome, QueryResult};
pub use schema::{ColumnSchema, DatabaseSchema, TableSchema};
