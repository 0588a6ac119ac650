use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("env {key} not set")]
    MissingPassword { key: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("psql exited with status {status}: {sql}")]
    SqlFailed { sql: String, status: i32 },

    #[error("malformed catalog output: {0}")]
    Csv(#[from] csv::Error),

    #[error("column {column}: {field} is not a non-negative integer: {value:?}")]
    InvalidCatalogValue {
        column: String,
        field: &'static str,
        value: String,
    },

    #[error("table {schema}.{table} does not exist or is not accessible")]
    TableNotFound { schema: String, table: String },
}
