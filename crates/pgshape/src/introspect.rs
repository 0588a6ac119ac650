//! Catalog introspection.
//!
//! Column metadata is read from `information_schema.columns` with a
//! `COPY ... TO STDOUT WITH CSV HEADER`, so the output of `psql` can be
//! parsed as plain CSV.

use crate::column::Column;
use crate::psql::SqlRunner;
use crate::report::Channel;
use crate::table::Table;
use crate::{Error, Result};
use serde::Deserialize;

/// Catalog types that cannot be rendered as a canonical type. Columns of
/// these types are dropped.
const SKIPPED_TYPES: &[&str] = &["USER-DEFINED", "xid"];

/// Outcome of looking up a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLookup {
    /// The table exists and has at least one usable column.
    Found(Table),
    /// The table does not exist, is not accessible, or has no usable columns.
    Absent,
}

impl TableLookup {
    pub fn found(&self) -> Option<&Table> {
        match self {
            TableLookup::Found(table) => Some(table),
            TableLookup::Absent => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            TableLookup::Found(table) => Some(table),
            TableLookup::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, TableLookup::Absent)
    }

    /// The table, or [`Error::TableNotFound`] naming `schema.table`.
    pub fn require(self, schema: &str, table: &str) -> Result<Table> {
        self.into_table().ok_or_else(|| Error::TableNotFound {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }
}

/// One row of `information_schema.columns`, as printed by `COPY ... CSV`.
///
/// Numeric fields are kept as text: NULL comes through as an empty field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogRow {
    pub column_name: String,
    pub data_type: String,
    pub numeric_precision: String,
    pub numeric_scale: String,
    pub character_maximum_length: String,
}

impl CatalogRow {
    /// False for rows whose type is dropped during introspection.
    pub fn is_supported(&self) -> bool {
        !SKIPPED_TYPES.contains(&self.data_type.as_str())
    }

    pub fn to_column(&self) -> Result<Column> {
        Ok(Column {
            name: self.column_name.clone(),
            base_type: self.data_type.as_str().into(),
            numeric_precision: self.parse_field("numeric_precision", &self.numeric_precision)?,
            numeric_scale: self.parse_field("numeric_scale", &self.numeric_scale)?,
            max_length: self.parse_field(
                "character_maximum_length",
                &self.character_maximum_length,
            )?,
        })
    }

    fn parse_field(&self, field: &'static str, value: &str) -> Result<Option<u32>> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidCatalogValue {
                column: self.column_name.clone(),
                field,
                value: value.to_string(),
            })
    }
}

/// Quote a SQL string literal, doubling embedded single quotes.
fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// SQL that prints the columns of `schema.table` as CSV, in ordinal order.
pub fn catalog_query_sql(schema: &str, table: &str) -> String {
    format!(
        "copy /* get columns of a table */
  (select column_name, data_type, numeric_precision, numeric_scale, character_maximum_length
      from information_schema.columns
      where table_schema={} and table_name={} and column_name != 'recxmin'
      order by ordinal_position) to stdout with csv header",
        literal(schema),
        literal(table)
    )
}

/// Build a table from the CSV printed by [`catalog_query_sql`].
///
/// Rows with unsupported types are skipped. If nothing is left the table is
/// reported as [`TableLookup::Absent`].
pub fn parse_catalog_csv(text: &str) -> Result<TableLookup> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let mut columns = Vec::new();
    for record in reader.deserialize::<CatalogRow>() {
        let row = record?;
        if !row.is_supported() {
            tracing::debug!(column = %row.column_name, data_type = %row.data_type, "skipping column");
            continue;
        }
        columns.push(row.to_column()?);
    }

    if columns.is_empty() {
        return Ok(TableLookup::Absent);
    }
    Ok(TableLookup::Found(Table::new(columns)))
}

/// Look up the table named by the runner's endpoint.
pub fn introspect<R: SqlRunner + ?Sized>(runner: &R) -> Result<TableLookup> {
    let endpoint = runner.endpoint();
    let output = runner.query(&catalog_query_sql(&endpoint.schema, &endpoint.table))?;
    let lookup = parse_catalog_csv(&output)?;

    let reporter = runner.reporter();
    match &lookup {
        TableLookup::Found(table) => {
            tracing::debug!(
                schema = %endpoint.schema,
                table = %endpoint.table,
                columns = table.len(),
                "introspected table"
            );
            reporter.report(
                endpoint.channel,
                &format!(
                    "{}.{}: {} columns",
                    endpoint.schema,
                    endpoint.table,
                    table.len()
                ),
            );
        }
        TableLookup::Absent => {
            tracing::debug!(schema = %endpoint.schema, table = %endpoint.table, "table absent");
            reporter.report(
                Channel::Info,
                &format!("{}.{} not found", endpoint.schema, endpoint.table),
            );
        }
    }

    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::BaseType;

    const HEADER: &str =
        "column_name,data_type,numeric_precision,numeric_scale,character_maximum_length";

    #[test]
    fn test_parse_catalog_csv() {
        let text = format!(
            "{HEADER}\nid,integer,32,0,\nname,character varying,,,50\namount,numeric,12,2,\npayload,json,,,"
        );
        let table = parse_catalog_csv(&text).unwrap().into_table().unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.columns[0].numeric_precision, Some(32));
        assert_eq!(table.columns[0].numeric_scale, Some(0));
        assert_eq!(table.columns[1].base_type, BaseType::CharacterVarying);
        assert_eq!(table.columns[1].max_length, Some(50));
        assert_eq!(table.columns[1].numeric_precision, None);
        assert_eq!(
            table.render_column_definitions(),
            "id integer\n,name varchar(50)\n,amount numeric(12,2)\n,payload text"
        );
    }

    #[test]
    fn test_unsupported_types_are_dropped() {
        let text = format!(
            "{HEADER}\nid,integer,32,0,\nstatus,USER-DEFINED,,,\nxmin_copy,xid,,,\nnote,text,,,"
        );
        let table = parse_catalog_csv(&text).unwrap().into_table().unwrap();
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "note"]);
    }

    #[test]
    fn test_empty_output_is_absent() {
        assert_eq!(parse_catalog_csv("").unwrap(), TableLookup::Absent);
        assert_eq!(parse_catalog_csv(HEADER).unwrap(), TableLookup::Absent);
    }

    #[test]
    fn test_only_unsupported_columns_is_absent() {
        let text = format!("{HEADER}\nstatus,USER-DEFINED,,,");
        assert!(parse_catalog_csv(&text).unwrap().is_absent());
    }

    #[test]
    fn test_quoted_column_names() {
        let text = format!("{HEADER}\n\"Weird, Name\",text,,,");
        let table = parse_catalog_csv(&text).unwrap().into_table().unwrap();
        assert_eq!(table.columns[0].name, "Weird, Name");
        assert_eq!(table.render_column_list(), "\"Weird, Name\"");
    }

    #[test]
    fn test_invalid_numeric_field() {
        let text = format!("{HEADER}\namount,numeric,twelve,,");
        match parse_catalog_csv(&text) {
            Err(Error::InvalidCatalogValue { column, field, value }) => {
                assert_eq!(column, "amount");
                assert_eq!(field, "numeric_precision");
                assert_eq!(value, "twelve");
            }
            other => panic!("expected InvalidCatalogValue, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_query_escapes_literals() {
        let sql = catalog_query_sql("public", "o'brien");
        assert!(sql.contains("table_schema='public'"));
        assert!(sql.contains("table_name='o''brien'"));
        assert!(sql.contains("column_name != 'recxmin'"));
        assert!(sql.ends_with("to stdout with csv header"));
    }

    #[test]
    fn test_require() {
        let err = TableLookup::Absent.require("public", "missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "table public.missing does not exist or is not accessible"
        );
        let table = Table::new(vec![Column::new("id", "integer")]);
        assert_eq!(
            TableLookup::Found(table.clone()).require("public", "t").unwrap(),
            table
        );
    }
}
