//! Table shapes: positional comparison and column clause rendering.

use crate::column::{BaseType, Column};
use crate::ident::quote_ident;

/// Separator between entries of a rendered column clause.
const CLAUSE_SEPARATOR: &str = "\n,";

/// Maximum characters kept from a `json` column in a cast projection.
const JSON_TRUNCATE: usize = 20000;

/// Maximum characters kept from an unbounded text column in a cast projection.
const TEXT_TRUNCATE: usize = 5000;

/// An ordered list of columns, in catalog ordinal position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True if every column of `self` matches the column at the same
    /// position in `other`, by name and canonical type.
    ///
    /// Comparison is strictly positional: a permutation of the same columns
    /// is not a subset. If `other` is shorter than `self` this returns false.
    pub fn is_subset_of(&self, other: &Table) -> bool {
        if other.columns.len() < self.columns.len() {
            return false;
        }
        self.columns
            .iter()
            .zip(&other.columns)
            .all(|(a, b)| a.matches(b))
    }

    /// True if both tables have the same number of columns and `self` is a
    /// positional subset of `other`.
    pub fn is_equivalent_to(&self, other: &Table) -> bool {
        self.columns.len() == other.columns.len() && self.is_subset_of(other)
    }

    /// Position of the first column that differs between the two tables,
    /// counting a column missing on one side as a difference.
    pub fn first_difference(&self, other: &Table) -> Option<usize> {
        let shared = self.columns.len().min(other.columns.len());
        (0..shared)
            .find(|&i| !self.columns[i].matches(&other.columns[i]))
            .or_else(|| (self.columns.len() != other.columns.len()).then_some(shared))
    }

    /// Column names, quoted where needed, for `INSERT`/`COPY` column lists.
    pub fn render_column_list(&self) -> String {
        self.render_with(|col| quote_ident(&col.name))
    }

    /// Like [`Table::render_column_list`], but oversized payloads are cut down:
    ///
    /// - `json` columns are cast to text and truncated to 20000 characters
    /// - `text` and unbounded `varchar` columns are truncated to 5000 characters
    ///
    /// Every projection keeps the original column name as its alias.
    pub fn render_cast_column_list(&self) -> String {
        self.render_with(|col| {
            let name = quote_ident(&col.name);
            if col.base_type == BaseType::Json {
                format!(
                    "substring({}::text from 1 to {}) as {}",
                    name, JSON_TRUNCATE, name
                )
            } else if col.base_type == BaseType::Text || col.canonical_type() == "varchar" {
                format!(
                    "substring({} from 1 for {}) as {}",
                    name, TEXT_TRUNCATE, name
                )
            } else {
                name
            }
        })
    }

    /// `<name> <canonical type>` for every column, for `CREATE TABLE`.
    pub fn render_column_definitions(&self) -> String {
        self.render_with(|col| format!("{} {}", quote_ident(&col.name), col.canonical_type()))
    }

    fn render_with(&self, f: impl Fn(&Column) -> String) -> String {
        self.columns
            .iter()
            .map(f)
            .collect::<Vec<_>>()
            .join(CLAUSE_SEPARATOR)
    }
}

impl FromIterator<Column> for Table {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
