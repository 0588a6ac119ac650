//! Catalog columns and their canonical SQL types.

use std::fmt;

/// Base type of a column, as reported by `information_schema.columns.data_type`.
///
/// Only the types that need special rendering get their own variant. Anything
/// else is carried verbatim in [`BaseType::Other`] and rendered unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// `numeric`
    Numeric,
    /// `character varying`
    CharacterVarying,
    /// `character`
    Character,
    /// `json`
    Json,
    /// `text`
    Text,
    /// Any other catalog type, e.g. `integer` or `timestamp with time zone`.
    Other(String),
}

impl BaseType {
    /// The catalog spelling of this type.
    pub fn as_str(&self) -> &str {
        match self {
            BaseType::Numeric => "numeric",
            BaseType::CharacterVarying => "character varying",
            BaseType::Character => "character",
            BaseType::Json => "json",
            BaseType::Text => "text",
            BaseType::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for BaseType {
    fn from(name: &str) -> Self {
        match name {
            "numeric" => BaseType::Numeric,
            "character varying" => BaseType::CharacterVarying,
            "character" => BaseType::Character,
            "json" => BaseType::Json,
            "text" => BaseType::Text,
            other => BaseType::Other(other.to_string()),
        }
    }
}

impl From<String> for BaseType {
    fn from(name: String) -> Self {
        BaseType::from(name.as_str())
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a table, built from a single catalog row.
///
/// Precision, scale and length are `None` when the catalog reports NULL,
/// which is distinct from `Some(0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub base_type: BaseType,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
    pub max_length: Option<u32>,
}

impl Column {
    pub fn new(name: impl Into<String>, base_type: impl Into<BaseType>) -> Self {
        Self {
            name: name.into(),
            base_type: base_type.into(),
            numeric_precision: None,
            numeric_scale: None,
            max_length: None,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.numeric_precision = Some(precision);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.numeric_scale = Some(scale);
        self
    }

    pub fn with_max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    /// The normalized SQL type used for comparison and `CREATE TABLE`.
    ///
    /// - `numeric` keeps `(P,S)` when both are non-zero, `(P)` when only a
    ///   precision is known, and is bare otherwise.
    /// - `character varying` becomes `varchar(L)` or `varchar`.
    /// - `character` becomes `character(L)` or `character`.
    /// - `json` becomes `text`.
    /// - Everything else passes through.
    pub fn canonical_type(&self) -> String {
        match &self.base_type {
            BaseType::Numeric => match (self.numeric_precision, self.numeric_scale) {
                (Some(p), Some(s)) if p != 0 && s != 0 => format!("numeric({},{})", p, s),
                (Some(p), _) => format!("numeric({})", p),
                _ => "numeric".to_string(),
            },
            BaseType::CharacterVarying => match self.max_length {
                Some(len) => format!("varchar({})", len),
                None => "varchar".to_string(),
            },
            BaseType::Character => match self.max_length {
                Some(len) => format!("character({})", len),
                None => "character".to_string(),
            },
            BaseType::Json => "text".to_string(),
            BaseType::Text => "text".to_string(),
            BaseType::Other(name) => name.clone(),
        }
    }

    /// True if both columns have the same name and canonical type.
    pub fn matches(&self, other: &Column) -> bool {
        self.name == other.name && self.canonical_type() == other.canonical_type()
    }
}
