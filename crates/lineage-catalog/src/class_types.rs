//! Known relational class types and keyword-based selection for searches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassType {
    Column,
    ViewColumn,
    Table,
    View,
    DatabaseSchema,
    DatabaseServer,
    PrimaryKey,
    ForeignKey,
    Index,
}

impl ClassType {
    pub const ALL: [ClassType; 9] = [
        ClassType::Column,
        ClassType::ViewColumn,
        ClassType::Table,
        ClassType::View,
        ClassType::DatabaseSchema,
        ClassType::DatabaseServer,
        ClassType::PrimaryKey,
        ClassType::ForeignKey,
        ClassType::Index,
    ];

    /// Catalog identifier, e.g. `com.infa.ldm.relational.Table`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassType::Column => "com.infa.ldm.relational.Column",
            ClassType::ViewColumn => "com.infa.ldm.relational.ViewColumn",
            ClassType::Table => "com.infa.ldm.relational.Table",
            ClassType::View => "com.infa.ldm.relational.View",
            ClassType::DatabaseSchema => "com.infa.ldm.relational.DatabaseSchema",
            ClassType::DatabaseServer => "com.infa.ldm.relational.DatabaseServer",
            ClassType::PrimaryKey => "com.infa.ldm.relational.PrimaryKey",
            ClassType::ForeignKey => "com.infa.ldm.relational.ForeignKey",
            ClassType::Index => "com.infa.ldm.relational.Index",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ClassType::Column => "Table columns",
            ClassType::ViewColumn => "View columns",
            ClassType::Table => "Database tables",
            ClassType::View => "Database views",
            ClassType::DatabaseSchema => "Database schemas",
            ClassType::DatabaseServer => "Databases",
            ClassType::PrimaryKey => "Primary keys",
            ClassType::ForeignKey => "Foreign keys",
            ClassType::Index => "Indexes",
        }
    }

    /// Description for a raw class type string; unknown strings come back as-is.
    pub fn describe(class_type: &str) -> &str {
        class_type
            .parse::<ClassType>()
            .map(|ct| ct.description())
            .unwrap_or(class_type)
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClassType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| format!("Unknown class type: {}", s))
    }
}

use ClassType::*;

/// Keyword → class types. English and Italian phrasings.
const KEYWORDS: &[(&str, &[ClassType])] = &[
    ("column", &[Column]),
    ("columns", &[Column]),
    ("colonna", &[Column]),
    ("colonne", &[Column]),
    ("field", &[Column]),
    ("fields", &[Column]),
    ("campo", &[Column]),
    ("campi", &[Column]),
    ("view column", &[ViewColumn]),
    ("view columns", &[ViewColumn]),
    ("colonna vista", &[ViewColumn]),
    ("colonne vista", &[ViewColumn]),
    ("all columns", &[Column, ViewColumn]),
    ("tutte le colonne", &[Column, ViewColumn]),
    ("table", &[Table]),
    ("tables", &[Table]),
    ("tabella", &[Table]),
    ("tabelle", &[Table]),
    ("view", &[View]),
    ("views", &[View]),
    ("vista", &[View]),
    ("viste", &[View]),
    ("table and view", &[Table, View]),
    ("tables and views", &[Table, View]),
    ("tabelle e viste", &[Table, View]),
    ("all tables", &[Table, View]),
    ("tutte le tabelle", &[Table, View]),
    ("schema", &[DatabaseSchema]),
    ("schemas", &[DatabaseSchema]),
    ("schemi", &[DatabaseSchema]),
    ("database", &[DatabaseServer]),
    ("databases", &[DatabaseServer]),
    ("db", &[DatabaseServer]),
    ("primary key", &[PrimaryKey]),
    ("primary keys", &[PrimaryKey]),
    ("foreign key", &[ForeignKey]),
    ("foreign keys", &[ForeignKey]),
    ("chiave primaria", &[PrimaryKey]),
    ("chiavi primarie", &[PrimaryKey]),
    ("index", &[Index]),
    ("indexes", &[Index]),
    ("indice", &[Index]),
    ("indici", &[Index]),
];

pub struct ClassTypeSelector;

impl ClassTypeSelector {
    /// Class types mentioned by a free-text request, in declaration order.
    ///
    /// Keywords match as case-insensitive substrings. With no match the
    /// result is `[Column]` when `default_to_columns` is set, else empty.
    pub fn infer(query: &str, default_to_columns: bool) -> Vec<ClassType> {
        let query = query.to_lowercase();
        let mut matched: Vec<ClassType> = KEYWORDS
            .iter()
            .filter(|(keyword, _)| query.contains(keyword))
            .flat_map(|(_, types)| types.iter().copied())
            .collect();

        matched.sort();
        matched.dedup();

        if matched.is_empty() && default_to_columns {
            matched.push(Column);
        }
        matched
    }

    /// Named category. Unknown names resolve to columns.
    pub fn by_category(category: &str) -> Vec<ClassType> {
        match category.to_lowercase().as_str() {
            "all_columns" => vec![Column, ViewColumn],
            "view_columns" => vec![ViewColumn],
            "tables" => vec![Table],
            "views" => vec![View],
            "tables_and_views" => vec![Table, View],
            "schemas" => vec![DatabaseSchema],
            "databases" => vec![DatabaseServer],
            "all" => vec![Column, ViewColumn, Table, View],
            _ => vec![Column],
        }
    }

    pub fn available() -> &'static [ClassType] {
        &ClassType::ALL
    }
}
