//! # Entity Schema Metadata
//!
//! Declarative description of every persisted entity type: which physical database it lives
//! in, its table, its columns and their payload rules, its primary key, and its read-only
//! computed columns. The storage router builds every SQL statement from these descriptors,
//! and the validation layer derives each entity's payload schema from the same columns.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::record::Record;

/// One of the two long-lived databases the backend talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhysicalDatabase {
    Account,
    Commerce,
}

impl PhysicalDatabase {
    pub const ALL: [PhysicalDatabase; 2] = [PhysicalDatabase::Account, PhysicalDatabase::Commerce];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhysicalDatabase::Account => "account",
            PhysicalDatabase::Commerce => "commerce",
        }
    }
}

impl fmt::Display for PhysicalDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhysicalDatabase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "account" => Ok(PhysicalDatabase::Account),
            "commerce" => Ok(PhysicalDatabase::Commerce),
            other => Err(format!("unknown database `{}`", other)),
        }
    }
}

/// Storage and payload type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    /// Variable-length text; `Some(n)` caps the length at `n` characters
    Text(Option<usize>),
    Char,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM:SS`
    Time,
    Timestamp,
    Enumeration(&'static [&'static str]),
}

impl ColumnKind {
    fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Boolean => "BOOLEAN",
            _ => "TEXT",
        }
    }
}

/// How a column is treated in inbound payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Optional,
    /// Filled by the store; rejected in payloads and ignored by record equality
    ServerManaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub rule: FieldRule,
    pub nullable: bool,
    pub unique: bool,
    /// SQL literal used as the column default
    pub default: Option<&'static str>,
    pub references: Option<ForeignKey>,
}

impl Column {
    /// A required, non-null column with no default
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            rule: FieldRule::Required,
            nullable: false,
            unique: false,
            default: None,
            references: None,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.rule = FieldRule::Optional;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn default_sql(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }

    /// `datetime`-style creation timestamp filled by the store
    pub const fn created_at(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Timestamp,
            rule: FieldRule::ServerManaged,
            nullable: false,
            unique: false,
            default: Some("CURRENT_TIMESTAMP"),
            references: None,
        }
    }

    pub fn is_server_managed(&self) -> bool {
        self.rule == FieldRule::ServerManaged
    }
}

/// Read-only column derived from stored values on every read
#[derive(Clone, Copy)]
pub struct ComputedColumn {
    pub name: &'static str,
    pub compute: fn(&Record) -> Option<Value>,
}

impl fmt::Debug for ComputedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedColumn").field("name", &self.name).finish()
    }
}

/// Static description of one persisted entity type
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Key used in routes, e.g. `"supply_detail"`
    pub identifier: &'static str,
    /// Type name used in record keys, e.g. `"SupplyDetail"`
    pub type_name: &'static str,
    pub database: PhysicalDatabase,
    pub table_name: &'static str,
    pub columns: &'static [Column],
    /// Primary-key columns in declaration order
    pub primary_key: &'static [&'static str],
    /// Single-column integer key generated by the store when omitted
    pub auto_increment: bool,
    pub computed: &'static [ComputedColumn],
}

impl EntityDescriptor {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_composite_key(&self) -> bool {
        self.primary_key.len() > 1
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.contains(&name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this entity
    pub fn create_table_sql(&self) -> String {
        let single_rowid_key = self.auto_increment && self.primary_key.len() == 1;
        let mut lines: Vec<String> = Vec::with_capacity(self.columns.len() + 2);

        for column in self.columns {
            let mut line = format!("\"{}\" {}", column.name, column.kind.sql_type());
            if single_rowid_key && self.primary_key[0] == column.name {
                line.push_str(" PRIMARY KEY");
            } else {
                if !column.nullable {
                    line.push_str(" NOT NULL");
                }
                if column.unique {
                    line.push_str(" UNIQUE");
                }
                if let Some(default) = column.default {
                    line.push_str(&format!(" DEFAULT {}", default));
                }
                if let ColumnKind::Enumeration(variants) = column.kind {
                    let allowed: Vec<String> = variants.iter().map(|v| format!("'{}'", v)).collect();
                    line.push_str(&format!(" CHECK (\"{}\" IN ({}))", column.name, allowed.join(", ")));
                }
            }
            if let Some(fk) = column.references {
                line.push_str(&format!(" REFERENCES \"{}\" (\"{}\")", fk.table, fk.column));
            }
            lines.push(line);
        }

        if !single_rowid_key {
            let key: Vec<String> = self.primary_key.iter().map(|k| format!("\"{}\"", k)).collect();
            lines.push(format!("PRIMARY KEY ({})", key.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
            self.table_name,
            lines.join(",\n    ")
        )
    }
}

impl PartialEq for EntityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.database == other.database
    }
}

impl Eq for EntityDescriptor {}

#[cfg(test)]
mod tests {
    use super::*;

    static WIDGET_COLUMNS: [Column; 3] = [
        Column::new("id", ColumnKind::Integer).optional(),
        Column::new("name", ColumnKind::Text(Some(50))).unique(),
        Column::created_at("datetime"),
    ];

    static WIDGET: EntityDescriptor = EntityDescriptor {
        identifier: "widget",
        type_name: "Widget",
        database: PhysicalDatabase::Commerce,
        table_name: "widget",
        columns: &WIDGET_COLUMNS,
        primary_key: &["id"],
        auto_increment: true,
        computed: &[],
    };

    static PAIR_COLUMNS: [Column; 3] = [
        Column::new("left_id", ColumnKind::Integer).references("widget", "id"),
        Column::new("right_id", ColumnKind::Integer),
        Column::new("kind", ColumnKind::Enumeration(&["A", "B"])).optional().default_sql("'A'"),
    ];

    static PAIR: EntityDescriptor = EntityDescriptor {
        identifier: "pair",
        type_name: "Pair",
        database: PhysicalDatabase::Commerce,
        table_name: "pair",
        columns: &PAIR_COLUMNS,
        primary_key: &["left_id", "right_id"],
        auto_increment: false,
        computed: &[],
    };

    #[test]
    fn test_database_parses_case_insensitively() {
        assert_eq!("Account".parse::<PhysicalDatabase>(), Ok(PhysicalDatabase::Account));
        assert_eq!(" commerce ".parse::<PhysicalDatabase>(), Ok(PhysicalDatabase::Commerce));
        assert!("ledger".parse::<PhysicalDatabase>().is_err());
    }

    #[test]
    fn test_single_key_table_uses_rowid_alias() {
        let sql = WIDGET.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"widget\""));
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY"));
        assert!(sql.contains("\"name\" TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("\"datetime\" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP"));
        assert!(!sql.contains("PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn test_composite_key_table_declares_constraint() {
        let sql = PAIR.create_table_sql();
        assert!(sql.contains("PRIMARY KEY (\"left_id\", \"right_id\")"));
        assert!(sql.contains("REFERENCES \"widget\" (\"id\")"));
        assert!(sql.contains("CHECK (\"kind\" IN ('A', 'B'))"));
        assert!(PAIR.is_composite_key());
        assert!(!WIDGET.is_composite_key());
    }

    #[test]
    fn test_column_lookup() {
        assert!(WIDGET.column("name").is_some());
        assert!(WIDGET.column("missing").is_none());
        assert!(WIDGET.column("datetime").unwrap().is_server_managed());
    }
}
