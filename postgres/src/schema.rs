use pg_escape::quote_identifier;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio_postgres::types::Type;

/// Errors that can occur while working with schema metadata.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A column name was referenced that does not exist in the table schema.
    #[error("column {0:?} does not exist in table schema")]
    UnknownColumn(String),
}

/// An object identifier in Postgres.
type Oid = u32;

/// A fully qualified Postgres table name consisting of a schema and table name.
///
/// This type represents a table identifier in Postgres, which requires both a schema name
/// and a table name. It provides methods for formatting the name in different contexts.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct TableName {
    /// The schema name containing the table
    pub schema: String,
    /// The name of the table within the schema
    pub name: String,
}

impl TableName {
    pub fn new(schema: String, name: String) -> TableName {
        Self { schema, name }
    }

    /// Returns the table name as a properly quoted Postgres identifier.
    ///
    /// This method ensures the schema and table names are properly escaped according to
    /// Postgres identifier quoting rules.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{0}.{1}", self.schema, self.name))
    }
}

/// A type-safe wrapper for Postgres table OIDs.
///
/// This newtype provides type safety by preventing accidental use of raw [`Oid`] values
/// where a table identifier is expected.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct TableId(pub Oid);

impl TableId {
    /// Creates a new [`TableId`] from an [`Oid`].
    pub fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// Returns the underlying [`Oid`] value.
    pub fn into_inner(self) -> Oid {
        self.0
    }
}

impl From<Oid> for TableId {
    fn from(oid: Oid) -> Self {
        Self(oid)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableId {
    type Err = <Oid as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Oid>().map(TableId::new)
    }
}

/// When the server assigns a value to a column.
///
/// Columns marked [`ValueGenerated::OnAdd`] (identities, defaults) are excluded from
/// staging unless the caller explicitly keeps identity values, and are read back after
/// inserts. Columns marked [`ValueGenerated::OnAddOrUpdate`] (computed columns, row
/// versions) are read back after both inserts and updates.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ValueGenerated {
    /// The column is always written by the client.
    Never,
    /// The server assigns the value when the row is inserted.
    OnAdd,
    /// The server assigns the value on every write to the row.
    OnAddOrUpdate,
}

/// Represents the schema of a single column in a Postgres table.
///
/// This type contains all metadata about a column including its name, data type,
/// nullability, primary key membership, and value generation behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    /// The name of the column.
    pub name: String,
    /// The Postgres data type of the column.
    pub typ: Type,
    /// Whether the column can contain NULL values.
    pub nullable: bool,
    /// Whether the column is part of the table's primary key.
    pub primary_key: bool,
    /// When the server assigns this column's value, if ever.
    pub generated: ValueGenerated,
}

impl ColumnSchema {
    /// Creates a new [`ColumnSchema`] with all fields specified.
    pub fn new(
        name: String,
        typ: Type,
        nullable: bool,
        primary_key: bool,
        generated: ValueGenerated,
    ) -> ColumnSchema {
        Self {
            name,
            typ,
            nullable,
            primary_key,
            generated,
        }
    }

    /// Returns whether the server ever assigns this column's value.
    pub fn is_generated(&self) -> bool {
        self.generated != ValueGenerated::Never
    }

    /// Returns whether this column is an identity-style column assigned on insert.
    pub fn is_identity(&self) -> bool {
        self.generated == ValueGenerated::OnAdd
    }
}

/// Represents the complete schema of a Postgres table.
///
/// This type contains all metadata about a table including its name, OID, and
/// the schemas of all its columns in ordinal order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// The Postgres OID of the table.
    pub id: TableId,
    /// The fully qualified name of the table.
    pub name: TableName,
    /// The schemas of all columns in the table.
    pub column_schemas: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Creates a new [`TableSchema`].
    pub fn new(id: TableId, name: TableName, column_schemas: Vec<ColumnSchema>) -> Self {
        Self {
            id,
            name,
            column_schemas,
        }
    }

    /// Returns the names of all columns in ordinal order.
    pub fn column_names(&self) -> Vec<&str> {
        self.column_schemas
            .iter()
            .map(|cs| cs.name.as_str())
            .collect()
    }

    /// Returns the names of the primary key columns in ordinal order.
    pub fn primary_key_column_names(&self) -> Vec<&str> {
        self.column_schemas
            .iter()
            .filter(|cs| cs.primary_key)
            .map(|cs| cs.name.as_str())
            .collect()
    }

    /// Returns the columns whose values the server assigns, in ordinal order.
    ///
    /// Covers both insert-only identities/defaults and always-recomputed columns,
    /// which is exactly the set that must be read back after a merge.
    pub fn generated_columns(&self) -> Vec<&ColumnSchema> {
        self.column_schemas
            .iter()
            .filter(|cs| cs.is_generated())
            .collect()
    }

    /// Looks up a column schema by name.
    pub fn column_schema(&self, name: &str) -> Result<&ColumnSchema, SchemaError> {
        self.column_schemas
            .iter()
            .find(|cs| cs.name == name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }

    /// Returns whether the table has any primary key columns.
    pub fn has_primary_keys(&self) -> bool {
        self.column_schemas.iter().any(|cs| cs.primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> TableSchema {
        TableSchema::new(
            TableId::new(16384),
            TableName::new("public".to_string(), "users".to_string()),
            vec![
                ColumnSchema::new(
                    "id".to_string(),
                    Type::INT8,
                    false,
                    true,
                    ValueGenerated::OnAdd,
                ),
                ColumnSchema::new(
                    "email".to_string(),
                    Type::TEXT,
                    false,
                    false,
                    ValueGenerated::Never,
                ),
                ColumnSchema::new(
                    "updated_at".to_string(),
                    Type::TIMESTAMPTZ,
                    false,
                    false,
                    ValueGenerated::OnAddOrUpdate,
                ),
            ],
        )
    }

    #[test]
    fn test_table_name_quoted_identifier() {
        let name = TableName::new("public".to_string(), "users".to_string());
        assert_eq!(name.as_quoted_identifier(), "public.users");

        let odd = TableName::new("public".to_string(), "User Data".to_string());
        assert_eq!(odd.as_quoted_identifier(), "public.\"User Data\"");
    }

    #[test]
    fn test_primary_key_column_names() {
        let schema = users_schema();
        assert_eq!(schema.primary_key_column_names(), vec!["id"]);
        assert!(schema.has_primary_keys());
    }

    #[test]
    fn test_generated_columns_cover_identity_and_computed() {
        let schema = users_schema();
        let generated: Vec<_> = schema
            .generated_columns()
            .iter()
            .map(|cs| cs.name.as_str())
            .collect();
        assert_eq!(generated, vec!["id", "updated_at"]);
    }

    #[test]
    fn test_column_schema_lookup() {
        let schema = users_schema();
        assert!(schema.column_schema("email").is_ok());
        assert!(matches!(
            schema.column_schema("missing"),
            Err(SchemaError::UnknownColumn(_))
        ));
    }
}
