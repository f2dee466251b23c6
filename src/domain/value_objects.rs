/// The only column currently accepted as a key discriminator.
pub const KEY_DISCRIMINATOR: &str = "MANUPARTNUM";

/// Newtype for table names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(pub String);

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Newtype for column names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ColumnName(pub String);

impl std::fmt::Display for ColumnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies a candidate record: the discriminating column and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub column: ColumnName,
    pub value: String,
}

impl Key {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: ColumnName(column.into()),
            value: value.into(),
        }
    }

    /// Shorthand for a key on [`KEY_DISCRIMINATOR`].
    pub fn part_number(value: impl Into<String>) -> Self {
        Self::new(KEY_DISCRIMINATOR, value)
    }

    pub fn is_supported(&self) -> bool {
        self.column.0 == KEY_DISCRIMINATOR
    }
}

/// Desired value for one column of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTarget {
    pub column: ColumnName,
    pub value: String,
}

impl FieldTarget {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: ColumnName(column.into()),
            value: value.into(),
        }
    }
}
