use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Binary subtype tag, following the common document-database convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinarySubtype {
    /// Opaque bytes (0x00).
    Generic,
    /// A 16-byte UUID (0x04).
    Uuid,
}

impl BinarySubtype {
    pub fn code(&self) -> u8 {
        match self {
            Self::Generic => 0x00,
            Self::Uuid => 0x04,
        }
    }
}

/// Tagged binary field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl Binary {
    /// UUID-subtype binary.
    pub fn uuid(bytes: &[u8; 16]) -> Self {
        Self {
            subtype: BinarySubtype::Uuid,
            bytes: bytes.to_vec(),
        }
    }

    /// Generic-subtype binary.
    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype: BinarySubtype::Generic,
            bytes: bytes.into(),
        }
    }
}

/// A single stored field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    String(String),
    Binary(Binary),
    /// Structured content kept as a JSON tree.
    Json(serde_json::Value),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int64(_) => "int64",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::Json(_) => "json",
        }
    }

    /// Ordering used by sorted lookups. Only like-typed scalars compare;
    /// everything else is treated as equal.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Binary> for Value {
    fn from(v: Binary) -> Self {
        Self::Binary(v)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A stored document: field name → value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Set `field`, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if every clause of `filter` holds for this document.
    pub fn matches(&self, filter: &Filter) -> bool {
        filter
            .clauses()
            .iter()
            .all(|(field, expected)| self.get(field) == Some(expected))
    }
}

// ---------------------------------------------------------------------------
// Queries and indexes
// ---------------------------------------------------------------------------

/// Conjunction of field-equality clauses. An empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause on `field`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.clauses.iter().map(|(k, _)| k.as_str()).collect();
        write!(f, "{{{}}}", fields.join(", "))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Single-field sort for `find_one`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    /// Highest value first.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Lowest value first.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }
}

/// Description of a (compound) index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    /// A unique index named `name` over `keys`, ascending.
    pub fn unique(name: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            name: name.into(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            unique: true,
        }
    }

    /// The values this index keys `document` by. Missing fields key as `Null`.
    pub fn key_of(&self, document: &Document) -> Vec<Value> {
        self.keys
            .iter()
            .map(|k| document.get(k).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u8, rev: i64) -> Document {
        Document::new()
            .with("identifier", Binary::uuid(&[id; 16]))
            .with("content-revision", rev)
    }

    #[test]
    fn filter_matches_all_clauses() {
        let d = doc(1, 10);
        let hit = Filter::new()
            .eq("identifier", Binary::uuid(&[1; 16]))
            .eq("content-revision", 10i64);
        let miss = Filter::new()
            .eq("identifier", Binary::uuid(&[1; 16]))
            .eq("content-revision", 11i64);
        assert!(d.matches(&hit));
        assert!(!d.matches(&miss));
        assert!(d.matches(&Filter::new()));
    }

    #[test]
    fn filter_on_missing_field_never_matches() {
        let d = Document::new().with("a", 1i64);
        assert!(!d.matches(&Filter::new().eq("b", 1i64)));
    }

    #[test]
    fn sort_cmp_orders_integers() {
        assert_eq!(Value::Int64(1).sort_cmp(&Value::Int64(2)), Ordering::Less);
        assert_eq!(Value::Null.sort_cmp(&Value::Int64(0)), Ordering::Less);
        assert_eq!(Value::Int64(3).sort_cmp(&Value::from("x")), Ordering::Equal);
    }

    #[test]
    fn index_key_uses_null_for_missing_fields() {
        let idx = IndexSpec::unique("i", &["identifier", "content-revision"]);
        let key = idx.key_of(&Document::new().with("content-revision", 5i64));
        assert_eq!(key, vec![Value::Null, Value::Int64(5)]);
    }

    #[test]
    fn binary_subtype_codes() {
        assert_eq!(BinarySubtype::Uuid.code(), 0x04);
        assert_eq!(Binary::generic(vec![1u8]).subtype.code(), 0x00);
    }

    #[test]
    fn filter_display_lists_fields() {
        let f = Filter::new().eq("a", 1i64).eq("b", "x");
        assert_eq!(f.to_string(), "{a, b}");
    }
}
