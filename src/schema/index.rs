//! Index descriptors.
//!
//! An index is described by an ordered field specification plus options.
//! Descriptors are pure data: they say what must exist, never how a
//! store builds it.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use crate::{Error, Result};

/// Longest accepted explicit index name, in bytes.
pub const MAX_INDEX_NAME_BYTES: usize = 127;

// ============================================================================
// Field roles
// ============================================================================

/// Role a field plays inside an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Ordered index over this field, ascending.
    Ascending,
    /// Ordered index over this field, descending.
    Descending,
    /// Tokenized full-text search over string content.
    FullText,
}

impl FieldRole {
    /// Segment used when deriving a default index name. Follows the
    /// MongoDB convention: `{"text": "text"}` names itself `text_text`,
    /// `{"created_at": -1}` names itself `created_at_-1`.
    fn name_segment(&self) -> &'static str {
        match self {
            FieldRole::Ascending => "1",
            FieldRole::Descending => "-1",
            FieldRole::FullText => "text",
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldRole::Ascending => "ascending",
            FieldRole::Descending => "descending",
            FieldRole::FullText => "full_text",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Index kind
// ============================================================================

/// Structural family of an index, derived from its field roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// B-tree-style ordered index (ascending/descending fields).
    Ordered,
    /// Full-text search index.
    FullText,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Ordered => f.write_str("ordered"),
            IndexKind::FullText => f.write_str("full_text"),
        }
    }
}

// ============================================================================
// Field specification
// ============================================================================

/// Ordered mapping of field names to roles.
///
/// Order is significant: `{a: ascending, b: descending}` and
/// `{b: descending, a: ascending}` describe different indexes. In JSON
/// the spec is written as an object and document order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSpec {
    entries: SmallVec<[(String, FieldRole); 2]>,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: append a field.
    pub fn with(mut self, field: impl Into<String>, role: FieldRole) -> Self {
        self.push(field, role);
        self
    }

    /// Append a field.
    pub fn push(&mut self, field: impl Into<String>, role: FieldRole) {
        self.entries.push((field.into(), role));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldRole)> {
        self.entries.iter().map(|(f, r)| (f.as_str(), *r))
    }

    /// Derive the index kind from the field roles.
    ///
    /// A mixed spec (full-text next to ordered fields) reports the first
    /// field's family here; validation rejects the mix before anything
    /// acts on it.
    pub fn kind(&self) -> IndexKind {
        match self.entries.first() {
            Some((_, FieldRole::FullText)) => IndexKind::FullText,
            _ => IndexKind::Ordered,
        }
    }

    /// Default index name: field and role segments joined with
    /// underscores, MongoDB style.
    pub fn default_name(&self) -> String {
        let mut out = String::new();
        for (i, (field, role)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push('_');
            }
            out.push_str(field);
            out.push('_');
            out.push_str(role.name_segment());
        }
        out
    }
}

impl<F: Into<String>> FromIterator<(F, FieldRole)> for FieldSpec {
    fn from_iter<T: IntoIterator<Item = (F, FieldRole)>>(iter: T) -> Self {
        let mut spec = Self::new();
        for (field, role) in iter {
            spec.push(field, role);
        }
        spec
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, role)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}: {role}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for FieldSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, role) in &self.entries {
            map.serialize_entry(field, role)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldSpecVisitor;

        impl<'de> Visitor<'de> for FieldSpecVisitor {
            type Value = FieldSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to index roles")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<FieldSpec, A::Error> {
                // Entries arrive in document order, which is the order
                // the index fields take.
                let mut spec = FieldSpec::new();
                while let Some((field, role)) = access.next_entry::<String, FieldRole>()? {
                    spec.push(field, role);
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(FieldSpecVisitor)
    }
}

// ============================================================================
// Index options
// ============================================================================

/// Optional knobs on an index descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Explicit index name. Defaults to the derived name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reject writes that would duplicate the indexed value.
    pub unique: bool,
}

// ============================================================================
// Index spec
// ============================================================================

/// Complete description of one index on one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub fields: FieldSpec,
    #[serde(default)]
    pub options: IndexOptions,
}

impl IndexSpec {
    pub fn new(fields: FieldSpec) -> Self {
        Self { fields, options: IndexOptions::default() }
    }

    /// Single-field full-text index.
    pub fn fulltext(field: impl Into<String>) -> Self {
        Self::new(FieldSpec::new().with(field, FieldRole::FullText))
    }

    /// Single-field ascending index.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(FieldSpec::new().with(field, FieldRole::Ascending))
    }

    /// Single-field descending index.
    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(FieldSpec::new().with(field, FieldRole::Descending))
    }

    /// Builder-style: set an explicit name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Builder-style: mark unique.
    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    pub fn kind(&self) -> IndexKind {
        self.fields.kind()
    }

    /// Effective name: the explicit option, or the derived default.
    pub fn name(&self) -> String {
        match &self.options.name {
            Some(name) => name.clone(),
            None => self.fields.default_name(),
        }
    }

    /// Check the descriptor itself, independent of any store state.
    ///
    /// `collection` is only used for error context.
    pub fn validate(&self, collection: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidIndexSpec {
            collection: collection.to_string(),
            reason,
        };

        if self.fields.is_empty() {
            return Err(invalid("field specification is empty".into()));
        }

        let mut seen: SmallVec<[&str; 2]> = SmallVec::new();
        for (field, _) in self.fields.iter() {
            if field.is_empty() {
                return Err(invalid("field name is empty".into()));
            }
            if field.contains('\0') {
                return Err(invalid(format!("field name {field:?} contains NUL")));
            }
            if field.starts_with('$') {
                return Err(invalid(format!("field name {field:?} starts with '$'")));
            }
            if seen.contains(&field) {
                return Err(invalid(format!("field {field:?} appears more than once")));
            }
            seen.push(field);
        }

        let fulltext = self.fields.iter().filter(|(_, r)| *r == FieldRole::FullText).count();
        if fulltext > 0 && fulltext < self.fields.len() {
            return Err(invalid("full-text and ordered fields cannot share one index".into()));
        }

        if self.options.unique && self.kind() == IndexKind::FullText {
            return Err(invalid("a full-text index cannot be unique".into()));
        }

        if let Some(name) = &self.options.name {
            if name.is_empty() {
                return Err(invalid("index name is empty".into()));
            }
            if name.contains('\0') {
                return Err(invalid(format!("index name {name:?} contains NUL")));
            }
            if name.len() > MAX_INDEX_NAME_BYTES {
                return Err(invalid(format!("index name exceeds {MAX_INDEX_NAME_BYTES} bytes")));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
