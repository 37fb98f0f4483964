//! Query description handed to a `DocumentStore`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Document ==
/// A stored document: its id plus a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Position marker for cursor queries relative to this document.
    pub fn marker(&self) -> DocumentMarker {
        DocumentMarker(self.id.clone())
    }

    /// Looks up a field by dotted path; `id` resolves to the document id.
    pub fn field(&self, path: &str) -> Option<Value> {
        if path == "id" {
            return Some(Value::String(self.id.clone()));
        }
        path.split('.')
            .try_fold(&self.data, |value, segment| value.get(segment))
            .cloned()
    }
}

/// Opaque position of a document inside an ordered result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentMarker(pub String);

// == Filters ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Field equals one of the values in an array
    In,
    /// Array field contains the value
    ArrayContains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

// == Cursor ==
/// Where a page starts relative to a known document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cursor {
    /// Documents strictly after the marker
    StartAfter(DocumentMarker),
    /// Documents strictly before the marker; with a limit, the last `limit` of them
    EndBefore(DocumentMarker),
}

impl Cursor {
    /// Short stable form used inside cache keys.
    pub fn key(&self) -> String {
        match self {
            Cursor::StartAfter(marker) => format!("after:{}", marker.0),
            Cursor::EndBefore(marker) => format!("before:{}", marker.0),
        }
    }
}

// == Query ==
/// Collection query: filters, ordering, limit and an optional cursor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub collection: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, marker: DocumentMarker) -> Self {
        self.cursor = Some(Cursor::StartAfter(marker));
        self
    }

    pub fn end_before(mut self, marker: DocumentMarker) -> Self {
        self.cursor = Some(Cursor::EndBefore(marker));
        self
    }

    /// Canonical JSON form, equal for equal queries.
    pub fn fingerprint(&self) -> String {
        // A struct of strings, enums and JSON values always serializes
        serde_json::to_string(self).unwrap_or_else(|_| self.collection.clone())
    }

    /// Hex digest of the fingerprint, collection included. Only hex digits,
    /// so it can be embedded in wildcard patterns.
    pub fn digest(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.fingerprint().hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}
