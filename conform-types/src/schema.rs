use serde::{Deserialize, Serialize};

/// Type of a schema field.
///
/// Arrays of structs are traversed transparently when resolving dotted
/// paths, so `items.sku` addresses the `sku` field of every element of
/// `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataType {
    Primitive { name: String },
    Struct { fields: Vec<SchemaField> },
    Array { element: Box<DataType> },
}

impl DataType {
    pub fn primitive(name: impl Into<String>) -> Self {
        DataType::Primitive { name: name.into() }
    }

    pub fn string() -> Self {
        Self::primitive("string")
    }

    pub fn boolean() -> Self {
        Self::primitive("boolean")
    }

    pub fn empty_struct() -> Self {
        DataType::Struct { fields: vec![] }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct { .. })
    }

    /// Short human label, e.g. `string`, `struct`, `array<decimal(38,18)>`.
    pub fn label(&self) -> String {
        match self {
            DataType::Primitive { name } => name.clone(),
            DataType::Struct { .. } => "struct".to_string(),
            DataType::Array { element } => format!("array<{}>", element.label()),
        }
    }

    /// Nested fields, looking through arrays.
    pub fn children(&self) -> Option<&[SchemaField]> {
        match self {
            DataType::Primitive { .. } => None,
            DataType::Struct { fields } => Some(fields),
            DataType::Array { element } => element.children(),
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<SchemaField>> {
        match self {
            DataType::Primitive { .. } => None,
            DataType::Struct { fields } => Some(fields),
            DataType::Array { element } => element.children_mut(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub data_type: DataType,

    #[serde(default = "default_nullable")]
    pub nullable: bool,

    /// Order of the conformance rule that introduced this field, if derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduced_by: Option<u32>,
}

fn default_nullable() -> bool {
    true
}

impl SchemaField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            introduced_by: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Field tree of one schema version.
///
/// Fetched trees are treated as immutable; projections always work on a
/// clone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFieldTree {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

impl SchemaFieldTree {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self {
            name: None,
            version: None,
            fields,
        }
    }

    pub fn named(name: impl Into<String>, version: u32, fields: Vec<SchemaField>) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version),
            fields,
        }
    }

    /// Resolve a dotted path.
    pub fn find(&self, path: &str) -> Option<&SchemaField> {
        let segments = split_path(path)?;
        find_in(&self.fields, &segments)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// All dotted paths, depth first, in field order.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_paths(&self.fields, "", &mut out);
        out
    }

    /// Every field (at any depth) whose `introduced_by` is set, as
    /// `(path, order)` pairs.
    pub fn derived_paths(&self) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        collect_derived(&self.fields, "", &mut out);
        out
    }

    /// Add or replace the field at `path`.
    ///
    /// Missing parents are created as structs. Returns `false` (tree
    /// untouched) when the path is malformed or a parent is not a struct.
    pub fn upsert(&mut self, path: &str, data_type: DataType, introduced_by: Option<u32>) -> bool {
        let Some(segments) = split_path(path) else {
            return false;
        };
        if !parents_accept_children(&self.fields, &segments) {
            return false;
        }
        upsert_in(&mut self.fields, &segments, data_type, introduced_by);
        true
    }

    /// Remove the field at `path`, returning it if it existed.
    pub fn remove(&mut self, path: &str) -> Option<SchemaField> {
        let segments = split_path(path)?;
        remove_in(&mut self.fields, &segments)
    }
}

fn split_path(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return None;
    }
    Some(segments)
}

fn find_in<'a>(fields: &'a [SchemaField], segments: &[&str]) -> Option<&'a SchemaField> {
    let (head, rest) = segments.split_first()?;
    let field = fields.iter().find(|f| f.name == *head)?;
    if rest.is_empty() {
        return Some(field);
    }
    find_in(field.data_type.children()?, rest)
}

fn parents_accept_children(fields: &[SchemaField], segments: &[&str]) -> bool {
    match segments {
        [] | [_] => true,
        [head, rest @ ..] => match fields.iter().find(|f| f.name == *head) {
            None => true,
            Some(field) => match field.data_type.children() {
                Some(children) => parents_accept_children(children, rest),
                None => false,
            },
        },
    }
}

fn upsert_in(
    fields: &mut Vec<SchemaField>,
    segments: &[&str],
    data_type: DataType,
    introduced_by: Option<u32>,
) {
    match segments {
        [] => {}
        [leaf] => {
            if let Some(existing) = fields.iter_mut().find(|f| f.name == *leaf) {
                existing.data_type = data_type;
                existing.introduced_by = introduced_by;
            } else {
                fields.push(SchemaField {
                    name: leaf.to_string(),
                    data_type,
                    nullable: true,
                    introduced_by,
                });
            }
        }
        [head, rest @ ..] => {
            let idx = match fields.iter().position(|f| f.name == *head) {
                Some(idx) => idx,
                None => {
                    fields.push(SchemaField {
                        name: head.to_string(),
                        data_type: DataType::empty_struct(),
                        nullable: true,
                        introduced_by,
                    });
                    fields.len() - 1
                }
            };
            if let Some(children) = fields[idx].data_type.children_mut() {
                upsert_in(children, rest, data_type, introduced_by);
            }
        }
    }
}

fn remove_in(fields: &mut Vec<SchemaField>, segments: &[&str]) -> Option<SchemaField> {
    match segments {
        [] => None,
        [leaf] => {
            let idx = fields.iter().position(|f| f.name == *leaf)?;
            Some(fields.remove(idx))
        }
        [head, rest @ ..] => {
            let field = fields.iter_mut().find(|f| f.name == *head)?;
            remove_in(field.data_type.children_mut()?, rest)
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn collect_paths(fields: &[SchemaField], prefix: &str, out: &mut Vec<String>) {
    for field in fields {
        let path = join(prefix, &field.name);
        out.push(path.clone());
        if let Some(children) = field.data_type.children() {
            collect_paths(children, &path, out);
        }
    }
}

fn collect_derived(fields: &[SchemaField], prefix: &str, out: &mut Vec<(String, u32)>) {
    for field in fields {
        let path = join(prefix, &field.name);
        if let Some(order) = field.introduced_by {
            out.push((path.clone(), order));
        }
        if let Some(children) = field.data_type.children() {
            collect_derived(children, &path, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaFieldTree {
        SchemaFieldTree::new(vec![
            SchemaField::new("id", DataType::primitive("long")).required(),
            SchemaField::new(
                "customer",
                DataType::Struct {
                    fields: vec![
                        SchemaField::new("name", DataType::string()),
                        SchemaField::new("country", DataType::string()),
                    ],
                },
            ),
            SchemaField::new(
                "items",
                DataType::Array {
                    element: Box::new(DataType::Struct {
                        fields: vec![SchemaField::new("sku", DataType::string())],
                    }),
                },
            ),
        ])
    }

    #[test]
    fn find_resolves_nested_and_array_paths() {
        let tree = sample();
        assert!(tree.contains("id"));
        assert!(tree.contains("customer.country"));
        assert!(tree.contains("items.sku"));
        assert!(!tree.contains("customer.missing"));
        assert!(!tree.contains("id.nested"));
        assert!(!tree.contains("customer..name"));
    }

    #[test]
    fn paths_are_depth_first() {
        assert_eq!(
            sample().paths(),
            vec![
                "id",
                "customer",
                "customer.name",
                "customer.country",
                "items",
                "items.sku"
            ]
        );
    }

    #[test]
    fn upsert_creates_missing_parents() {
        let mut tree = sample();
        assert!(tree.upsert("audit.source.system", DataType::string(), Some(2)));
        let parent = tree.find("audit").expect("parent created");
        assert!(parent.data_type.is_struct());
        assert_eq!(parent.introduced_by, Some(2));
        assert_eq!(
            tree.find("audit.source.system").and_then(|f| f.introduced_by),
            Some(2)
        );
    }

    #[test]
    fn upsert_replaces_existing_leaf_in_place() {
        let mut tree = sample();
        assert!(tree.upsert("customer.name", DataType::primitive("varchar"), Some(0)));
        let names: Vec<_> = tree.paths();
        assert_eq!(names, sample().paths());
        assert_eq!(
            tree.find("customer.name").map(|f| f.data_type.label()),
            Some("varchar".to_string())
        );
    }

    #[test]
    fn upsert_under_primitive_parent_is_rejected() {
        let mut tree = sample();
        assert!(!tree.upsert("id.child", DataType::string(), None));
        assert_eq!(tree, sample());
    }

    #[test]
    fn upsert_into_array_of_structs() {
        let mut tree = sample();
        assert!(tree.upsert("items.qty", DataType::primitive("integer"), Some(1)));
        assert!(tree.contains("items.qty"));
    }

    #[test]
    fn remove_nested_field() {
        let mut tree = sample();
        let removed = tree.remove("customer.country").expect("removed");
        assert_eq!(removed.name, "country");
        assert!(!tree.contains("customer.country"));
        assert!(tree.remove("customer.country").is_none());
    }

    #[test]
    fn label_formats_arrays() {
        let dt = DataType::Array {
            element: Box::new(DataType::primitive("decimal(38,18)")),
        };
        assert_eq!(dt.label(), "array<decimal(38,18)>");
    }
}
