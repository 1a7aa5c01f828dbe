//! Document schema model. Pure data plus validation; no file parsing here.
//!
//! Document types live in an index-addressed `DocTypeTable` and refer to each
//! other by `DocTypeId`. Nesting must form a tree: self-referential or cyclic
//! definitions are rejected when the table is built, so traversal never
//! recurses without bound.
//!
//! `Collection::flatten` is the single source of truth for sizing: it walks the
//! root type depth-first and yields one `FlatField` per key that appears in a
//! stored document, with array contents multiplied by the array cardinality.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SimLimits;
use crate::error::{Error, Result};
use crate::id::DocTypeId;
use crate::stats::{CollectionStats, FieldStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeTag {
    String,
    ShortString,
    LongString,
    Integer,
    Float,
    Date,
    Boolean,
    Array,
    #[serde(rename = "nested-document")]
    Nested,
    Reference,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::ShortString => "short-string",
            TypeTag::LongString => "long-string",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Date => "date",
            TypeTag::Boolean => "boolean",
            TypeTag::Array => "array",
            TypeTag::Nested => "nested-document",
            TypeTag::Reference => "reference",
        }
    }

    /// Array and nested-document keys hold other keys, not a payload.
    pub fn is_container(self) -> bool {
        matches!(self, TypeTag::Array | TypeTag::Nested)
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            TypeTag::String | TypeTag::ShortString | TypeTag::LongString
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    /// Canonical names plus the JSON-Schema spellings found in schema files.
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "string" => TypeTag::String,
            "short-string" | "shortstring" => TypeTag::ShortString,
            "long-string" | "longstring" => TypeTag::LongString,
            "integer" | "int" => TypeTag::Integer,
            "float" | "number" | "double" => TypeTag::Float,
            "date" => TypeTag::Date,
            "boolean" | "bool" => TypeTag::Boolean,
            "array" => TypeTag::Array,
            "nested-document" | "nested" | "object" => TypeTag::Nested,
            "reference" | "ref" => TypeTag::Reference,
            other => {
                return Err(Error::Schema(format!("unrecognized type tag '{other}'")));
            }
        })
    }
}

/// Resolved type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// Never `Array` or `Nested`.
    Scalar(TypeTag),
    Array {
        element: Box<FieldType>,
        /// Declared expected element count; statistics override it.
        cardinality: Option<f64>,
    },
    Nested(DocTypeId),
}

impl FieldType {
    pub fn tag(&self) -> TypeTag {
        match self {
            FieldType::Scalar(t) => *t,
            FieldType::Array { .. } => TypeTag::Array,
            FieldType::Nested(_) => TypeTag::Nested,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentType {
    pub name: String,
    pub fields: Vec<Field>,
}

impl DocumentType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Index-addressed table of document types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocTypeTable {
    types: Vec<DocumentType>,
    by_name: BTreeMap<String, DocTypeId>,
}

impl DocTypeTable {
    pub fn get(&self, id: DocTypeId) -> Option<&DocumentType> {
        self.types.get(id.index())
    }

    pub fn id_of(&self, name: &str) -> Option<DocTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocTypeId, &DocumentType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (DocTypeId::new(i as u64), t))
    }

    fn resolve(&self, id: DocTypeId) -> Result<&DocumentType> {
        self.get(id)
            .ok_or_else(|| Error::Invariant(format!("dangling document type id {id}")))
    }
}

// ----- descriptor records (already parsed by an external reader) -----

/// Type half of a field descriptor; also used for array elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDesc {
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Element type, for arrays.
    #[serde(default)]
    pub items: Option<Box<TypeDesc>>,
    /// Referenced document type name, for nested documents.
    #[serde(default)]
    pub document: Option<String>,
    /// Declared expected element count, for arrays.
    #[serde(default)]
    pub cardinality: Option<f64>,
}

impl TypeDesc {
    pub fn scalar(tag: &str) -> Self {
        Self {
            type_tag: tag.to_string(),
            items: None,
            document: None,
            cardinality: None,
        }
    }

    pub fn nested(document: &str) -> Self {
        Self {
            document: Some(document.to_string()),
            ..Self::scalar("nested-document")
        }
    }

    pub fn array(items: TypeDesc, cardinality: Option<f64>) -> Self {
        Self {
            items: Some(Box::new(items)),
            cardinality,
            ..Self::scalar("array")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDesc {
    pub name: String,
    #[serde(flatten)]
    pub ty: TypeDesc,
}

impl FieldDesc {
    pub fn new(name: &str, ty: TypeDesc) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypeDesc {
    pub name: String,
    pub fields: Vec<FieldDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDesc {
    pub name: String,
    /// Name of the root document type.
    pub document: String,
    #[serde(default)]
    pub stats: CollectionStats,
    #[serde(default)]
    pub indexes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDesc {
    pub name: String,
    pub document_types: Vec<DocumentTypeDesc>,
    pub collections: Vec<CollectionDesc>,
}

/// Builds a validated `DocTypeTable` from descriptor records.
pub struct SchemaBuilder;

impl SchemaBuilder {
    pub fn build(descs: &[DocumentTypeDesc]) -> Result<DocTypeTable> {
        let mut by_name = BTreeMap::new();
        for (i, d) in descs.iter().enumerate() {
            if by_name
                .insert(d.name.clone(), DocTypeId::new(i as u64))
                .is_some()
            {
                return Err(Error::Schema(format!(
                    "document type '{}' is defined twice",
                    d.name
                )));
            }
        }

        let mut types = Vec::with_capacity(descs.len());
        for d in descs {
            let mut seen = BTreeSet::new();
            let mut fields = Vec::with_capacity(d.fields.len());
            for f in &d.fields {
                if !seen.insert(f.name.as_str()) {
                    return Err(Error::Schema(format!(
                        "field '{}' is duplicated in document type '{}'",
                        f.name, d.name
                    )));
                }
                let ctx = format!("{}.{}", d.name, f.name);
                fields.push(Field {
                    name: f.name.clone(),
                    field_type: resolve_type(&f.ty, &by_name, &ctx)?,
                });
            }
            types.push(DocumentType {
                name: d.name.clone(),
                fields,
            });
        }

        let table = DocTypeTable { types, by_name };
        reject_cycles(&table)?;
        Ok(table)
    }
}

fn resolve_type(
    desc: &TypeDesc,
    by_name: &BTreeMap<String, DocTypeId>,
    ctx: &str,
) -> Result<FieldType> {
    let tag: TypeTag = desc.type_tag.parse().map_err(|_| {
        Error::Schema(format!(
            "field '{ctx}' has unrecognized type tag '{}'",
            desc.type_tag
        ))
    })?;
    match tag {
        TypeTag::Array => {
            let items = desc.items.as_ref().ok_or_else(|| {
                Error::Schema(format!("array field '{ctx}' has no element type"))
            })?;
            if let Some(c) = desc.cardinality {
                if !c.is_finite() || c < 0.0 {
                    return Err(Error::Statistics(format!(
                        "array field '{ctx}': declared cardinality must be non-negative, got {c}"
                    )));
                }
            }
            Ok(FieldType::Array {
                element: Box::new(resolve_type(items, by_name, &format!("{ctx}[]"))?),
                cardinality: desc.cardinality,
            })
        }
        TypeTag::Nested => {
            let name = desc.document.as_deref().ok_or_else(|| {
                Error::Schema(format!("nested field '{ctx}' names no document type"))
            })?;
            let id = by_name.get(name).ok_or_else(|| {
                Error::Schema(format!(
                    "field '{ctx}' references undefined document type '{name}'"
                ))
            })?;
            Ok(FieldType::Nested(*id))
        }
        scalar => Ok(FieldType::Scalar(scalar)),
    }
}

fn nested_refs(ft: &FieldType, out: &mut Vec<DocTypeId>) {
    match ft {
        FieldType::Scalar(_) => {}
        FieldType::Nested(id) => out.push(*id),
        FieldType::Array { element, .. } => nested_refs(element, out),
    }
}

fn reject_cycles(table: &DocTypeTable) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        table: &DocTypeTable,
        id: DocTypeId,
        marks: &mut [Mark],
        trail: &mut Vec<DocTypeId>,
    ) -> Result<()> {
        match marks[id.index()] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = trail.iter().position(|t| *t == id).unwrap_or(0);
                let mut names: Vec<&str> = trail[start..]
                    .iter()
                    .filter_map(|t| table.get(*t).map(|d| d.name.as_str()))
                    .collect();
                names.extend(table.get(id).map(|d| d.name.as_str()));
                return Err(Error::Schema(format!(
                    "cyclic document type reference: {}",
                    names.join(" -> ")
                )));
            }
            Mark::New => {}
        }
        marks[id.index()] = Mark::Active;
        trail.push(id);
        let mut refs = Vec::new();
        for f in &table.resolve(id)?.fields {
            nested_refs(&f.field_type, &mut refs);
        }
        for r in refs {
            visit(table, r, marks, trail)?;
        }
        trail.pop();
        marks[id.index()] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::New; table.len()];
    let mut trail = Vec::new();
    for (id, _) in table.iter() {
        visit(table, id, &mut marks, &mut trail)?;
    }
    Ok(())
}

/// One key of a stored document, as seen by the size estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatField {
    /// Dot-separated path; array elements carry a `[]` suffix.
    pub path: String,
    pub tag: TypeTag,
    /// Expected occurrences per document (product of enclosing cardinalities).
    pub multiplicity: f64,
    pub stats: Option<FieldStats>,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    root: DocTypeId,
    types: Arc<DocTypeTable>,
    pub stats: CollectionStats,
    indexes: Vec<String>,
}

impl Collection {
    /// `document` names the root type in `types`.
    pub fn new(
        name: impl Into<String>,
        types: Arc<DocTypeTable>,
        document: &str,
        stats: CollectionStats,
    ) -> Result<Self> {
        let name = name.into();
        let root = types.id_of(document).ok_or_else(|| {
            Error::Schema(format!(
                "collection '{name}' uses undefined document type '{document}'"
            ))
        })?;
        stats.validate().map_err(|e| match e {
            Error::Statistics(m) => Error::Statistics(format!("collection '{name}': {m}")),
            other => other,
        })?;
        Ok(Self {
            name,
            root,
            types,
            stats,
            indexes: Vec::new(),
        })
    }

    /// Declare indexed field paths; each must exist in the document shape.
    pub fn with_indexes<I, S>(mut self, indexes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = self.field_paths();
        for idx in indexes {
            let idx = idx.into();
            if !paths.contains(&idx) {
                return Err(Error::Schema(format!(
                    "collection '{}': index on unknown field '{idx}'",
                    self.name
                )));
            }
            if !self.indexes.contains(&idx) {
                self.indexes.push(idx);
            }
        }
        Ok(self)
    }

    pub fn document_type(&self) -> &DocumentType {
        // `root` was resolved against this very table in `new`.
        &self.types.types[self.root.index()]
    }

    pub fn types(&self) -> &Arc<DocTypeTable> {
        &self.types
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn has_index(&self, path: &str) -> bool {
        self.indexes.iter().any(|i| i == path)
    }

    pub fn document_count(&self) -> Result<u64> {
        self.stats.require_count(&self.name)
    }

    pub fn has_field(&self, path: &str) -> bool {
        self.field_paths().iter().any(|p| p == path)
    }

    /// Every flattened path, in document order. Needs no statistics.
    pub fn field_paths(&self) -> Vec<String> {
        fn walk_type(table: &DocTypeTable, id: DocTypeId, prefix: &str, out: &mut Vec<String>) {
            let Some(doc) = table.get(id) else { return };
            for f in &doc.fields {
                let path = join_path(prefix, &f.name);
                out.push(path.clone());
                walk_contents(table, &f.field_type, &path, out);
            }
        }
        fn walk_contents(table: &DocTypeTable, ft: &FieldType, path: &str, out: &mut Vec<String>) {
            match ft {
                FieldType::Scalar(_) => {}
                FieldType::Nested(id) => walk_type(table, *id, path, out),
                FieldType::Array { element, .. } => match element.as_ref() {
                    FieldType::Nested(id) => walk_type(table, *id, path, out),
                    other => {
                        let elem = format!("{path}[]");
                        out.push(elem.clone());
                        walk_contents(table, other, &elem, out);
                    }
                },
            }
        }

        let mut out = Vec::new();
        walk_type(&self.types, self.root, "", &mut out);
        out
    }

    pub fn flatten(&self) -> Result<Vec<FlatField>> {
        self.flatten_with(&SimLimits::default())
    }

    /// Flatten the document shape, expanding array contents by cardinality.
    pub fn flatten_with(&self, limits: &SimLimits) -> Result<Vec<FlatField>> {
        let mut walker = Flattener {
            collection: self,
            limits,
            out: Vec::new(),
        };
        walker.walk_type(self.root, "", 1.0, 0)?;
        Ok(walker.out)
    }
}

struct Flattener<'a> {
    collection: &'a Collection,
    limits: &'a SimLimits,
    out: Vec<FlatField>,
}

impl Flattener<'_> {
    fn push(&mut self, path: String, tag: TypeTag, multiplicity: f64) {
        let stats = self.collection.stats.get(&path).cloned();
        self.out.push(FlatField {
            path,
            tag,
            multiplicity,
            stats,
        });
    }

    fn walk_type(&mut self, id: DocTypeId, prefix: &str, mult: f64, depth: usize) -> Result<()> {
        if depth > self.limits.max_nesting_depth {
            return Err(Error::Config(format!(
                "collection '{}': nesting deeper than {} levels at '{prefix}'",
                self.collection.name, self.limits.max_nesting_depth
            )));
        }
        let collection = self.collection;
        for f in &collection.types.resolve(id)?.fields {
            let path = join_path(prefix, &f.name);
            self.push(path.clone(), f.field_type.tag(), mult);
            self.walk_contents(&f.field_type, &path, mult, depth)?;
        }
        Ok(())
    }

    /// Keys stored *inside* a container field at `path`.
    fn walk_contents(&mut self, ft: &FieldType, path: &str, mult: f64, depth: usize) -> Result<()> {
        match ft {
            FieldType::Scalar(_) => Ok(()),
            FieldType::Nested(id) => self.walk_type(*id, path, mult, depth + 1),
            FieldType::Array {
                element,
                cardinality,
            } => {
                let inner = mult * self.cardinality(path, *cardinality)?;
                match element.as_ref() {
                    // Embedded documents contribute their own keys directly.
                    FieldType::Nested(id) => self.walk_type(*id, path, inner, depth + 1),
                    other => {
                        let elem = format!("{path}[]");
                        self.push(elem.clone(), other.tag(), inner);
                        self.walk_contents(other, &elem, inner, depth + 1)
                    }
                }
            }
        }
    }

    fn cardinality(&self, path: &str, declared: Option<f64>) -> Result<f64> {
        self.collection
            .stats
            .get(path)
            .and_then(|s| s.avg_cardinality)
            .or(declared)
            .ok_or_else(|| {
                Error::Statistics(format!(
                    "collection '{}': array field '{path}' has no cardinality statistic",
                    self.collection.name
                ))
            })
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// A set of collections keyed by unique name, sharing one type table.
#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
    types: Arc<DocTypeTable>,
    collections: BTreeMap<String, Collection>,
}

impl Database {
    pub fn new(name: impl Into<String>, types: Arc<DocTypeTable>) -> Self {
        Self {
            name: name.into(),
            types,
            collections: BTreeMap::new(),
        }
    }

    pub fn from_desc(desc: &DatabaseDesc) -> Result<Self> {
        let types = Arc::new(SchemaBuilder::build(&desc.document_types)?);
        let mut db = Self::new(desc.name.clone(), Arc::clone(&types));
        for c in &desc.collections {
            let coll =
                Collection::new(c.name.clone(), Arc::clone(&types), &c.document, c.stats.clone())?
                    .with_indexes(c.indexes.iter().cloned())?;
            db.add_collection(coll)?;
        }
        Ok(db)
    }

    pub fn add_collection(&mut self, collection: Collection) -> Result<()> {
        if !Arc::ptr_eq(&self.types, collection.types()) && **collection.types() != *self.types {
            return Err(Error::Schema(format!(
                "collection '{}' was built against a different type table than database '{}'",
                collection.name, self.name
            )));
        }
        if self.collections.contains_key(&collection.name) {
            return Err(Error::Schema(format!(
                "database '{}' already has a collection named '{}'",
                self.name, collection.name
            )));
        }
        self.collections.insert(collection.name.clone(), collection);
        Ok(())
    }

    pub fn types(&self) -> &Arc<DocTypeTable> {
        &self.types
    }

    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.collections.get(name).ok_or_else(|| {
            Error::Schema(format!(
                "database '{}' has no collection named '{name}'",
                self.name
            ))
        })
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
