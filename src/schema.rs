//! Checks shaped elements against a JSON Schema before they are written.
//!
//! The schema document holds one definition per output table under
//! `definitions` (`nodes`, `nodes_tags`, `ways`, `ways_nodes`, `ways_tags`).
//! Each table definition is compiled once and every row is validated in its
//! serde representation. A table the document does not define is not checked.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;

use crate::data::rows::{ShapedElement, Table};
use crate::errors::{Error, Result};

const BUNDLED_SCHEMA: &str = include_str!("../schemas/osm_tables.json");
const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";
// field name used for errors that are not about a single field
const ROW_FIELD: &str = "row";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub errors: Vec<String>,
}

/// Validation failure for one table's row of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementErrors {
    pub table: String,
    pub fields: Vec<FieldError>,
}

impl ElementErrors {
    fn add(&mut self, field: &str, error: String) {
        match self.fields.iter_mut().find(|f| f.field == field) {
            Some(existing) => existing.errors.push(error),
            None => self.fields.push(FieldError {
                field: field.to_string(),
                errors: vec![error],
            }),
        }
    }
}

impl From<ElementErrors> for Error {
    fn from(value: ElementErrors) -> Self {
        let mut message = format!("Element of type '{}' has the following errors:", value.table);
        for field in &value.fields {
            message.push_str(&format!("\n{}: {:?}", field.field, field.errors));
        }
        Error { message }
    }
}

pub trait Validate {
    fn validate(&self, element: &ShapedElement) -> std::result::Result<(), ElementErrors>;
}

/// Compiled per-table validators.
pub struct Schema {
    tables: BTreeMap<Table, Validator>,
}

impl Schema {
    /// The schema shipped in `schemas/osm_tables.json`.
    pub fn bundled() -> Result<Schema> {
        let document: Value = serde_json::from_str(BUNDLED_SCHEMA)?;
        Schema::from_document(&document)
    }

    pub fn from_file(path: &Path) -> Result<Schema> {
        let file = File::open(path)
            .map_err(|err| Error::from(format!("could not open schema {}: {}", path.display(), err)))?;
        let document: Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| Error::from(format!("could not parse schema {}: {}", path.display(), err)))?;
        Schema::from_document(&document)
    }

    pub fn from_document(document: &Value) -> Result<Schema> {
        let definitions = &document["definitions"];
        let mut tables = BTreeMap::new();
        for table in Table::ALL {
            if definitions.get(table.name()).is_none() {
                continue;
            }
            // the table definition becomes the root, with the shared definitions
            // inlined so that its $refs still resolve
            let table_schema = serde_json::json!({
                "$schema": document.get("$schema").and_then(Value::as_str).unwrap_or(DRAFT_07),
                "$ref": format!("#/definitions/{}", table.name()),
                "definitions": definitions,
            });
            let validator = Validator::new(&table_schema).map_err(|err| {
                Error::from(format!("could not compile schema for table '{}': {}", table.name(), err))
            })?;
            tables.insert(table, validator);
        }
        Ok(Schema { tables })
    }

    fn check_row<T: Serialize>(&self, table: Table, row: &T) -> std::result::Result<(), ElementErrors> {
        let Some(validator) = self.tables.get(&table) else {
            return Ok(());
        };
        let mut errors = ElementErrors {
            table: table.name().to_string(),
            fields: vec![],
        };

        match serde_json::to_value(row) {
            Ok(value) => {
                for error in validator.iter_errors(&value) {
                    let path = error.instance_path().to_string();
                    let field = path.trim_start_matches('/');
                    errors.add(if field.is_empty() { ROW_FIELD } else { field }, error.to_string());
                }
            },
            Err(err) => errors.add(ROW_FIELD, err.to_string()),
        }

        if errors.fields.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for Schema {
    fn validate(&self, element: &ShapedElement) -> std::result::Result<(), ElementErrors> {
        match element {
            ShapedElement::Node { node, tags } => {
                self.check_row(Table::Nodes, node)?;
                for tag in tags {
                    self.check_row(Table::NodesTags, tag)?;
                }
            }
            ShapedElement::Way { way, nodes, tags } => {
                self.check_row(Table::Ways, way)?;
                for way_node in nodes {
                    self.check_row(Table::WaysNodes, way_node)?;
                }
                for tag in tags {
                    self.check_row(Table::WaysTags, tag)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rows::{NodeRow, TagRow, WayNodeRow, WayRow};
    use pretty_assertions::assert_eq;

    fn node(lat: Option<&str>) -> NodeRow {
        NodeRow {
            id: "1".to_string(),
            lat: lat.map(str::to_string),
            lon: Some("-84.39".to_string()),
            user: Some("mapper".to_string()),
            uid: Some("7".to_string()),
            version: Some("2".to_string()),
            changeset: Some("11".to_string()),
            timestamp: Some("2016-01-01T00:00:00Z".to_string()),
        }
    }

    fn field_names(errors: &ElementErrors) -> Vec<&str> {
        errors.fields.iter().map(|f| f.field.as_str()).collect()
    }

    #[test]
    fn bundled_schema_defines_every_table() {
        let schema = Schema::bundled().unwrap();
        assert_eq!(schema.tables.keys().copied().collect::<Vec<_>>(), Table::ALL.to_vec());
    }

    #[test]
    fn complete_node_passes() {
        let element = ShapedElement::Node {
            node: node(Some("33.75")),
            tags: vec![TagRow {
                id: "1".to_string(),
                key: "amenity".to_string(),
                value: "cafe".to_string(),
                tag_type: "regular".to_string(),
            }],
        };
        assert_eq!(Schema::bundled().unwrap().validate(&element), Ok(()));
    }

    #[test]
    fn missing_and_mistyped_fields_are_reported() {
        let mut row = node(None);
        row.uid = Some("seven".to_string());
        let element = ShapedElement::Node { node: row, tags: vec![] };

        let errors = Schema::bundled().unwrap().validate(&element).unwrap_err();
        assert_eq!(errors.table, "nodes");
        let mut fields = field_names(&errors);
        fields.sort_unstable();
        assert_eq!(fields, vec!["lat", "uid"]);
        assert!(errors.fields.iter().all(|f| f.errors.len() == 1));
    }

    #[test]
    fn error_message_names_table_and_field() {
        let element = ShapedElement::Way {
            way: WayRow {
                id: "10".to_string(),
                user: Some("mapper".to_string()),
                uid: Some("7".to_string()),
                version: Some("1".to_string()),
                changeset: Some("3".to_string()),
                timestamp: Some("2016-01-03T00:00:00Z".to_string()),
            },
            nodes: vec![WayNodeRow { id: "10".to_string(), node_id: "n1".to_string(), position: 0 }],
            tags: vec![],
        };
        let err: Error = Schema::bundled().unwrap().validate(&element).unwrap_err().into();
        assert!(err.message.starts_with("Element of type 'ways_nodes' has the following errors:\nnode_id: ["), "{}", err.message);
        assert!(err.message.contains("n1"), "{}", err.message);
    }

    #[test]
    fn custom_document_checks_only_its_tables() {
        let schema = Schema::from_document(&serde_json::json!({
            "definitions": {
                "nodes": {
                    "type": "object",
                    "required": ["id", "name"],
                    "properties": { "id": { "type": "string", "pattern": "^[0-9]+$" } }
                }
            }
        })).unwrap();
        assert_eq!(schema.tables.len(), 1);

        let mut row = node(None);
        row.user = None;
        let errors = schema.validate(&ShapedElement::Node { node: row, tags: vec![] }).unwrap_err();
        assert_eq!(field_names(&errors), vec![ROW_FIELD]);

        let way = ShapedElement::Way {
            way: WayRow {
                id: "not a number".to_string(),
                user: None,
                uid: None,
                version: None,
                changeset: None,
                timestamp: None,
            },
            nodes: vec![],
            tags: vec![],
        };
        assert_eq!(schema.validate(&way), Ok(()));
    }

    #[test]
    fn schema_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, BUNDLED_SCHEMA).unwrap();
        let schema = Schema::from_file(&path).unwrap();
        assert_eq!(schema.validate(&ShapedElement::Node { node: node(Some("1.5")), tags: vec![] }), Ok(()));

        std::fs::write(&path, r#"{ "definitions": { "nodes": { "type": 12 } } }"#).unwrap();
        let err = Schema::from_file(&path).err().unwrap();
        assert!(err.message.contains("table 'nodes'"), "{}", err.message);
    }
}
