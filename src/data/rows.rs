use serde::Serialize;

/// The five output tables. Column order of each table is fixed by `columns`
/// and matches the field order of the row struct written into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Nodes,
    NodesTags,
    Ways,
    WaysNodes,
    WaysTags,
}

pub const NODE_FIELDS: [&str; 8] = ["id", "lat", "lon", "user", "uid", "version", "changeset", "timestamp"];
pub const NODE_TAGS_FIELDS: [&str; 4] = ["id", "key", "value", "type"];
pub const WAY_FIELDS: [&str; 6] = ["id", "user", "uid", "version", "changeset", "timestamp"];
pub const WAY_TAGS_FIELDS: [&str; 4] = ["id", "key", "value", "type"];
pub const WAY_NODES_FIELDS: [&str; 3] = ["id", "node_id", "position"];

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Nodes,
        Table::NodesTags,
        Table::Ways,
        Table::WaysNodes,
        Table::WaysTags,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Nodes => "nodes",
            Table::NodesTags => "nodes_tags",
            Table::Ways => "ways",
            Table::WaysNodes => "ways_nodes",
            Table::WaysTags => "ways_tags",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Nodes => &NODE_FIELDS,
            Table::NodesTags => &NODE_TAGS_FIELDS,
            Table::Ways => &WAY_FIELDS,
            Table::WaysNodes => &WAY_NODES_FIELDS,
            Table::WaysTags => &WAY_TAGS_FIELDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRow {
    pub id: String,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub user: Option<String>,
    pub uid: Option<String>,
    pub version: Option<String>,
    pub changeset: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WayRow {
    pub id: String,
    pub user: Option<String>,
    pub uid: Option<String>,
    pub version: Option<String>,
    pub changeset: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WayNodeRow {
    pub id: String,
    pub node_id: String,
    pub position: usize,
}

/// Row of either `nodes_tags` or `ways_tags`; both tables share one layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRow {
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub tag_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRow {
    Node(NodeRow),
    NodeTag(TagRow),
    Way(WayRow),
    WayNode(WayNodeRow),
    WayTag(TagRow),
}

impl OutputRow {
    pub fn table(&self) -> Table {
        match self {
            OutputRow::Node(_) => Table::Nodes,
            OutputRow::NodeTag(_) => Table::NodesTags,
            OutputRow::Way(_) => Table::Ways,
            OutputRow::WayNode(_) => Table::WaysNodes,
            OutputRow::WayTag(_) => Table::WaysTags,
        }
    }
}

/// Every row produced from a single element, grouped so the element can be
/// validated as a whole before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapedElement {
    Node {
        node: NodeRow,
        tags: Vec<TagRow>,
    },
    Way {
        way: WayRow,
        nodes: Vec<WayNodeRow>,
        tags: Vec<TagRow>,
    },
}

impl ShapedElement {
    pub fn into_rows(self) -> Vec<OutputRow> {
        match self {
            ShapedElement::Node { node, tags } => {
                let mut rows = Vec::with_capacity(1 + tags.len());
                rows.push(OutputRow::Node(node));
                rows.extend(tags.into_iter().map(OutputRow::NodeTag));
                rows
            }
            ShapedElement::Way { way, nodes, tags } => {
                let mut rows = Vec::with_capacity(1 + nodes.len() + tags.len());
                rows.push(OutputRow::Way(way));
                rows.extend(nodes.into_iter().map(OutputRow::WayNode));
                rows.extend(tags.into_iter().map(OutputRow::WayTag));
                rows
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn way_rows_keep_table_order() {
        let shaped = ShapedElement::Way {
            way: WayRow {
                id: "7".to_string(),
                user: None,
                uid: None,
                version: None,
                changeset: None,
                timestamp: None,
            },
            nodes: vec![WayNodeRow { id: "7".to_string(), node_id: "1".to_string(), position: 0 }],
            tags: vec![TagRow {
                id: "7".to_string(),
                key: "highway".to_string(),
                value: "residential".to_string(),
                tag_type: "regular".to_string(),
            }],
        };

        let tables: Vec<Table> = shaped.into_rows().iter().map(OutputRow::table).collect();
        assert_eq!(tables, vec![Table::Ways, Table::WaysNodes, Table::WaysTags]);
    }

    #[test]
    fn tag_row_serializes_type_column() {
        let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(vec![]);
        writer.serialize(TagRow {
            id: "1".to_string(),
            key: "addr:city".to_string(),
            value: "Atlanta".to_string(),
            tag_type: "addr".to_string(),
        }).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text, "id,key,value,type\n1,addr:city,Atlanta,addr\n");
    }
}
