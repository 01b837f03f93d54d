/// Kind of a top-level OSM element the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Way,
}

impl ElementKind {
    pub fn from_tag_name(name: &[u8]) -> Option<ElementKind> {
        match name {
            b"node" => Some(ElementKind::Node),
            b"way" => Some(ElementKind::Way),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
        }
    }
}

/// A `<tag k=".." v=".."/>` child of a node or way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildTag {
    pub key: String,
    pub value: String,
}

/// One completed `node` or `way` element, as read from the document. Attribute
/// values are unescaped but otherwise kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement {
    pub kind: ElementKind,
    pub attributes: Vec<(String, String)>,
    pub tags: Vec<ChildTag>,
    /// `ref` of every `nd` child, in document order. Always empty for nodes.
    pub node_refs: Vec<String>,
}

impl RawElement {
    pub fn new(kind: ElementKind) -> RawElement {
        RawElement {
            kind,
            attributes: Vec::new(),
            tags: Vec::new(),
            node_refs: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}
