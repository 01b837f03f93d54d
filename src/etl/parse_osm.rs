use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::data::osm::{ChildTag, ElementKind, RawElement};
use crate::errors::{Error, Result};

pub type OsmInput = Box<dyn BufRead + Send>;

/// Streams the `node` and `way` elements of an OSM document in document order.
/// Only the element currently being read is kept in memory.
///
/// Every element name seen along the way (`relation`, `member`, `bounds` and so
/// on, not just the yielded ones) is tallied in [`OsmElementSource::element_names`].
pub struct OsmElementSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
    // element being read, with the depth of its start tag
    current: Option<(RawElement, usize)>,
    element_names: BTreeMap<String, u64>,
    finished: bool,
}

/// Opens an `.osm` file, decompressing on the fly when the name ends in `.xz`.
pub fn open_osm(path: &Path) -> Result<OsmElementSource<OsmInput>> {
    let file = fs::File::open(path)
        .map_err(|err| Error::from(format!("could not open {}: {}", path.display(), err)))?;
    let file_reader = BufReader::new(file);
    let input: OsmInput = if path.extension().is_some_and(|ext| ext == "xz") {
        Box::new(BufReader::new(XzDecoder::new(file_reader)))
    } else {
        Box::new(file_reader)
    };
    Ok(OsmElementSource::from_reader(input))
}

fn read_attributes(el: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let key = str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn take_attribute(attributes: &mut Vec<(String, String)>, name: &str) -> Option<String> {
    let idx = attributes.iter().position(|(key, _)| key == name)?;
    Some(attributes.swap_remove(idx).1)
}

fn missing_attribute(parent: &RawElement, child: &str, attribute: &str) -> Error {
    let id = parent.attribute("id").unwrap_or("?");
    format!(
        "<{}> child of {} {} has no '{}' attribute",
        child, parent.kind.as_str(), id, attribute
    ).into()
}

fn attach_child(parent: &mut RawElement, el: &BytesStart) -> Result<()> {
    match el.name().as_ref() {
        b"tag" => {
            let mut attributes = read_attributes(el)?;
            let key = take_attribute(&mut attributes, "k")
                .ok_or_else(|| missing_attribute(parent, "tag", "k"))?;
            let value = take_attribute(&mut attributes, "v")
                .ok_or_else(|| missing_attribute(parent, "tag", "v"))?;
            parent.tags.push(ChildTag { key, value });
        },
        b"nd" if parent.kind == ElementKind::Way => {
            let mut attributes = read_attributes(el)?;
            let node_ref = take_attribute(&mut attributes, "ref")
                .ok_or_else(|| missing_attribute(parent, "nd", "ref"))?;
            parent.node_refs.push(node_ref);
        },
        _ => (),
    }
    Ok(())
}

fn tally_name(names: &mut BTreeMap<String, u64>, el: &BytesStart) -> Result<()> {
    let name = str::from_utf8(el.name().into_inner())?;
    match names.get_mut(name) {
        Some(count) => *count += 1,
        None => {
            names.insert(name.to_string(), 1);
        },
    }
    Ok(())
}

fn start_element(el: &BytesStart) -> Result<Option<RawElement>> {
    match ElementKind::from_tag_name(el.name().as_ref()) {
        Some(kind) => {
            let mut element = RawElement::new(kind);
            element.attributes = read_attributes(el)?;
            Ok(Some(element))
        },
        None => Ok(None),
    }
}

impl<R: BufRead> OsmElementSource<R> {
    pub fn from_reader(input: R) -> OsmElementSource<R> {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);
        reader.check_end_names(true);

        OsmElementSource {
            reader,
            buf: Vec::new(),
            depth: 0,
            current: None,
            element_names: BTreeMap::new(),
            finished: false,
        }
    }

    /// How often each element name occurred in the part of the document read so far.
    pub fn element_names(&self) -> &BTreeMap<String, u64> {
        &self.element_names
    }

    fn read_element(&mut self) -> Result<Option<RawElement>> {
        loop {
            // if we don't keep a borrow elsewhere, we can clear the buffer to keep memory usage low
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    tally_name(&mut self.element_names, &e)?;
                    self.depth += 1;
                    if let Some((parent, parent_depth)) = &mut self.current {
                        if self.depth == *parent_depth + 1 {
                            attach_child(parent, &e)?;
                        }
                    } else if let Some(element) = start_element(&e)? {
                        self.current = Some((element, self.depth));
                    }
                },
                Event::Empty(e) => {
                    tally_name(&mut self.element_names, &e)?;
                    if let Some((parent, parent_depth)) = &mut self.current {
                        if self.depth == *parent_depth {
                            attach_child(parent, &e)?;
                        }
                    } else if let Some(element) = start_element(&e)? {
                        return Ok(Some(element));
                    }
                },
                Event::End(_) => {
                    let closes_current = matches!(self.current, Some((_, d)) if d == self.depth);
                    self.depth = self.depth.saturating_sub(1);
                    if closes_current {
                        return Ok(self.current.take().map(|(element, _)| element));
                    }
                },
                Event::Eof => {
                    if let Some((element, _)) = &self.current {
                        return Err(format!(
                            "unexpected end of document inside <{}> at byte {}",
                            element.kind.as_str(),
                            self.reader.buffer_position()
                        ).into());
                    }
                    if self.depth > 0 {
                        return Err("unexpected end of document, unclosed elements remain".into());
                    }
                    return Ok(None);
                },
                // declarations, comments and text carry nothing we keep
                _ => (),
            }
        }
    }
}

impl<R: BufRead> Iterator for OsmElementSource<R> {
    type Item = Result<RawElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.finished = true;
                None
            },
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read_all(document: &str) -> Result<Vec<RawElement>> {
        OsmElementSource::from_reader(document.as_bytes()).collect()
    }

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <bounds minlat="33.7" minlon="-84.4" maxlat="33.8" maxlon="-84.3"/>
  <node id="1" lat="33.75" lon="-84.39" user="mapper" uid="7" version="2" changeset="11" timestamp="2016-01-01T00:00:00Z"/>
  <node id="2" lat="33.76" lon="-84.38" user="M&amp;M" uid="8" version="1" changeset="12" timestamp="2016-01-02T00:00:00Z">
    <tag k="amenity" v="cafe"/>
    <tag k="name" v="Café Intermezzo"/>
  </node>
  <way id="10" user="mapper" uid="7" version="3" changeset="13" timestamp="2016-01-03T00:00:00Z">
    <nd ref="1"/>
    <tag k="highway" v="residential"/>
    <nd ref="2"/>
  </way>
  <relation id="100">
    <member type="way" ref="10" role="outer"/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>"#;

    #[test]
    fn yields_nodes_and_ways_in_order() {
        let elements = read_all(DOCUMENT).unwrap();
        let kinds: Vec<ElementKind> = elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Node, ElementKind::Node, ElementKind::Way]);
    }

    #[test]
    fn attributes_and_children_are_collected() {
        let elements = read_all(DOCUMENT).unwrap();

        assert!(elements[0].tags.is_empty());
        assert_eq!(elements[1].attribute("user"), Some("M&M"));
        assert_eq!(elements[1].tags, vec![
            ChildTag { key: "amenity".to_string(), value: "cafe".to_string() },
            ChildTag { key: "name".to_string(), value: "Café Intermezzo".to_string() },
        ]);

        let way = &elements[2];
        assert_eq!(way.attribute("id"), Some("10"));
        assert_eq!(way.node_refs, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(way.tags.len(), 1);
    }

    #[test]
    fn every_element_name_is_tallied() {
        let mut source = OsmElementSource::from_reader(DOCUMENT.as_bytes());
        assert_eq!(source.by_ref().count(), 3);

        let names: Vec<(&str, u64)> = source.element_names()
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        assert_eq!(names, vec![
            ("bounds", 1),
            ("member", 1),
            ("nd", 2),
            ("node", 2),
            ("osm", 1),
            ("relation", 1),
            ("tag", 4),
            ("way", 1),
        ]);
    }

    #[test]
    fn nested_tags_of_other_elements_are_ignored() {
        let document = r#"<osm><node id="1"><tag k="a" v="b"><tag k="inner" v="x"/></tag></node></osm>"#;
        let elements = read_all(document).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].tags, vec![ChildTag { key: "a".to_string(), value: "b".to_string() }]);
    }

    #[test]
    fn nodes_do_not_collect_node_refs() {
        let document = r#"<osm><node id="1"><nd ref="5"/></node></osm>"#;
        let elements = read_all(document).unwrap();
        assert!(elements[0].node_refs.is_empty());
    }

    #[test]
    fn mismatched_end_tag_is_an_error() {
        let document = r#"<osm><node id="1"><tag k="a" v="b"/></way></osm>"#;
        assert!(read_all(document).is_err());
    }

    #[test]
    fn truncated_document_is_an_error() {
        let document = r#"<osm><way id="1"><nd ref="1"/>"#;
        let err = read_all(document).unwrap_err();
        assert!(err.message.contains("unexpected end of document"), "{}", err.message);
    }

    #[test]
    fn tag_without_key_is_an_error() {
        let document = r#"<osm><node id="3"><tag v="b"/></node></osm>"#;
        let err = read_all(document).unwrap_err();
        assert!(err.message.contains("node 3"), "{}", err.message);
    }

    #[test]
    fn stops_after_first_error() {
        let document = r#"<osm><node id="1"/><node id="2"></way>"#;
        let mut source = OsmElementSource::from_reader(document.as_bytes());
        assert!(source.next().unwrap().is_ok());
        assert!(source.next().unwrap().is_err());
        assert!(source.next().is_none());
    }

    #[test]
    fn xz_input_is_decompressed() {
        use std::io::Write;
        use xz::write::XzEncoder;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.osm.xz");
        let mut encoder = XzEncoder::new(fs::File::create(&path).unwrap(), 6);
        encoder.write_all(DOCUMENT.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let elements: Vec<RawElement> = open_osm(&path).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(elements.len(), 3);
    }
}
