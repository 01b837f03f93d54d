use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::UserConfig;
use crate::data::osm::RawElement;
use crate::errors::Result;
use crate::etl::parse_osm::{open_osm, OsmElementSource};
use crate::etl::{Etl, Records};
use crate::normalize::street::{canonicalize_street, is_expected_street_type, street_type};

pub const ETL_NAME: &str = "audit_streets";
pub const OUTPUT_FILE_NAME: &str = "street_audit.json";

const STREET_KEY: &str = "addr:street";
const COUNTY_KEYS: [&str; 2] = ["tiger:county", "addr:county"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetTypeEntry {
    pub names: BTreeSet<String>,
    /// What the cleaner would turn the first name seen into, if anything.
    pub suggestion: Option<String>,
}

/// What the audit found in one OSM document.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct StreetAudit {
    /// Occurrences of every element name in the document.
    pub element_names: BTreeMap<String, u64>,
    /// Attribute name frequencies under `node`, `node/tag`, `way`, `way/nd` and `way/tag`.
    pub attribute_counts: BTreeMap<String, BTreeMap<String, u64>>,
    /// Raw `tiger:county` and `addr:county` values and how often each occurs.
    pub county_values: BTreeMap<String, u64>,
    /// Street names whose trailing word is not an expected street type.
    pub unexpected_street_types: BTreeMap<String, StreetTypeEntry>,
}

impl StreetAudit {
    fn count_attribute(&mut self, path: &str, attribute: &str, n: u64) {
        if n == 0 {
            return;
        }
        *self.attribute_counts
            .entry(path.to_string())
            .or_default()
            .entry(attribute.to_string())
            .or_default() += n;
    }

    fn add_street(&mut self, street_type: &str, name: &str) {
        self.unexpected_street_types
            .entry(street_type.to_string())
            .or_insert_with(|| {
                let canonical = canonicalize_street(name).value;
                StreetTypeEntry {
                    names: BTreeSet::new(),
                    suggestion: (canonical != name).then_some(canonical),
                }
            })
            .names
            .insert(name.to_string());
    }
}

/// Records seen by the audit: every element, then the element-name tally
/// once the document is exhausted.
pub enum AuditRecord {
    Element(RawElement),
    ElementNames(BTreeMap<String, u64>),
}

struct AuditRecords<R: BufRead> {
    source: OsmElementSource<R>,
    tallied: bool,
}

impl<R: BufRead> Iterator for AuditRecords<R> {
    type Item = Result<AuditRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.next() {
            Some(element) => Some(element.map(AuditRecord::Element)),
            None if !self.tallied => {
                self.tallied = true;
                Some(Ok(AuditRecord::ElementNames(self.source.element_names().clone())))
            },
            None => None,
        }
    }
}

/// Per-record findings handed from `transform` to `load`.
pub enum Findings {
    Element {
        kind: &'static str,
        attributes: Vec<String>,
        tag_count: u64,
        nd_count: u64,
        counties: Vec<String>,
        streets: Vec<(String, String)>,
    },
    ElementNames(BTreeMap<String, u64>),
}

pub struct AuditSink {
    dir: PathBuf,
    audit: StreetAudit,
}

pub struct AuditStreetsEtl<'a> {
    config: &'a UserConfig,
}

impl AuditStreetsEtl<'_> {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    fn partial_path(dir: &Path) -> PathBuf {
        dir.join(format!("{}.partial", OUTPUT_FILE_NAME))
    }

    pub fn new(config: &UserConfig) -> AuditStreetsEtl {
        AuditStreetsEtl {
            config
        }
    }
}

impl Etl for AuditStreetsEtl<'_> {
    type Record = AuditRecord;
    type Output = Findings;
    type Sink = AuditSink;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).try_exists()?)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        if self.is_cached(dir)? {
            fs::remove_file(Self::output_path(dir))?;
        }
        Ok(())
    }

    fn show_progress(&self) -> bool {
        self.config.show_progress
    }

    fn extract(&mut self) -> Result<Records<Self::Record>> {
        let source = open_osm(Path::new(&self.config.data_path))?;
        Ok(Box::new(AuditRecords { source, tallied: false }))
    }

    fn open_sink(&mut self, dir: &Path) -> Result<Self::Sink> {
        fs::create_dir_all(dir)?;
        Ok(AuditSink {
            dir: dir.to_path_buf(),
            audit: StreetAudit::default(),
        })
    }

    fn transform(&mut self, record: Self::Record) -> Result<Option<Self::Output>> {
        let element = match record {
            AuditRecord::Element(element) => element,
            AuditRecord::ElementNames(names) => return Ok(Some(Findings::ElementNames(names))),
        };

        let counties = element.tags
            .iter()
            .filter(|tag| COUNTY_KEYS.contains(&tag.key.as_str()))
            .map(|tag| tag.value.clone())
            .collect();

        let streets = element.tags
            .iter()
            .filter(|tag| tag.key == STREET_KEY)
            .filter_map(|tag| {
                let found = street_type(&tag.value)?;
                if is_expected_street_type(found) {
                    None
                } else {
                    Some((found.to_string(), tag.value.clone()))
                }
            })
            .collect();

        Ok(Some(Findings::Element {
            kind: element.kind.as_str(),
            attributes: element.attributes.into_iter().map(|(name, _)| name).collect(),
            tag_count: element.tags.len() as u64,
            nd_count: element.node_refs.len() as u64,
            counties,
            streets,
        }))
    }

    fn load(&mut self, sink: &mut Self::Sink, output: Self::Output) -> Result<()> {
        let audit = &mut sink.audit;
        match output {
            Findings::Element { kind, attributes, tag_count, nd_count, counties, streets } => {
                for attribute in &attributes {
                    audit.count_attribute(kind, attribute, 1);
                }
                // tags keep only their k and v, a missing one fails the parse
                let tag_path = format!("{}/tag", kind);
                audit.count_attribute(&tag_path, "k", tag_count);
                audit.count_attribute(&tag_path, "v", tag_count);
                audit.count_attribute(&format!("{}/nd", kind), "ref", nd_count);

                for county in counties {
                    *audit.county_values.entry(county).or_default() += 1;
                }
                for (found, name) in &streets {
                    audit.add_street(found, name);
                }
            },
            Findings::ElementNames(names) => audit.element_names = names,
        }
        Ok(())
    }

    fn finish(&mut self, sink: Self::Sink) -> Result<()> {
        let partial = Self::partial_path(&sink.dir);
        let mut writer = BufWriter::new(File::create(&partial)?);
        serde_json::to_writer_pretty(&mut writer, &sink.audit)?;
        writer.flush()?;
        drop(writer);
        fs::rename(partial, Self::output_path(&sink.dir))?;
        Ok(())
    }
}
