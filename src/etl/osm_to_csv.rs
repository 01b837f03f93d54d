use std::path::Path;

use crate::UserConfig;
use crate::data::osm::RawElement;
use crate::data::rows::ShapedElement;
use crate::diagnostics::AuditCounters;
use crate::errors::Result;
use crate::etl::csv_tables::CsvTables;
use crate::etl::parse_osm::open_osm;
use crate::etl::shape::shape_element;
use crate::etl::{Etl, Records};
use crate::normalize::TagNormalizer;
use crate::schema::{Schema, Validate};

pub const ETL_NAME: &str = "osm_to_csv";

/// Cleans an OSM document into the five CSV tables.
pub struct OsmToCsvEtl<'a> {
    config: &'a UserConfig,
    normalizer: TagNormalizer,
    validator: Option<Box<dyn Validate>>,
    counters: &'a mut AuditCounters,
}

impl<'a> OsmToCsvEtl<'a> {
    pub fn new(config: &'a UserConfig, counters: &'a mut AuditCounters) -> Result<OsmToCsvEtl<'a>> {
        let validator: Option<Box<dyn Validate>> = if config.validate {
            let schema = match &config.schema_path {
                Some(path) => Schema::from_file(Path::new(path))?,
                None => Schema::bundled()?,
            };
            Some(Box::new(schema))
        } else {
            None
        };

        Ok(OsmToCsvEtl {
            config,
            normalizer: TagNormalizer::new(&config.state_code, &config.county_fallback),
            validator,
            counters,
        })
    }
}

impl Etl for OsmToCsvEtl<'_> {
    type Record = RawElement;
    type Output = ShapedElement;
    type Sink = CsvTables;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        CsvTables::exist_in(dir)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        CsvTables::remove_from(dir)
    }

    fn show_progress(&self) -> bool {
        self.config.show_progress
    }

    fn extract(&mut self) -> Result<Records<Self::Record>> {
        let source = open_osm(Path::new(&self.config.data_path))?;
        Ok(Box::new(source))
    }

    fn open_sink(&mut self, dir: &Path) -> Result<Self::Sink> {
        CsvTables::create(dir)
    }

    fn transform(&mut self, record: Self::Record) -> Result<Option<Self::Output>> {
        let shaped = shape_element(&record, &self.normalizer, self.counters)?;
        if let Some(validator) = &self.validator {
            validator.validate(&shaped)?;
        }
        Ok(Some(shaped))
    }

    fn load(&mut self, sink: &mut Self::Sink, output: Self::Output) -> Result<()> {
        for row in output.into_rows() {
            sink.write(&row)?;
            self.counters.record_row(row.table());
        }
        Ok(())
    }

    fn finish(&mut self, sink: Self::Sink) -> Result<()> {
        sink.commit()
    }
}
