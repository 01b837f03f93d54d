pub mod audit_streets;
pub mod csv_tables;
pub mod osm_to_csv;
pub mod parse_osm;
pub mod shape;

use std::path::Path;
use log::{info, error};

use crate::errors::Result;

/// Records fed into an ETL one at a time by `extract`.
pub type Records<T> = Box<dyn Iterator<Item = Result<T>>>;

fn logged<T>(etl_name: &str, phase: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        error!(etl_name = etl_name, phase = phase, err = err.message.as_str(); "ETL phase failed with error");
    }
    result
}

/// A streaming ETL step. Records are extracted lazily, transformed one by one
/// and loaded into a sink that lives for the duration of the run.
pub trait Etl {
    type Record: 'static;
    type Output;
    type Sink;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;
    fn clean(&self, dir: &Path) -> Result<()>;

    fn show_progress(&self) -> bool {
        false
    }

    fn extract(&mut self) -> Result<Records<Self::Record>>;
    fn open_sink(&mut self, dir: &Path) -> Result<Self::Sink>;
    fn transform(&mut self, record: Self::Record) -> Result<Option<Self::Output>>;
    fn load(&mut self, sink: &mut Self::Sink, output: Self::Output) -> Result<()>;
    fn finish(&mut self, sink: Self::Sink) -> Result<()>;

    /// Runs the ETL into `dir`. Returns `false` when cached output was kept
    /// and nothing was read.
    fn process(&mut self, dir: &Path) -> Result<bool> {
        let etl_name = self.etl_name().to_string();
        info!(etl_name = etl_name.as_str(); "Starting ETL process");
        if self.is_cached(dir)? {
            info!(etl_name = etl_name.as_str(); "Using cached value");
            return Ok(false);
        }

        info!(etl_name = etl_name.as_str(); "Extracting");
        let records = logged(&etl_name, "extract", self.extract())?;
        let records: Records<Self::Record> = if self.show_progress() {
            Box::new(tqdm::tqdm(records))
        } else {
            records
        };
        let mut sink = logged(&etl_name, "load", self.open_sink(dir))?;

        info!(etl_name = etl_name.as_str(); "Transforming and loading");
        let mut count: u64 = 0;
        for record in records {
            let record = logged(&etl_name, "extract", record)?;
            if let Some(output) = logged(&etl_name, "transform", self.transform(record))? {
                logged(&etl_name, "load", self.load(&mut sink, output))?;
            }
            count += 1;
        }

        logged(&etl_name, "load", self.finish(sink))?;
        info!(etl_name = etl_name.as_str(), records = count; "Process finished");
        Ok(true)
    }
}
