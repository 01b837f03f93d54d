use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::data::rows::{OutputRow, Table};
use crate::errors::{Error, Result};

const PARTIAL_SUFFIX: &str = ".partial";

/// Append-only CSV sink for the five output tables.
///
/// Rows go to `<table>.csv.partial` files. They only get their final names in
/// [`CsvTables::commit`], so a run that fails halfway never leaves behind a set
/// of tables that looks complete.
pub struct CsvTables {
    dir: PathBuf,
    nodes: Writer<File>,
    nodes_tags: Writer<File>,
    ways: Writer<File>,
    ways_nodes: Writer<File>,
    ways_tags: Writer<File>,
}

fn partial_path(dir: &Path, table: Table) -> PathBuf {
    dir.join(format!("{}{}", table.file_name(), PARTIAL_SUFFIX))
}

fn create_table(dir: &Path, table: Table) -> Result<Writer<File>> {
    let path = partial_path(dir, table);
    let file = File::create(&path)
        .map_err(|err| Error::from(format!("could not create {}: {}", path.display(), err)))?;
    // headers are written by hand so that empty tables still get one
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(table.columns())?;
    Ok(writer)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.try_exists()? {
        fs::remove_file(path)?;
    }
    Ok(())
}

impl CsvTables {
    pub fn create(dir: &Path) -> Result<CsvTables> {
        fs::create_dir_all(dir)?;
        Ok(CsvTables {
            dir: dir.to_path_buf(),
            nodes: create_table(dir, Table::Nodes)?,
            nodes_tags: create_table(dir, Table::NodesTags)?,
            ways: create_table(dir, Table::Ways)?,
            ways_nodes: create_table(dir, Table::WaysNodes)?,
            ways_tags: create_table(dir, Table::WaysTags)?,
        })
    }

    /// True when all five finished tables are present in `dir`.
    pub fn exist_in(dir: &Path) -> Result<bool> {
        for table in Table::ALL {
            if !dir.join(table.file_name()).try_exists()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Removes finished tables and any partial ones left by a failed run.
    pub fn remove_from(dir: &Path) -> Result<()> {
        for table in Table::ALL {
            remove_if_exists(&dir.join(table.file_name()))?;
            remove_if_exists(&partial_path(dir, table))?;
        }
        Ok(())
    }

    pub fn write(&mut self, row: &OutputRow) -> Result<()> {
        match row {
            OutputRow::Node(node) => self.nodes.serialize(node)?,
            OutputRow::NodeTag(tag) => self.nodes_tags.serialize(tag)?,
            OutputRow::Way(way) => self.ways.serialize(way)?,
            OutputRow::WayNode(way_node) => self.ways_nodes.serialize(way_node)?,
            OutputRow::WayTag(tag) => self.ways_tags.serialize(tag)?,
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.nodes.flush()?;
        self.nodes_tags.flush()?;
        self.ways.flush()?;
        self.ways_nodes.flush()?;
        self.ways_tags.flush()?;
        Ok(())
    }

    /// Flushes every table and moves it to its final `<table>.csv` name.
    pub fn commit(mut self) -> Result<()> {
        self.flush()?;
        let dir = self.dir;
        // writers must be closed before their files are renamed
        drop((self.nodes, self.nodes_tags, self.ways, self.ways_nodes, self.ways_tags));
        for table in Table::ALL {
            fs::rename(partial_path(&dir, table), dir.join(table.file_name()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rows::{TagRow, WayNodeRow};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_tables_have_headers() {
        let dir = tempfile::tempdir().unwrap();
        CsvTables::create(dir.path()).unwrap().commit().unwrap();

        assert!(CsvTables::exist_in(dir.path()).unwrap());
        let ways_nodes = fs::read_to_string(dir.path().join("ways_nodes.csv")).unwrap();
        assert_eq!(ways_nodes, "id,node_id,position\n");
        let nodes = fs::read_to_string(dir.path().join("nodes.csv")).unwrap();
        assert_eq!(nodes, "id,lat,lon,user,uid,version,changeset,timestamp\n");
    }

    #[test]
    fn rows_go_to_their_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = CsvTables::create(dir.path()).unwrap();
        tables.write(&OutputRow::WayNode(WayNodeRow {
            id: "10".to_string(),
            node_id: "1".to_string(),
            position: 0,
        })).unwrap();
        tables.write(&OutputRow::WayTag(TagRow {
            id: "10".to_string(),
            key: "name".to_string(),
            value: "Ponce de León Avenue, NE".to_string(),
            tag_type: "regular".to_string(),
        })).unwrap();
        tables.commit().unwrap();

        let ways_nodes = fs::read_to_string(dir.path().join("ways_nodes.csv")).unwrap();
        assert_eq!(ways_nodes, "id,node_id,position\n10,1,0\n");
        let ways_tags = fs::read_to_string(dir.path().join("ways_tags.csv")).unwrap();
        assert_eq!(ways_tags, "id,key,value,type\n10,name,\"Ponce de León Avenue, NE\",regular\n");
        let nodes_tags = fs::read_to_string(dir.path().join("nodes_tags.csv")).unwrap();
        assert_eq!(nodes_tags, "id,key,value,type\n");
    }

    #[test]
    fn uncommitted_tables_are_not_complete() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = CsvTables::create(dir.path()).unwrap();
        tables.flush().unwrap();
        drop(tables);

        assert!(!CsvTables::exist_in(dir.path()).unwrap());
        assert!(!dir.path().join("nodes.csv").exists());
        assert!(dir.path().join("nodes.csv.partial").exists());
    }

    #[test]
    fn remove_from_clears_tables() {
        let dir = tempfile::tempdir().unwrap();
        CsvTables::create(dir.path()).unwrap().commit().unwrap();
        drop(CsvTables::create(dir.path()).unwrap());
        CsvTables::remove_from(dir.path()).unwrap();

        assert!(!CsvTables::exist_in(dir.path()).unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
