//! Table loading
//!
//! Reads every delimited file in a data directory, sniffs its delimiter,
//! normalizes headers, and merges the results into one [`Table`] following
//! a [`JoinPlan`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{NestorError, Result};
use crate::table::{normalize_column, Record, Table, Value};

/// Delimiters tried in order; the first giving more than one column wins
pub const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

pub const TABLE_EXTENSIONS: &[&str] = &["csv", "tsv", "psv", "txt"];

pub const DEFAULT_JOIN_KEYS: &[&str] = &["project_id", "projectid"];

/// How one named table is linked into the merged table.
///
/// `table` is matched against the file stem, ignoring case and anything
/// that is not a letter or digit, so `ProjectAddress.csv` and
/// `project_address.tsv` are both `projectaddress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLink {
  pub table: String,
  /// New name for the table's own `id` column
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id_as: Option<String>,
  /// Column of the merged table so far
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub left_key: Option<String>,
  /// Column of this table matched against `left_key`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub right_key: Option<String>,
}

impl TableLink {
  /// The table everything else is joined onto
  pub fn base(table: &str, id_as: &str) -> Self {
    Self { table: table.to_string(), id_as: Some(id_as.to_string()), left_key: None, right_key: None }
  }

  pub fn joined(table: &str, id_as: &str, left_key: &str, right_key: &str) -> Self {
    Self {
      table: table.to_string(),
      id_as: Some(id_as.to_string()),
      left_key: Some(left_key.to_string()),
      right_key: Some(right_key.to_string()),
    }
  }
}

/// Listing export layout: projects, their addresses and configurations,
/// and the priced variants of each configuration
pub fn default_table_links() -> Vec<TableLink> {
  vec![
    TableLink::base("project", "project_id"),
    TableLink::joined("projectaddress", "address_id", "project_id", "projectid"),
    TableLink::joined("projectconfiguration", "config_id", "project_id", "projectid"),
    TableLink::joined("projectconfigurationvariant", "variant_id", "config_id", "configurationid"),
  ]
}

/// Rules for merging loaded tables.
///
/// Named tables follow their [`TableLink`]; any other table joins on the
/// first of `keys` present on each side.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
  pub keys: Vec<String>,
  pub links: Vec<TableLink>,
}

impl Default for JoinPlan {
  fn default() -> Self {
    Self {
      keys: DEFAULT_JOIN_KEYS.iter().map(|key| key.to_string()).collect(),
      links: default_table_links(),
    }
  }
}

impl JoinPlan {
  fn position(&self, name: &str) -> Option<usize> {
    self.links.iter().position(|link| table_name(&link.table) == name)
  }

  fn link(&self, name: &str) -> Option<&TableLink> {
    self.position(name).map(|index| &self.links[index])
  }

  fn shared_key(&self, table: &Table) -> Option<&str> {
    self.keys.iter().find(|key| table.has_column(key)).map(String::as_str)
  }

  /// Whether a table has anything to join on at all
  fn is_keyed(&self, name: &str, table: &Table) -> bool {
    self.link(name).is_some() || self.shared_key(table).is_some()
  }

  /// Columns to join `table` onto `merged` with, if any apply
  fn join_columns(&self, merged: &Table, name: &str, table: &Table) -> Option<(String, String)> {
    let linked = self.link(name).and_then(|link| link.left_key.as_ref().zip(link.right_key.as_ref()));
    if let Some((left, right)) = linked {
      if merged.has_column(left) && table.has_column(right) {
        return Some((left.clone(), right.clone()));
      }
    }

    let left = self.shared_key(merged)?;
    let right = self.shared_key(table)?;
    Some((left.to_string(), right.to_string()))
  }

  /// Apply the `id` rename configured for a table
  fn rename_id(&self, name: &str, table: Table) -> Table {
    match self.link(name).and_then(|link| link.id_as.as_deref()) {
      Some(id_as) => table.rename_column("id", id_as),
      None => table,
    }
  }
}

/// Normalized table name for a file stem or a configured link
pub fn table_name(raw: &str) -> String {
  raw.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

/// A parsed file before merging
#[derive(Debug, Clone)]
pub struct LoadedFile {
  pub name: String,
  pub delimiter: u8,
  pub table: Table,
}

/// Files in `dir` that look like delimited tables, sorted by name
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
  if !dir.is_dir() {
    return Err(NestorError::data_load(format!("{} is not a directory", dir.display())));
  }

  let mut files = Vec::new();
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_file() && is_table_file(&path) {
      files.push(path);
    }
  }

  files.sort();
  Ok(files)
}

fn is_table_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| TABLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    .unwrap_or(false)
}

/// Read one file, trying each delimiter in turn
pub fn read_table(path: &Path) -> Result<LoadedFile> {
  if !path.exists() {
    return Err(NestorError::data_load(format!("Missing file: {}", path.display())));
  }

  let name = path.file_stem().map(|stem| table_name(&stem.to_string_lossy())).unwrap_or_default();
  let content = fs::read_to_string(path)?;
  for delimiter in DELIMITERS {
    match parse_delimited(&content, delimiter) {
      Ok(table) if table.columns().len() > 1 => {
        debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "parsed table");
        return Ok(LoadedFile { name, delimiter, table });
      }
      Ok(_) => continue,
      Err(e) => {
        debug!(path = %path.display(), error = %e, "delimiter attempt failed");
        continue;
      }
    }
  }

  Err(NestorError::data_load(format!("Could not read table: {}", path.display())))
}

/// Parse delimited text with a header row.
///
/// Blank and repeated headers are dropped; a repeated header never
/// shadows the first column of that name, even where that cell is blank.
pub fn parse_delimited(content: &str, delimiter: u8) -> Result<Table> {
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .flexible(true)
    .has_headers(true)
    .trim(csv::Trim::All)
    .from_reader(content.as_bytes());

  let headers: Vec<String> = reader.headers()?.iter().map(normalize_column).collect();

  let mut seen = HashSet::new();
  let kept: Vec<Option<&String>> = headers
    .iter()
    .map(|column| (!column.is_empty() && seen.insert(column.as_str())).then_some(column))
    .collect();

  let mut rows = Vec::new();
  for (line, result) in reader.records().enumerate() {
    let record = match result {
      Ok(record) => record,
      Err(e) => {
        warn!("Skipping malformed row {}: {}", line + 2, e);
        continue;
      }
    };

    let mut row = Record::new();
    for (column, raw) in kept.iter().zip(record.iter()) {
      let Some(column) = column else {
        continue;
      };
      if let Some(value) = Value::parse(raw) {
        row.insert(column.as_str(), value);
      }
    }
    rows.push(row);
  }

  let columns = kept.into_iter().flatten().cloned().collect();
  Ok(Table::new(columns, rows))
}

/// Load and merge every readable table in `dir`.
///
/// Unreadable files are skipped with a warning. Fails only when nothing
/// could be read.
pub fn load_dir(dir: &Path, plan: &JoinPlan) -> Result<Table> {
  let files = discover(dir)?;
  load_files(&files, plan)
}

/// Load and merge an explicit set of files
pub fn load_files(paths: &[PathBuf], plan: &JoinPlan) -> Result<Table> {
  let mut tables = Vec::new();
  for path in paths {
    match read_table(path) {
      Ok(loaded) => tables.push((loaded.name, loaded.table)),
      Err(e) => warn!("{e}"),
    }
  }

  if tables.is_empty() {
    return Err(NestorError::data_load("no delimited files could be parsed"));
  }

  let table = merge(tables, plan);
  debug!(rows = table.len(), columns = table.columns().len(), "loaded property table");
  Ok(table)
}

/// Merge named tables into one.
///
/// Tables named in the plan come first, in plan order, followed by the rest
/// in their given order. The first table with a join key is the base and
/// every other table is left-joined onto it. Tables that cannot be linked
/// are left out with a warning. When nothing links at all, the tables are
/// combined side by side instead.
pub fn merge(tables: Vec<(String, Table)>, plan: &JoinPlan) -> Table {
  let mut tables: Vec<(String, Table)> = tables
    .into_iter()
    .map(|(name, table)| {
      let table = plan.rename_id(&name, table);
      (name, table)
    })
    .collect();
  tables.sort_by_key(|(name, _)| plan.position(name).unwrap_or(usize::MAX));

  let Some(base) = tables.iter().position(|(name, table)| plan.is_keyed(name, table)) else {
    return concat_all(tables);
  };
  let (base_name, mut merged) = tables.remove(base);

  let mut joined = 0;
  let mut unlinked = Vec::new();
  for (name, table) in tables {
    match plan.join_columns(&merged, &name, &table) {
      Some((left_key, right_key)) => {
        debug!(table = %name, %left_key, %right_key, "joining table");
        merged = left_join(&merged, &left_key, &table, &right_key);
        joined += 1;
      }
      None => unlinked.push((name, table)),
    }
  }

  if joined == 0 && !unlinked.is_empty() {
    unlinked.insert(0, (base_name, merged));
    return concat_all(unlinked);
  }

  for (name, _) in &unlinked {
    warn!("Leaving out table '{name}': no join key links it to '{base_name}'");
  }
  merged
}

fn concat_all(tables: Vec<(String, Table)>) -> Table {
  let mut iter = tables.into_iter().map(|(_, table)| table);
  let Some(first) = iter.next() else {
    return Table::empty();
  };
  iter.fold(first, |merged, table| concat_columns(&merged, &table))
}

/// One output row per matching right row; unmatched left rows are kept.
/// Left cells are never overwritten.
pub fn left_join(left: &Table, left_key: &str, right: &Table, right_key: &str) -> Table {
  let mut index: HashMap<String, Vec<&Record>> = HashMap::new();
  for row in right.rows() {
    if let Some(key) = row.get(right_key) {
      index.entry(key.as_text()).or_default().push(row);
    }
  }

  let mut rows = Vec::with_capacity(left.len());
  for row in left.rows() {
    let matches = row.get(left_key).and_then(|key| index.get(&key.as_text()));
    match matches {
      Some(matches) => {
        for matched in matches {
          let mut joined = row.clone();
          joined.absorb(matched);
          rows.push(joined);
        }
      }
      None => rows.push(row.clone()),
    }
  }

  Table::new(combined_columns(left, right), rows)
}

/// Row i of the result combines row i of each side. The result is as long
/// as the longer table.
pub fn concat_columns(left: &Table, right: &Table) -> Table {
  if left.len() != right.len() {
    warn!(
      "Combining tables without a join key but with different row counts ({} vs {}); rows are aligned by position",
      left.len(),
      right.len()
    );
  }

  let length = left.len().max(right.len());
  let rows = (0..length)
    .map(|i| {
      let mut row = left.rows().get(i).cloned().unwrap_or_default();
      if let Some(other) = right.rows().get(i) {
        row.absorb(other);
      }
      row
    })
    .collect();

  Table::new(combined_columns(left, right), rows)
}

fn combined_columns(left: &Table, right: &Table) -> Vec<String> {
  left.columns().iter().chain(right.columns()).cloned().collect()
}

/// Memoized table for one data directory.
///
/// Loads lazily and keeps the result until [`TableCache::invalidate`] is
/// called. Failed loads are not cached.
#[derive(Debug)]
pub struct TableCache {
  dir: PathBuf,
  plan: JoinPlan,
  table: Option<Table>,
}

impl TableCache {
  pub fn new(dir: impl Into<PathBuf>, plan: JoinPlan) -> Self {
    Self { dir: dir.into(), plan, table: None }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn is_loaded(&self) -> bool {
    self.table.is_some()
  }

  pub fn get_or_load(&mut self) -> Result<&Table> {
    if self.table.is_none() {
      self.table = Some(load_dir(&self.dir, &self.plan)?);
    }

    match &self.table {
      Some(table) => Ok(table),
      None => Err(NestorError::data_load("table cache is empty")),
    }
  }

  pub fn invalidate(&mut self) {
    self.table = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn plan() -> JoinPlan {
    JoinPlan::default()
  }

  fn named(name: &str, content: &str) -> (String, Table) {
    (name.to_string(), parse_delimited(content, b',').unwrap())
  }

  fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
  }

  fn text(table: &Table, row: usize, column: &str) -> Option<String> {
    table.rows()[row].get(column).map(|value| value.as_text())
  }

  #[test]
  fn test_headers_are_trimmed_and_lowercased() {
    let table = parse_delimited(" ProjectName , Price \nSea Breeze,1.2 Cr\n", b',').unwrap();
    assert_eq!(table.columns(), &["projectname".to_string(), "price".to_string()]);
    assert_eq!(text(&table, 0, "price").as_deref(), Some("1.2 Cr"));
  }

  #[test]
  fn test_delimiter_sniffing() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let semicolon = write(&dir, "a.csv", "name;city\nSea Breeze;Mumbai\n");
    let tab = write(&dir, "b.tsv", "name\tcity\nHill Crest\tPune\n");
    let pipe = write(&dir, "c.psv", "name|city\nRiver Side|Pune\n");

    assert_eq!(read_table(&semicolon)?.delimiter, b';');
    assert_eq!(read_table(&tab)?.delimiter, b'\t');
    assert_eq!(read_table(&pipe)?.delimiter, b'|');
    Ok(())
  }

  #[test]
  fn test_single_column_file_is_unreadable() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "notes.txt", "just one column\nhello\n");
    assert!(matches!(read_table(&path), Err(NestorError::DataLoad { .. })));
  }

  #[test]
  fn test_missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let result = read_table(&dir.path().join("nope.csv"));
    assert!(result.unwrap_err().to_string().contains("Missing file"));
  }

  #[test]
  fn test_empty_directory_fails_with_data_load() {
    let dir = TempDir::new().unwrap();
    let result = load_dir(dir.path(), &plan());
    assert!(matches!(result, Err(NestorError::DataLoad { .. })));
  }

  #[test]
  fn test_unreadable_files_are_skipped() -> Result<()> {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.csv", "single\nvalue\n");
    write(&dir, "good.csv", "name,city\nSea Breeze,Mumbai\n");
    write(&dir, "ignored.json", "{}");

    let table = load_dir(dir.path(), &plan())?;
    assert_eq!(table.len(), 1);
    Ok(())
  }

  #[test]
  fn test_left_join_on_shared_key() -> Result<()> {
    let dir = TempDir::new().unwrap();
    write(&dir, "1_project.csv", "project_id,projectname\n1,Sea Breeze\n2,Hill Crest\n3,Lonely\n");
    write(&dir, "2_address.csv", "projectid,fulladdress\n1,Andheri Mumbai\n2,Baner Pune\n");
    write(&dir, "3_config.csv", "projectid,type,price\n1,2 BHK,1.2 Cr\n1,3 BHK,2 Cr\n2,2 BHK,45 L\n");

    let table = load_dir(dir.path(), &plan())?;
    assert_eq!(table.len(), 4);
    assert_eq!(text(&table, 0, "fulladdress").as_deref(), Some("Andheri Mumbai"));
    assert_eq!(text(&table, 1, "type").as_deref(), Some("3 BHK"));
    assert_eq!(text(&table, 2, "projectname").as_deref(), Some("Hill Crest"));
    assert_eq!(text(&table, 3, "projectname").as_deref(), Some("Lonely"));
    assert_eq!(text(&table, 3, "price"), None);
    assert!(table.has_column("price"));
    Ok(())
  }

  #[test]
  fn test_concat_without_join_key_pads_shorter_table() {
    let left = named("listing", "name,city\nA,Pune\nB,Mumbai\n");
    let right = named("pricing", "price,area\n45 L,900\n");

    let merged = merge(vec![left, right], &plan());
    assert_eq!(merged.len(), 2);
    assert_eq!(text(&merged, 0, "price").as_deref(), Some("45 L"));
    assert_eq!(text(&merged, 1, "price"), None);
    assert_eq!(merged.columns().len(), 4);
  }

  #[test]
  fn test_duplicate_columns_keep_first() {
    let left = named("left", "project_id,name\n1,Left\n");
    let right = named("right", "project_id,name\n1,Right\n");

    let merged = merge(vec![left, right], &plan());
    assert_eq!(merged.columns(), &["project_id".to_string(), "name".to_string()]);
    assert_eq!(text(&merged, 0, "name").as_deref(), Some("Left"));
  }

  #[test]
  fn test_repeated_header_never_shadows_first_column() {
    let table = parse_delimited("name,price,price\nSea Breeze,,1.2 Cr\n", b',').unwrap();
    assert_eq!(table.columns(), &["name".to_string(), "price".to_string()]);
    assert_eq!(text(&table, 0, "price"), None);
  }

  #[test]
  fn test_listing_export_layout_links_by_id() -> Result<()> {
    let dir = TempDir::new().unwrap();
    write(&dir, "project.csv", "id,ProjectName\n1,Hill Crest\n2,Sea Breeze\n");
    write(&dir, "ProjectAddress.csv", "id,ProjectId,FullAddress\n10,2,Andheri Mumbai\n11,1,Baner Pune\n");
    write(&dir, "ProjectConfiguration.csv", "id,projectid,type\n20,2,3 BHK\n21,1,2 BHK\n");
    write(&dir, "ProjectConfigurationVariant.csv", "id,configurationid,price\n30,21,45 L\n31,20,1.8 Cr\n");

    let table = load_dir(dir.path(), &plan())?;
    assert_eq!(table.len(), 2);
    assert!(table.has_column("project_id"));
    assert!(table.has_column("address_id"));
    assert!(table.has_column("config_id"));
    assert!(table.has_column("variant_id"));
    assert!(!table.has_column("id"));

    assert_eq!(text(&table, 0, "projectname").as_deref(), Some("Hill Crest"));
    assert_eq!(text(&table, 0, "fulladdress").as_deref(), Some("Baner Pune"));
    assert_eq!(text(&table, 0, "type").as_deref(), Some("2 BHK"));
    assert_eq!(text(&table, 0, "price").as_deref(), Some("45 L"));
    assert_eq!(text(&table, 1, "projectname").as_deref(), Some("Sea Breeze"));
    assert_eq!(text(&table, 1, "fulladdress").as_deref(), Some("Andheri Mumbai"));
    assert_eq!(text(&table, 1, "price").as_deref(), Some("1.8 Cr"));
    Ok(())
  }

  #[test]
  fn test_unlinked_table_is_left_out_when_others_join() {
    let project = named("1_project", "project_id,name\n1,Hill Crest\n2,Sea Breeze\n");
    let address = named("2_address", "projectid,fulladdress\n2,Andheri Mumbai\n1,Baner Pune\n");
    let notes = named("3_notes", "note,author\nrenovated,agent\nnew,owner\n");

    let merged = merge(vec![project, address, notes], &plan());
    assert_eq!(merged.len(), 2);
    assert_eq!(text(&merged, 0, "fulladdress").as_deref(), Some("Baner Pune"));
    assert!(!merged.has_column("note"));
  }

  #[test]
  fn test_configured_link_overrides_default_keys() {
    let plan = JoinPlan {
      keys: vec![],
      links: vec![
        TableLink::base("towers", "tower_id"),
        TableLink::joined("units", "unit_id", "tower_id", "towerref"),
      ],
    };
    let units = named("units", "id,towerref,type\n7,b,3 BHK\n8,a,2 BHK\n");
    let towers = named("towers", "id,name\na,North\nb,South\n");

    let merged = merge(vec![units, towers], &plan);
    assert_eq!(merged.columns()[0], "tower_id");
    assert_eq!(text(&merged, 0, "type").as_deref(), Some("2 BHK"));
    assert_eq!(text(&merged, 1, "unit_id").as_deref(), Some("7"));
  }

  #[test]
  fn test_table_name_normalization() {
    assert_eq!(table_name("ProjectAddress"), "projectaddress");
    assert_eq!(table_name("project_configuration-variant"), "projectconfigurationvariant");
  }

  #[test]
  fn test_cache_memoizes_until_invalidated() -> Result<()> {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.csv", "name,city\nSea Breeze,Mumbai\n");

    let mut cache = TableCache::new(dir.path(), plan());
    assert!(!cache.is_loaded());
    assert_eq!(cache.get_or_load()?.len(), 1);

    write(&dir, "b.csv", "name,city\nHill Crest,Pune\nRiver Side,Pune\n");
    assert_eq!(cache.get_or_load()?.len(), 1);

    cache.invalidate();
    assert_eq!(cache.get_or_load()?.len(), 2);
    Ok(())
  }

  #[test]
  fn test_failed_load_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let mut cache = TableCache::new(dir.path(), plan());
    assert!(cache.get_or_load().is_err());

    write(&dir, "a.csv", "name,city\nSea Breeze,Mumbai\n");
    assert!(cache.get_or_load().is_ok());
  }
}
