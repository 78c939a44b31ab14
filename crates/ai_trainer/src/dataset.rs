//! Profile dataset loading and feature preparation
//!
//! Reads the first CSV file of a dataset directory into a raw table with
//! lowercased headers, then turns each row into a 9-element training
//! vector and a label. Row order is preserved throughout.

use std::fs;
use std::path::{Path, PathBuf};

use profileguard_ai_core::features::{
    derive_label, extract_training_features, required_columns, ProfileRecord, NUMERIC_COLUMNS,
    ORIGIN_COLUMN, PROFILE_IMAGE_COLUMN, SCREEN_NAME_COLUMN, TRAINING_FEATURES,
};
use profileguard_ai_core::{FeatureMatrix, Label};
use tracing::{debug, info, warn};

use crate::errors::{Result, TrainerError};

/// File extension recognised as a tabular dataset
pub const TABULAR_EXTENSION: &str = "csv";

/// Cell contents read as missing values
const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Tabular rows with named columns; `None` marks a missing cell
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Rows dropped while reading because they had too many fields
    pub skipped_rows: usize,
}

impl RawTable {
    /// Build a table from in-memory cells; headers are lowercased
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            headers: headers.iter().map(|h| normalize_header(h)).collect(),
            rows,
            skipped_rows: 0,
        }
    }

    /// Read a CSV file, decoding every byte as Latin-1
    ///
    /// Rows with more fields than the header are skipped and counted;
    /// shorter rows are padded with missing cells.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())?;

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|field| normalize_header(&decode_latin1(field)))
            .collect();

        let mut rows = Vec::new();
        let mut skipped_rows = 0;

        for (record_idx, record) in reader.byte_records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    debug!(record = record_idx + 1, error = %err, "skipping malformed row");
                    skipped_rows += 1;
                    continue;
                }
            };

            if record.len() > headers.len() {
                debug!(
                    record = record_idx + 1,
                    fields = record.len(),
                    expected = headers.len(),
                    "skipping row with extra fields"
                );
                skipped_rows += 1;
                continue;
            }

            let mut row: Vec<Option<String>> =
                record.iter().map(|field| parse_cell(&decode_latin1(field))).collect();
            row.resize(headers.len(), None);
            rows.push(row);
        }

        if skipped_rows > 0 {
            warn!(skipped = skipped_rows, "dropped malformed dataset rows");
        }

        Ok(Self {
            headers,
            rows,
            skipped_rows,
        })
    }

    /// Position of a (lowercase) column, first match wins
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Feature matrix and label vector with row alignment preserved
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedDataset {
    pub features: FeatureMatrix,
    pub labels: Vec<Label>,
    /// Numeric cells that could not be parsed and were read as 0
    pub coerced_cells: usize,
    /// Rows dropped by the reader
    pub skipped_rows: usize,
}

impl PreparedDataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Rows per class, indexed by `Label::index`
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0; 2];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }

    /// Per-feature (min, max)
    pub fn feature_stats(&self) -> Vec<(f64, f64)> {
        let width = self.features.first().map_or(0, Vec::len);
        let mut stats = vec![(f64::INFINITY, f64::NEG_INFINITY); width];

        for row in &self.features {
            for (i, &val) in row.iter().enumerate() {
                stats[i].0 = stats[i].0.min(val);
                stats[i].1 = stats[i].1.max(val);
            }
        }

        stats
    }
}

/// Turns a dataset directory into training vectors and labels
#[derive(Clone, Debug)]
pub struct DatasetPreparer {
    data_dir: PathBuf,
}

impl DatasetPreparer {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Locate, read and prepare the dataset
    pub fn load(&self) -> Result<PreparedDataset> {
        let path = find_tabular_file(&self.data_dir)?;
        info!(path = %path.display(), "reading dataset");

        let table = RawTable::from_csv_path(&path)?;
        Self::prepare(&table)
    }

    /// Derive labels and the 9 training features for every row
    pub fn prepare(table: &RawTable) -> Result<PreparedDataset> {
        let missing: Vec<&str> = required_columns()
            .into_iter()
            .filter(|column| table.column_index(column).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(TrainerError::Schema(format!(
                "dataset is missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let column = |name: &str| table.column_index(name).unwrap_or_default();
        let origin_idx = column(ORIGIN_COLUMN);
        let screen_name_idx = column(SCREEN_NAME_COLUMN);
        let image_idx = column(PROFILE_IMAGE_COLUMN);
        let numeric_idx: Vec<usize> = NUMERIC_COLUMNS.iter().map(|name| column(name)).collect();

        let mut features = Vec::with_capacity(table.len());
        let mut labels = Vec::with_capacity(table.len());
        let mut coerced_cells = 0;

        for row in &table.rows {
            let text = |idx: usize| row.get(idx).cloned().flatten();
            let mut numeric = [None; NUMERIC_COLUMNS.len()];
            for (slot, &idx) in numeric.iter_mut().zip(&numeric_idx) {
                let (value, coerced) = parse_numeric(row.get(idx).and_then(Option::as_deref));
                coerced_cells += coerced as usize;
                *slot = value;
            }

            let record = ProfileRecord {
                dataset: text(origin_idx),
                screen_name: text(screen_name_idx),
                profile_image_url: text(image_idx),
                followers_count: numeric[0],
                friends_count: numeric[1],
                statuses_count: numeric[2],
                favourites_count: numeric[3],
                listed_count: numeric[4],
                protected: numeric[5],
                verified: numeric[6],
            };

            labels.push(derive_label(&record));
            features.push(extract_training_features(&record));
        }

        if coerced_cells > 0 {
            warn!(cells = coerced_cells, "non-numeric feature cells read as 0");
        }

        let dataset = PreparedDataset {
            features,
            labels,
            coerced_cells,
            skipped_rows: table.skipped_rows,
        };
        let [real, fake] = dataset.class_counts();
        info!(rows = dataset.len(), real, fake, "dataset prepared");
        for (name, (min, max)) in TRAINING_FEATURES.iter().zip(dataset.feature_stats()) {
            debug!(feature = *name, min, max, "feature range");
        }
        Ok(dataset)
    }
}

/// First file with the tabular extension, in file-name order
pub fn find_tabular_file(dir: &Path) -> Result<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "dataset directory unreadable");
            return Err(TrainerError::DataSource(dir.to_path_buf()));
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(TABULAR_EXTENSION))
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| TrainerError::DataSource(dir.to_path_buf()))
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').to_lowercase()
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn parse_cell(raw: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Numeric reading of one cell; the flag is set when a present value had
/// to be coerced to 0
fn parse_numeric(cell: Option<&str>) -> (Option<f64>, bool) {
    let Some(raw) = cell else {
        return (None, false);
    };
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("true") {
        return (Some(1.0), false);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return (Some(0.0), false);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => (Some(value), false),
        _ => (Some(0.0), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &str = "ID,Dataset,Screen_Name,Profile_Image_Url_Https,Followers_Count,\
Friends_Count,Statuses_Count,Favourites_Count,Listed_Count,Protected,Verified";

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> Result<PathBuf> {
        let path = dir.join(name);
        let mut file = fs::File::create(&path)?;
        writeln!(file, "{HEADER}")?;
        for row in rows {
            writeln!(file, "{row}")?;
        }
        file.flush()?;
        Ok(path)
    }

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| parse_cell(v)).collect()
    }

    #[test]
    fn test_prepare_bot_row() -> Result<()> {
        let table = RawTable::new(
            HEADER.split(',').map(str::to_string).collect(),
            vec![cells(&["1", "fake", "bot123", "", "3", "900", "4", "", "0", "False", "False"])],
        );

        let dataset = DatasetPreparer::prepare(&table)?;
        assert_eq!(dataset.labels, vec![Label::Fake]);
        assert_eq!(
            dataset.features[0],
            vec![3.0, 900.0, 4.0, 0.0, 0.0, 6.0, 0.0, 0.0, 0.0]
        );
        let stats = dataset.feature_stats();
        assert_eq!(stats.len(), TRAINING_FEATURES.len());
        assert_eq!(stats[1], (900.0, 900.0));
        Ok(())
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let table = RawTable::new(
            vec!["dataset".to_string(), "screen_name".to_string()],
            vec![cells(&["fake", "bot"])],
        );
        let err = DatasetPreparer::prepare(&table).unwrap_err();
        assert!(matches!(err, TrainerError::Schema(ref msg) if msg.contains("followers_count")));
    }

    #[test]
    fn test_load_from_directory() -> Result<()> {
        let dir = tempdir()?;
        write_csv(
            dir.path(),
            "profiles.csv",
            &[
                "1,real,alice,https://img/a.png,120,80,900,30,2,False,True",
                "2,FAKE,,,1,500,3,0,0,False,False",
                "3,real,bob,https://img/b.png,lots,10,20,1,0,True,False",
            ],
        )?;

        let dataset = DatasetPreparer::new(dir.path()).load()?;
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.labels, vec![Label::Real, Label::Fake, Label::Real]);
        assert_eq!(dataset.features[0][8], 1.0);
        // missing screen name renders as "nan"
        assert_eq!(dataset.features[1][5], 3.0);
        assert_eq!(dataset.features[1][6], 0.0);
        assert_eq!(dataset.features[2][0], 0.0);
        assert_eq!(dataset.features[2][7], 1.0);
        assert_eq!(dataset.coerced_cells, 1);
        Ok(())
    }

    #[test]
    fn test_first_csv_in_name_order() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("readme.txt"), "not a table")?;
        write_csv(dir.path(), "b_users.csv", &[])?;
        let first = write_csv(dir.path(), "a_users.CSV", &[])?;

        assert_eq!(find_tabular_file(dir.path())?, first);
        Ok(())
    }

    #[test]
    fn test_no_tabular_file_is_data_source_error() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("notes.json"), "{}")?;

        let err = DatasetPreparer::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, TrainerError::DataSource(_)));

        let gone = dir.path().join("missing");
        assert!(matches!(
            find_tabular_file(&gone),
            Err(TrainerError::DataSource(_))
        ));
        Ok(())
    }

    #[test]
    fn test_bad_rows_skipped_and_latin1_decoded() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("users.csv");
        let mut bytes = format!("{HEADER}\n").into_bytes();
        bytes.extend_from_slice(b"1,real,Ren\xe9,https://img/r.png,5,5,5,5,0,False,False\n");
        bytes.extend_from_slice(b"2,fake,x,,1,1,1,1,0,False,False,extra\n");
        bytes.extend_from_slice(b"3,fake,short\n");
        fs::write(&path, bytes)?;

        let table = RawTable::from_csv_path(&path)?;
        assert_eq!(table.skipped_rows, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][2].as_deref(), Some("René"));
        assert_eq!(table.rows[1][3], None);

        let dataset = DatasetPreparer::prepare(&table)?;
        assert_eq!(dataset.features[0][5], 4.0);
        assert_eq!(dataset.features[1][0..5], [0.0; 5]);
        Ok(())
    }

    #[test]
    fn test_feature_stats() {
        let dataset = PreparedDataset {
            features: vec![vec![1.0, 5.0], vec![3.0, -2.0]],
            labels: vec![Label::Real, Label::Fake],
            coerced_cells: 0,
            skipped_rows: 0,
        };
        assert_eq!(dataset.feature_stats(), vec![(1.0, 3.0), (-2.0, 5.0)]);
        assert_eq!(dataset.class_counts(), [1, 1]);
    }
}
