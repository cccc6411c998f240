use std::io::Read;

/// Name of the target column in training and evaluation uploads.
pub const TARGET_COLUMN: &str = "Loan_Status";
/// Identifier column carried by the upstream CSV exports; never a feature.
pub const ID_COLUMN: &str = "Loan_ID";

/// An in-memory tabular record set: named columns and rows of optional raw
/// cells. Missing cells come from empty CSV fields or JSON nulls.
///
/// A `Dataset` is constructed per request and consumed by the encoder; it is
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    /// Parses a CSV byte stream with a header row. Empty cells become missing.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect();
            // Short rows pad with missing so every row matches the header.
            row.resize(columns.len(), None);
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    /// Builds a single-row dataset from `(column, value)` pairs.
    pub fn from_row(cells: Vec<(String, Option<String>)>) -> Self {
        let (columns, row): (Vec<_>, Vec<_>) = cells.into_iter().unzip();
        Self {
            columns,
            rows: vec![row],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Removes a column and returns its cells, or `None` if absent.
    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Option<String>>> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        Some(self.rows.iter_mut().map(|row| row.remove(idx)).collect())
    }

    /// Splits off the `Loan_Status` column as binary labels.
    ///
    /// `Y` maps to 1, anything else (including missing) to 0; unmapped label
    /// values are intentionally unguarded.
    pub fn take_labels(&mut self) -> Option<Vec<u8>> {
        let cells = self.drop_column(TARGET_COLUMN)?;
        Some(
            cells
                .iter()
                .map(|cell| u8::from(cell.as_deref() == Some("Y")))
                .collect(),
        )
    }
}
