use std::{io::Read, path::Path};

use tracing::{debug, info};

use crate::Error;

/// Column names of the observation table.
pub mod columns {
    pub const YEAR: &str = "ano";
    pub const TREAT: &str = "treat";
    pub const POST: &str = "post";
    pub const LOG_INCOME: &str = "log_renda";
    pub const WEIGHT: &str = "peso_amostral";
    pub const REGION: &str = "UF";
    pub const AGE: &str = "idade";
    pub const SEX: &str = "sexo";
    pub const RACE: &str = "cor_raca";
}

/// A column-major table of raw CSV fields. Fields are kept as text and only
/// parsed when a column is first used, so a missing or malformed column is
/// reported by the operation that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    colnames: Vec<String>,
    columns: Vec<Vec<String>>,
    nrows: usize,
}

#[inline(always)]
pub(crate) fn is_missing(field: &str) -> bool {
    field.is_empty() || field == "NA" || field == "NaN" || field == "nan"
}

impl Frame {
    /// Read a comma-separated file with a header row. Paths ending in `.gz`
    /// are decompressed.
    #[tracing::instrument]
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let gz = path.extension().is_some_and(|e| e == "gz");
        let frame = if gz {
            Self::from_reader(flate2::read::GzDecoder::new(file))?
        } else {
            Self::from_reader(std::io::BufReader::new(file))?
        };
        info!(
            rows = frame.nrows(),
            cols = frame.ncols(),
            "Read {}",
            path.display()
        );
        Ok(frame)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let colnames = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();
        let mut columns = vec![Vec::new(); colnames.len()];
        for record in reader.records() {
            let record = record?;
            for (col, field) in columns.iter_mut().zip(record.iter()) {
                col.push(field.to_string());
            }
        }
        let nrows = columns.first().map(Vec::len).unwrap_or(0);
        debug!(nrows, "Parsed csv records");
        Ok(Self {
            colnames,
            columns,
            nrows,
        })
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.colnames.len()
    }

    #[inline]
    pub fn colnames(&self) -> &[String] {
        &self.colnames
    }

    pub fn column(&self, name: &str) -> Result<&[String], Error> {
        self.colnames
            .iter()
            .position(|c| c == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| Error::ColumnNameNotFound(name.to_string()))
    }

    /// Parse a column as `f64`. Missing fields become `NaN`.
    pub fn numeric(&self, name: &str) -> Result<Vec<f64>, Error> {
        self.column(name)?
            .iter()
            .enumerate()
            .map(|(row, field)| {
                if is_missing(field) {
                    Ok(f64::NAN)
                } else {
                    field.parse::<f64>().map_err(|_| Error::InvalidValue {
                        column: name.to_string(),
                        row: row + 1,
                        value: field.clone(),
                    })
                }
            })
            .collect()
    }

    /// Parse a 0/1 column. Missing fields become `None`; anything other than
    /// 0 or 1 is an error.
    pub fn indicator(&self, name: &str) -> Result<Vec<Option<bool>>, Error> {
        self.numeric(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                if v.is_nan() {
                    Ok(None)
                } else if v == 0.0 {
                    Ok(Some(false))
                } else if v == 1.0 {
                    Ok(Some(true))
                } else {
                    Err(Error::InvalidIndicator {
                        column: name.to_string(),
                        row: row + 1,
                        value: v,
                    })
                }
            })
            .collect()
    }

    /// A column treated as category labels. Missing fields become `None`.
    pub fn categorical(&self, name: &str) -> Result<Vec<Option<&str>>, Error> {
        Ok(self
            .column(name)?
            .iter()
            .map(|f| (!is_missing(f)).then_some(f.as_str()))
            .collect())
    }
}
