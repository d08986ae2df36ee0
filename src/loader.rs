//! CSV loading for match and delivery files.
//!
//! Files are read into [`RawTable`]s laid out by the relation's column
//! list, so the rest of the pipeline never deals with header order.

use crate::cleaning::parse_integer;
use crate::error::PipelineError;
use crate::models::{ColumnKind, RawDataset, RawRow, RawTable, Relation};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Reads CSV sources into raw tables.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    null_tokens: Vec<String>,
}

impl CsvLoader {
    /// Create a loader that treats the given tokens as null cells.
    pub fn new(null_tokens: &[String]) -> Self {
        Self {
            null_tokens: null_tokens.to_vec(),
        }
    }

    /// Load both relations from disk.
    pub fn load_dataset(
        &self,
        matches: &Path,
        deliveries: &Path,
    ) -> Result<RawDataset, PipelineError> {
        Ok(RawDataset {
            matches: self.load_file(Relation::Matches, matches)?,
            deliveries: self.load_file(Relation::Deliveries, deliveries)?,
        })
    }

    /// Load one relation from a file path.
    pub fn load_file(&self, relation: Relation, path: &Path) -> Result<RawTable, PipelineError> {
        let source = path.display().to_string();
        info!("Loading {} from {}", relation, source);

        let file = File::open(path).map_err(|e| PipelineError::DataUnavailable {
            relation,
            path: source.clone(),
            source: csv::Error::from(e),
        })?;

        let table = self.load_from_reader(relation, source, file)?;
        info!("Read {} {} rows", table.rows.len(), relation);
        Ok(table)
    }

    /// Load one relation from any reader; `source` labels errors.
    pub fn load_from_reader<R: Read>(
        &self,
        relation: Relation,
        source: impl Into<String>,
        rdr: R,
    ) -> Result<RawTable, PipelineError> {
        let mut table = RawTable::new(relation, source);
        let unavailable = |source: csv::Error, path: &str| PipelineError::DataUnavailable {
            relation,
            path: path.to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);

        let headers = reader
            .headers()
            .map_err(|e| unavailable(e, &table.source))?
            .clone();

        // Column position in the file for each column of the relation
        let mut positions = Vec::with_capacity(relation.columns().len());
        for (i, column) in relation.columns().iter().enumerate() {
            let position = headers.iter().position(|h| column.matches_header(h));
            if position.is_none() {
                if column.required {
                    return Err(PipelineError::MissingColumn {
                        relation,
                        path: table.source.clone(),
                        column: column.name,
                    });
                }
                debug!("Optional {} column '{}' not present", relation, column.name);
                table.present[i] = false;
            }
            positions.push(position);
        }

        let mut malformed = 0usize;
        for result in reader.records() {
            let record = result.map_err(|e| unavailable(e, &table.source))?;

            let row: RawRow = relation
                .columns()
                .iter()
                .zip(positions.iter().copied())
                .map(|(column, position)| {
                    let cell = position
                        .and_then(|p| record.get(p))
                        .and_then(|value| self.non_null(value))?;

                    if column.kind == ColumnKind::Integer && parse_integer(cell).is_none() {
                        debug!(
                            "Malformed {} value '{}' in {}, treating as null",
                            column.name, cell, relation
                        );
                        malformed += 1;
                        return None;
                    }
                    Some(cell.to_string())
                })
                .collect();

            table.rows.push(row);
        }

        if malformed > 0 {
            info!("{} malformed numeric cells in {} read as null", malformed, relation);
        }

        Ok(table)
    }

    fn non_null<'a>(&self, value: &'a str) -> Option<&'a str> {
        if value.is_empty() || self.null_tokens.iter().any(|t| t == value) {
            None
        } else {
            Some(value)
        }
    }
}
