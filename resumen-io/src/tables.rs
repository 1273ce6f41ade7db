//! Client for the hosted table-recognition API.
//!
//! The PDF is submitted once; the service answers with a check URL that is
//! polled until the recognised tables are ready:
//!
//!   POST {base_url}/api/v1/table_rec   (multipart `file`, header X-Api-Key)
//!   GET  {request_check_url}           -> {status, pages: [{tables: [{cells}]}]}

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use resumen_core::{StatementError, TableCell};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecognitionConfig {
    pub base_url: String,
    pub api_key: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for TableRecognitionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.datalab.to".to_string(),
            api_key: String::new(),
            poll_interval: Duration::from_secs(2),
            max_polls: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Submitted {
    request_check_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Polled {
    status: String,
    #[serde(default)]
    pages: Vec<RecognizedPage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizedPage {
    #[serde(default)]
    pub tables: Vec<RecognizedTable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizedTable {
    #[serde(default)]
    pub cells: Vec<RecognizedCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizedCell {
    pub row_ids: Vec<u32>,
    pub col_ids: Vec<u32>,
    #[serde(default)]
    pub order: u32,
    pub text: String,
}

fn extraction(context: &str, err: impl std::fmt::Display) -> StatementError {
    StatementError::Extraction(format!("{context}: {err}"))
}

pub struct TableRecognitionClient {
    http: reqwest::Client,
    config: TableRecognitionConfig,
}

impl TableRecognitionClient {
    pub fn new(config: TableRecognitionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v1/table_rec", self.config.base_url.trim_end_matches('/'))
    }

    /// Submit `pdf` and wait for its tables. Not retried on failure.
    pub async fn recognize(&self, pdf: Vec<u8>) -> Result<Vec<TableCell>, StatementError> {
        if self.config.api_key.is_empty() {
            return Err(StatementError::Extraction(
                "table recognition api key is not configured".to_string(),
            ));
        }

        let part = Part::bytes(pdf)
            .file_name("statement.pdf")
            .mime_str("application/pdf")
            .map_err(|e| extraction("build upload", e))?;
        let resp = self
            .http
            .post(self.endpoint())
            .header("X-Api-Key", &self.config.api_key)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| extraction("submit table recognition", e))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(StatementError::Extraction(format!("table recognition error: {status} {txt}")));
        }
        let submitted: Submitted = resp.json().await.map_err(|e| extraction("parse submit response", e))?;
        let check_url = match (submitted.request_check_url, submitted.error) {
            (Some(url), _) => url,
            (None, error) => {
                return Err(StatementError::Extraction(format!(
                    "table recognition rejected the document: {}",
                    error.unwrap_or_default()
                )));
            }
        };
        info!(check_url = %check_url, "table recognition submitted");

        for attempt in 1..=self.config.max_polls {
            tokio::time::sleep(self.config.poll_interval).await;
            let polled: Polled = self
                .http
                .get(&check_url)
                .header("X-Api-Key", &self.config.api_key)
                .send()
                .await
                .map_err(|e| extraction("poll table recognition", e))?
                .json()
                .await
                .map_err(|e| extraction("parse poll response", e))?;
            debug!(attempt, status = %polled.status, "table recognition poll");

            match polled.status.as_str() {
                "complete" if !polled.pages.is_empty() => {
                    let tables: Vec<RecognizedTable> =
                        polled.pages.into_iter().flat_map(|p| p.tables).collect();
                    return Ok(cells_from_tables(&tables));
                }
                "failed" => {
                    return Err(StatementError::Extraction(format!(
                        "table recognition failed: {}",
                        polled.error.unwrap_or_default()
                    )));
                }
                _ => {}
            }
        }
        Err(StatementError::Extraction(format!(
            "table recognition timed out after {} polls",
            self.config.max_polls
        )))
    }
}

/// Flatten recognised tables into cells, in document order.
///
/// A cell spanning several rows or columns is copied into every position it
/// covers. Tables keep their position in the document as both index and
/// reading order, and rows come out in row-id order within a table.
pub fn cells_from_tables(tables: &[RecognizedTable]) -> Vec<TableCell> {
    let mut out = Vec::new();
    for (position, table) in tables.iter().enumerate() {
        let position = position as u32;
        let mut grid: BTreeMap<(u32, u32), &str> = BTreeMap::new();
        let mut cells: Vec<&RecognizedCell> = table.cells.iter().collect();
        cells.sort_by_key(|c| c.order);
        for cell in cells {
            for &row in &cell.row_ids {
                for &col in &cell.col_ids {
                    grid.insert((row, col), cell.text.trim());
                }
            }
        }
        out.extend(
            grid.into_iter()
                .map(|((row, col), text)| TableCell::new(row, col, text).in_table(position, position)),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumen_core::group_table_rows;

    const POLL_RESPONSE: &str = r#"{
        "status": "complete",
        "pages": [
            {"tables": [{"cells": [
                {"row_ids": [0], "col_ids": [0], "order": 0, "text": "Fecha "},
                {"row_ids": [0], "col_ids": [1, 2], "order": 1, "text": "Descripción"},
                {"row_ids": [1], "col_ids": [0], "order": 2, "text": "01/03/24"},
                {"row_ids": [1], "col_ids": [1], "order": 3, "text": "PAGO VISA"}
            ]}]},
            {"tables": [{"cells": [
                {"row_ids": [0, 1], "col_ids": [0], "order": 0, "text": "02/03/24"}
            ]}]}
        ]
    }"#;

    #[test]
    fn test_cells_from_tables_replicates_spans() {
        let polled: Polled = serde_json::from_str(POLL_RESPONSE).unwrap();
        let tables: Vec<RecognizedTable> = polled.pages.into_iter().flat_map(|p| p.tables).collect();
        let cells = cells_from_tables(&tables);
        assert_eq!(cells.len(), 7);

        let rows = group_table_rows(&cells);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].text(0), "Fecha");
        assert_eq!(rows[0].text(1), "Descripción");
        assert_eq!(rows[0].text(2), "Descripción");
        assert_eq!(rows[1].text(1), "PAGO VISA");
        assert_eq!(rows[2].table_order, 1);
        assert_eq!(rows[3].text(0), "02/03/24");
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = TableRecognitionClient::new(TableRecognitionConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        });
        assert_eq!(client.endpoint(), "http://localhost:8080/api/v1/table_rec");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let client = TableRecognitionClient::new(TableRecognitionConfig::default());
        let err = client.recognize(b"%PDF-1.4".to_vec()).await.unwrap_err();
        assert!(matches!(err, StatementError::Extraction(_)));
    }
}
