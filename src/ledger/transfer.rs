use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::entities::{CoinsByDate, PartialLedger, Settings};

pub const EXPORT_VERSION: &str = "1.0";
pub const EXPORT_FILE_PREFIX: &str = "gold_coin_export_";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read import file")]
    Read(#[source] std::io::Error),
    #[error("import failed: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid data format")]
    InvalidFormat,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Document produced by an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_time: DateTime<Utc>,
    pub data: ExportData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub all_coins: CoinsByDate,
    pub settings: Settings,
}

pub fn export_file_name(date_key: &str) -> String {
    format!("{EXPORT_FILE_PREFIX}{date_key}.json")
}

/// Reads an export document. Only the `data` field matters, anything else in the document is
/// ignored, and parts missing from `data` are left as `None`.
pub async fn read_import(mut reader: impl AsyncRead + Unpin) -> Result<PartialLedger, ImportError> {
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .await
        .map_err(ImportError::Read)?;
    parse_import(&buffer)
}

/// An object `data` is read as the ledger parts. Any other non-empty value carries no parts, so
/// nothing gets replaced. Empty values (`null`, `false`, `0`, `""`) are rejected.
pub fn parse_import(bytes: &[u8]) -> Result<PartialLedger, ImportError> {
    let document: serde_json::Value = serde_json::from_slice(bytes).map_err(ImportError::Parse)?;
    match document.get("data") {
        Some(data @ serde_json::Value::Object(_)) => {
            PartialLedger::deserialize(data).map_err(ImportError::Parse)
        }
        Some(data) if is_present(data) => Ok(PartialLedger::default()),
        Some(_) | None => Err(ImportError::InvalidFormat),
    }
}

fn is_present(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(v) => *v,
        Value::Number(v) => v.as_f64().is_some_and(|v| v != 0.0),
        Value::String(v) => !v.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
