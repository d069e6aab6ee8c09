//! services/api/src/bin/openapi.rs
//!
//! Writes the reading tracker's OpenAPI document for client generation.
//!
//! The output path is the first argument, else `OPENAPI_OUTPUT` (read through
//! `.env` like the server's settings), else `openapi.json`.

use api_lib::{error::ApiError, web::rest::openapi_document};
use std::path::PathBuf;

fn output_path() -> PathBuf {
    dotenvy::dotenv().ok();
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("OPENAPI_OUTPUT").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"))
}

fn main() -> Result<(), ApiError> {
    let path = output_path();
    let doc = openapi_document();
    let json = doc
        .to_pretty_json()
        .map_err(|e| ApiError::Internal(format!("Failed to serialize OpenAPI document: {}", e)))?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, json)?;
    println!(
        "Wrote {} v{} ({} paths) to {}",
        doc.info.title,
        doc.info.version,
        doc.paths.paths.len(),
        path.display()
    );
    Ok(())
}
