pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Typed request from `--input <file.json>`, else from piped stdin.
/// `None` means the caller should fall back to individual flags.
pub fn read_request<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_json(path)?));
    }
    stdin::read_stdin()
}
