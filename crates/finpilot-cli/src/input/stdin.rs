use log::info;
use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialise a command's request from piped stdin. Returns `None` when
/// stdin is a terminal or nothing was piped.
pub fn read_request<T: DeserializeOwned>(
    command: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("Failed to read {command} request from stdin: {e}"))?;
    parse_request(&buffer, command)
}

/// Parse a piped request body. A UTF-8 BOM and surrounding whitespace are
/// ignored; an empty body is `None`.
fn parse_request<T: DeserializeOwned>(
    raw: &str,
    command: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let body = raw.trim_start_matches('\u{feff}').trim();
    if body.is_empty() {
        return Ok(None);
    }

    let request = serde_json::from_str(body)
        .map_err(|e| format!("Invalid {command} request on stdin: {e}"))?;
    info!("read {command} request from stdin ({} bytes)", body.len());
    Ok(Some(request))
}
