pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Read a command's JSON input from `--input <file>` or piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        file::read_json(path)
    } else if let Some(request) = stdin::read_request(command)? {
        Ok(request)
    } else {
        Err(format!("--input <file.json> or stdin required for {command}").into())
    }
}
