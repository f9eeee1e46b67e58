pub mod file;

use std::io::Read;

use serde::de::DeserializeOwned;

/// `--input <file>` if given, else piped stdin, else `None`.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_json(path)?));
    }
    let Some(body) = piped_stdin()? else {
        return Ok(None);
    };
    let parsed = serde_json::from_str(&body).map_err(|e| format!("stdin is not valid input JSON: {e}"))?;
    Ok(Some(parsed))
}

/// Whatever was piped in, trimmed. A terminal or blank stdin counts as no input.
fn piped_stdin() -> std::io::Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut body = String::new();
    std::io::stdin().lock().read_to_string(&mut body)?;
    let body = body.trim();
    Ok((!body.is_empty()).then(|| body.to_string()))
}
