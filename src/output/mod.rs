use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::tools::ToolResponse;

/// Render a tool response in the requested format
pub fn render(response: &ToolResponse, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => response.text.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(response)?,
    };

    Ok(content)
}

/// Save tool response to file
pub fn save_to_file(response: &ToolResponse, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(response, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print tool response to console
pub fn print_to_console(response: &ToolResponse, format: &OutputFormat) -> Result<()> {
    println!("{}", render(response, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use tempfile::TempDir;

    #[test]
    fn test_render_text_and_json() {
        let response = ToolResponse::success("Hello world\nGoodbye");
        assert_eq!(render(&response, &OutputFormat::Text).unwrap(), "Hello world\nGoodbye");

        let json = render(&response, &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["text"], "Hello world\nGoodbye");
    }

    #[test]
    fn test_save_failure_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let response = ToolResponse::failure(&ToolError::captions_unavailable("no tracks"));

        save_to_file(&response, &path, &OutputFormat::Text).unwrap();
        assert_eq!(
            fs_err::read_to_string(&path).unwrap(),
            "Error (CaptionsUnavailable): no tracks"
        );
    }
}
