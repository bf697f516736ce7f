use super::{FormatError, Formatter, Rendered};
use crate::config::OutputFormat;
use crate::document::ServerDoc;

/// Pretty-printed structural dump of the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, doc: &ServerDoc) -> Result<Rendered, FormatError> {
        let mut bytes = serde_json::to_vec_pretty(doc)?;
        bytes.push(b'\n');
        Ok(Rendered::Bytes(bytes))
    }
}
