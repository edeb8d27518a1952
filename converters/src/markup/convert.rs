//! Markup (Pandoc-style) conversion to PDF.

use std::path::Path;

use tokio::process::Command;

use crate::config::Settings;
use crate::error::MarkupError;
use crate::process::run_with_timeout;

/// Convert `input`, tagged with the already-resolved source-format `tag`
/// (e.g. `markdown`, `rst`, `latex`), to PDF.
pub async fn convert(
    executable: &Path,
    settings: &Settings,
    tag: &str,
    input: &[u8],
) -> Result<Vec<u8>, MarkupError> {
    let utf8_input = transcode_to_utf8(input);

    let mut command = Command::new(executable);
    command
        .arg("--from")
        .arg(tag)
        .arg("--pdf-engine=xelatex")
        .arg("--standalone")
        .arg("--to=pdf")
        .arg("-o")
        .arg("-");

    let output = run_with_timeout(command, utf8_input, settings.pdf_render_timeout, None)
        .await
        .map_err(|_| MarkupError::ConvertTimeout)?;

    match output.exit_code {
        Some(0) => Ok(output.stdout),
        other => Err(MarkupError::ConvertFailed {
            exit_code: other,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
    }
}

/// Detect the input's character encoding and transcode to UTF-8 if it
/// isn't already.
fn transcode_to_utf8(input: &[u8]) -> Vec<u8> {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(input, true);
    let encoding = detector.guess(None, true);

    if encoding == encoding_rs::UTF_8 {
        return input.to_vec();
    }

    let (decoded, _, _) = encoding.decode(input);
    decoded.into_owned().into_bytes()
}
