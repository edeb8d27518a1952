//! Request dispatcher: type determination and routing by media type.

use crate::error::ConvertError;
use crate::resource::Resource;

/// A validated, not-yet-routed upload: one input file, its resources, and
/// an optional client-supplied type hint.
pub struct Upload {
    pub input_bytes: Vec<u8>,
    pub input_name: String,
    pub input_mime: Option<String>,
    pub resources: Vec<Resource>,
    pub declared_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Html,
    Office,
    PdfPassthrough,
    Markup,
}

const MIME_TABLE: &[(&str, &str)] = &[
    ("text/html", "html"),
    ("application/pdf", "pdf"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    ("application/rtf", "rtf"),
    ("application/vnd.oasis.opendocument.text", "odt"),
    ("text/markdown", "markdown"),
    ("text/x-rst", "rst"),
    ("application/x-latex", "latex"),
    ("text/csv", "csv"),
    ("text/tab-separated-values", "tsv"),
    ("application/epub+zip", "epub"),
    ("application/x-ipynb+json", "ipynb"),
    ("text/org", "org"),
    ("text/x-textile", "textile"),
];

const EXTENSION_TABLE: &[(&str, &str)] = &[
    (".html", "html"),
    (".htm", "html"),
    (".pdf", "pdf"),
    (".docx", "docx"),
    (".xlsx", "xlsx"),
    (".pptx", "pptx"),
    (".rtf", "rtf"),
    (".odt", "odt"),
    (".md", "markdown"),
    (".markdown", "markdown"),
    (".rst", "rst"),
    (".tex", "latex"),
    (".csv", "csv"),
    (".tsv", "tsv"),
    (".epub", "epub"),
    (".ipynb", "ipynb"),
    (".org", "org"),
    (".textile", "textile"),
];

const OFFICE_TAGS: &[&str] = &["rtf", "docx", "xlsx", "pptx", "opendocument", "odt"];

const MARKUP_TAGS: &[&str] = &[
    "markdown", "rst", "latex", "csv", "tsv", "epub", "ipynb", "org", "textile",
];

fn is_recognized_tag(tag: &str) -> bool {
    tag == "html" || tag == "pdf" || OFFICE_TAGS.contains(&tag) || MARKUP_TAGS.contains(&tag)
}

fn tag_from_mime(mime: &str) -> Option<&'static str> {
    MIME_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == mime)
        .map(|(_, tag)| *tag)
}

fn tag_from_extension(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| lower.ends_with(*ext))
        .map(|(_, tag)| *tag)
}

/// The normalized source-format tag chosen after consulting the client
/// hint, MIME, and extension. Only tags recognized by the MIME/extension
/// tables are accepted; an unrecognized client-supplied `type` is rejected
/// rather than forwarded to a backend verbatim.
pub fn effective_type(upload: &Upload) -> Result<String, ConvertError> {
    let declared = upload
        .input_mime
        .as_deref()
        .and_then(tag_from_mime)
        .or_else(|| tag_from_extension(&upload.input_name));

    let resolved = match (&upload.declared_type, declared) {
        (Some(client_type), Some(declared)) if client_type.as_str() != declared => {
            return Err(ConvertError::UnsupportedMedia(format!(
                "client type {client_type:?} contradicts declared type {declared:?}"
            )));
        }
        (Some(client_type), _) => client_type.clone(),
        (None, Some(declared)) => declared.to_string(),
        (None, None) => {
            return Err(ConvertError::UnsupportedMedia(
                "could not determine a source type".to_string(),
            ));
        }
    };

    if is_recognized_tag(&resolved) {
        Ok(resolved)
    } else {
        Err(ConvertError::UnsupportedMedia(format!(
            "unrecognized source type {resolved:?}"
        )))
    }
}

/// Route by `effective_type`. Unknown tags have already been ruled out by
/// the caller having obtained `effective_type` successfully; anything not
/// matching one of the first three routes falls through to `Markup`, since
/// any recognized non-office non-html non-pdf tag is, by construction of
/// the tables above, a markup tag.
pub fn route(effective_type: &str) -> Route {
    if effective_type == "html" {
        Route::Html
    } else if effective_type == "pdf" {
        Route::PdfPassthrough
    } else if OFFICE_TAGS.contains(&effective_type) {
        Route::Office
    } else {
        Route::Markup
    }
}

/// Validate the multipart shape itself (missing or multiple `input`, too
/// many `resources`, non-string `type` are caught upstream at the
/// multipart-extraction layer in the `gateway` crate; this checks the
/// bounds that depend on configuration).
pub fn validate_resource_count(count: usize, max_resource_count: usize) -> Result<(), ConvertError> {
    if count > max_resource_count {
        return Err(ConvertError::Validation(format!(
            "resource count {count} exceeds the limit of {max_resource_count}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(mime: Option<&str>, name: &str, declared_type: Option<&str>) -> Upload {
        Upload {
            input_bytes: vec![],
            input_name: name.to_string(),
            input_mime: mime.map(str::to_string),
            resources: vec![],
            declared_type: declared_type.map(str::to_string),
        }
    }

    #[test]
    fn mime_takes_precedence_over_extension() {
        let u = upload(Some("text/html"), "doc.md", None);
        assert_eq!(effective_type(&u).unwrap(), "html");
    }

    #[test]
    fn falls_back_to_extension_when_mime_unknown() {
        let u = upload(Some("application/octet-stream"), "note.rst", None);
        assert_eq!(effective_type(&u).unwrap(), "rst");
    }

    #[test]
    fn client_type_matching_declared_type_is_accepted() {
        let u = upload(Some("text/markdown"), "note.md", Some("markdown"));
        assert_eq!(effective_type(&u).unwrap(), "markdown");
    }

    #[test]
    fn contradictory_client_type_is_rejected() {
        let u = upload(Some("text/markdown"), "note.md", Some("docx"));
        assert!(matches!(
            effective_type(&u),
            Err(ConvertError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn unrecognized_type_is_rejected() {
        let u = upload(Some("application/octet-stream"), "thing.xyz", None);
        assert!(matches!(
            effective_type(&u),
            Err(ConvertError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn unrecognized_client_type_with_unrecognized_extension_is_rejected() {
        let u = upload(None, "thing.xyz", Some("banana"));
        assert!(matches!(
            effective_type(&u),
            Err(ConvertError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn routes_office_family() {
        assert_eq!(route("docx"), Route::Office);
        assert_eq!(route("odt"), Route::Office);
    }

    #[test]
    fn routes_pdf_and_html() {
        assert_eq!(route("pdf"), Route::PdfPassthrough);
        assert_eq!(route("html"), Route::Html);
    }

    #[test]
    fn routes_everything_else_to_markup() {
        assert_eq!(route("markdown"), Route::Markup);
        assert_eq!(route("ipynb"), Route::Markup);
    }

    #[test]
    fn resource_count_over_limit_is_rejected() {
        assert!(validate_resource_count(17, 16).is_err());
        assert!(validate_resource_count(16, 16).is_ok());
    }
}
