//! A client-supplied auxiliary file accompanying the main upload: an
//! image, stylesheet, or other asset the browser conversion may serve
//! back to the page under the document's own origin.

#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
