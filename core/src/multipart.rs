//! `multipart/form-data` encoding.
//!
//! Built on ureq's form writer. The form is drained into memory so the
//! transport receives plain bytes, the same as the JSON path.

use std::io::Read;

use ureq::unversioned::multipart::{Form, Part};

use crate::error::Error;
use crate::request::File;

const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// A fully encoded form body and the `Content-Type` naming its boundary.
#[derive(Debug)]
pub(crate) struct EncodedForm {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Encode a `query` field, a `variables` field when given, then one part per
/// file in attachment order. Every file reader is drained here.
pub(crate) fn encode(
    query: &str,
    variables: Option<&str>,
    files: Vec<File>,
) -> Result<EncodedForm, Error> {
    let (names, readers): (Vec<_>, Vec<_>) = files
        .into_iter()
        .map(|file| {
            let (field, name, reader) = file.into_reader();
            ((field, name), reader)
        })
        .unzip();

    let mut form = Form::new().text("query", query);
    if let Some(variables) = variables {
        form = form.text("variables", variables);
    }
    for ((field, name), reader) in names.iter().zip(readers) {
        let part = Part::owned_reader(reader)
            .file_name(name)
            .mime_str(FILE_CONTENT_TYPE)
            .map_err(|e| Error::encode("preparing file", e))?;
        form = form.part(field, part);
    }

    let content_type = format!("multipart/form-data; boundary={}", form.boundary());
    let mut body = Vec::new();
    form.read_to_end(&mut body)
        .map_err(|e| Error::encode("preparing file", e))?;
    Ok(EncodedForm { content_type, body })
}
