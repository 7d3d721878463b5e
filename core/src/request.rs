//! The per-call GraphQL request.
//!
//! # Design
//! `Request` is plain data: a query, variables, file attachments and extra
//! headers. Nothing is validated here; `Client::run` enforces the contract
//! (files need multipart mode) when the request is executed. Variables stay
//! dynamically typed because GraphQL variables are heterogeneous.

use std::fmt;
use std::io::Read;

use serde_json::{Map, Value};

/// A GraphQL request, built by the caller and consumed by `Client::run`.
///
/// ```
/// use gql_client::Request;
///
/// let mut req = Request::new("query ($key: String!) { items(id: $key) { field1 } }");
/// req.var("key", "value");
/// req.header("Authorization", "Bearer token");
/// assert_eq!(req.vars().unwrap()["key"], "value");
/// ```
pub struct Request {
    query: String,
    vars: Option<Map<String, Value>>,
    files: Vec<File>,
    headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            vars: None,
            files: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Set a variable, replacing any earlier value under the same name.
    pub fn var(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.vars
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Attach a file to upload. Only honored by clients in multipart form
    /// mode; the reader is drained once, when the request is sent.
    pub fn file(
        &mut self,
        field: impl Into<String>,
        name: impl Into<String>,
        reader: impl Read + Send + 'static,
    ) -> &mut Self {
        self.files.push(File {
            field: field.into(),
            name: name.into(),
            reader: Box::new(reader),
        });
        self
    }

    /// Add a header to the outgoing HTTP request. Existing values under the
    /// same name are kept.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// `None` until the first call to [`Request::var`].
    pub fn vars(&self) -> Option<&Map<String, Value>> {
        self.vars.as_ref()
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Vec<(String, String)> {
        &mut self.headers
    }

    pub(crate) fn into_parts(self) -> RequestParts {
        RequestParts {
            query: self.query,
            vars: self.vars,
            files: self.files,
            headers: self.headers,
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("vars", &self.vars)
            .field("files", &self.files)
            .field("headers", &self.headers)
            .finish()
    }
}

pub(crate) struct RequestParts {
    pub query: String,
    pub vars: Option<Map<String, Value>>,
    pub files: Vec<File>,
    pub headers: Vec<(String, String)>,
}

/// A file to upload: form field name, file name and byte source.
pub struct File {
    field: String,
    name: String,
    reader: Box<dyn Read + Send>,
}

impl File {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_reader(self) -> (String, String, Box<dyn Read + Send>) {
        (self.field, self.name, self.reader)
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("field", &self.field)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
