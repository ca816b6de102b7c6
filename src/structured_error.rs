//! Errors that carry the structured context of the logger that raised them.

use std::{error::Error, fmt};

use crate::{
    log_record::{Fields, LABEL_COMPONENT},
    logger::sprint_with,
};

/// Field under which a wrapped error records its originating component.
pub const LABEL_ERROR_COMPONENT: &str = "errorComponent";

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// An error annotated with the fields of the logger that created it.
///
/// The logger's `component` is stored as `errorComponent` so that logging
/// the error from another component keeps both.
#[derive(Debug)]
pub struct StructuredError {
    fields: Fields,
    inner: BoxError,
}

impl StructuredError {
    pub fn new(fields: &Fields, inner: impl Into<BoxError>) -> Self {
        let fields = fields
            .iter()
            .map(|(key, value)| {
                let key = if key == LABEL_COMPONENT {
                    LABEL_ERROR_COMPONENT.to_owned()
                } else {
                    key.clone()
                };
                (key, value.clone())
            })
            .collect();
        Self {
            fields,
            inner: inner.into(),
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&sprint_with(&self.fields, &self.inner.to_string()))
    }
}

impl Error for StructuredError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner.as_ref())
    }
}
