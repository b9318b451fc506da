//! Value extraction from a resolved item.
//!
//! Documents yield file contents, every other category yields field values.
//! Field labels must be unique for the label being read; file names are not
//! checked, so a document with two same-named files maps to whichever was
//! fetched last.

use std::collections::HashMap;

use tracing::debug;

use crate::backend::BackendClient;
use crate::error::{BackendStage, ResolveError};
use crate::secret::SecretValue;
use crate::types::{DEFAULT_FIELD_LABEL, Field, Item};

/// Number of fields on an item whose label equals `label`.
pub fn count_fields_with_label(label: &str, fields: &[Field]) -> usize {
    fields.iter().filter(|f| f.label() == label).count()
}

/// Reads values off an already-resolved item.
pub struct ValueExtractor<'a> {
    client: &'a dyn BackendClient,
}

impl<'a> ValueExtractor<'a> {
    pub fn new(client: &'a dyn BackendClient) -> Self {
        Self { client }
    }

    /// A single value selected by `property`.
    ///
    /// For documents, the first file named `property` (or simply the first
    /// file when `property` is empty). Otherwise the field labeled
    /// `property`, defaulting to `password`, which must occur exactly once.
    pub async fn get_single_value(
        &self,
        item: &Item,
        property: &str,
    ) -> Result<SecretValue, ResolveError> {
        if item.is_document() {
            let file = item
                .files
                .iter()
                .find(|f| property.is_empty() || f.name == property)
                .ok_or_else(|| ResolveError::DocumentNotFound {
                    title: item.title.clone(),
                    property: property.to_owned(),
                })?;

            debug!(item = %item.title, file = %file.name, "fetching document file");
            let contents = self
                .client
                .get_file_content(file)
                .await
                .map_err(ResolveError::backend(BackendStage::FileFetch))?;
            return Ok(SecretValue::new(contents));
        }

        let label = if property.is_empty() {
            DEFAULT_FIELD_LABEL
        } else {
            property
        };
        let field = unique_field(item, label)?;
        Ok(SecretValue::from_str_value(field.value()))
    }

    /// Every file (for documents) or field of the item, keyed by name / label.
    ///
    /// A single duplicated field label fails the whole map.
    pub async fn get_value_map(
        &self,
        item: &Item,
    ) -> Result<HashMap<String, SecretValue>, ResolveError> {
        let mut data = HashMap::new();

        if item.is_document() {
            for file in &item.files {
                debug!(item = %item.title, file = %file.name, "fetching document file");
                let contents = self
                    .client
                    .get_file_content(file)
                    .await
                    .map_err(ResolveError::backend(BackendStage::FileFetch))?;
                data.insert(file.name.clone(), SecretValue::new(contents));
            }
            return Ok(data);
        }

        for field in &item.fields {
            let field = unique_field(item, field.label())?;
            data.insert(
                field.label().to_owned(),
                SecretValue::from_str_value(field.value()),
            );
        }
        Ok(data)
    }
}

/// The only field labeled `label`, or `AmbiguousField` (also for zero matches).
fn unique_field<'i>(item: &'i Item, label: &str) -> Result<&'i Field, ResolveError> {
    let mut matches = item.fields.iter().filter(|f| f.label() == label);
    match (matches.next(), matches.next()) {
        (Some(field), None) => Ok(field),
        _ => Err(ResolveError::AmbiguousField {
            label: label.to_owned(),
            title: item.title.clone(),
            count: count_fields_with_label(label, &item.fields),
        }),
    }
}
