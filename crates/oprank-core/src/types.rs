//! 1Password domain types shared by the resolver and every backend.
//!
//! The serde shapes follow the Connect Server JSON payloads so that HTTP
//! backends can deserialize straight into them.

use serde::{Deserialize, Serialize};

/// Item category whose payload is a set of files instead of fields.
pub const DOCUMENT_CATEGORY: &str = "DOCUMENT";

/// Field label read when a reference does not name a property.
pub const DEFAULT_FIELD_LABEL: &str = "password";

/// A 1Password vault.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Vault {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Vault {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// Reference from an item back to the vault that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemVault {
    pub id: String,
}

/// An item as returned by list/search endpoints (no field values).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub vault: ItemVault,
    #[serde(default)]
    pub category: String,
}

/// A fully populated item: fields and, for documents, file descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub vault: ItemVault,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub files: Vec<File>,
}

impl Item {
    /// Whether the item stores its payload as files.
    pub fn is_document(&self) -> bool {
        self.category == DOCUMENT_CATEGORY
    }

    /// The summary view of this item.
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            vault: self.vault.clone(),
            category: self.category.clone(),
        }
    }
}

/// A labeled value on an item. Labels are not guaranteed unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Field {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl Field {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            label: Some(label.into()),
            value: Some(value.into()),
        }
    }

    /// The field label, `""` when the backend omitted it.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_default()
    }

    /// The field value, `""` when the backend omitted it.
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// Descriptor of a file attached to a document item.
///
/// Contents are never embedded; they are fetched on demand through the
/// backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct File {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
}

impl File {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size: None,
            content_path: None,
        }
    }
}

/// A caller's request for a secret: the item title plus an optional property.
///
/// An empty `property` selects the default: the `password` field, or the
/// first file of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretReference {
    pub key: String,
    #[serde(default)]
    pub property: String,
}

impl SecretReference {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            property: String::new(),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }
}
