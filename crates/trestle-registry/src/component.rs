//! Component records and the inputs that create or change them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::summary::ComponentSummary;

/// Free-form component metadata.
pub type Properties = BTreeMap<String, String>;

/// One CAD artifact known to the registry.
///
/// The registry hands out clones; `id` and `created_at` never change for a
/// registered component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Caller-supplied identifier, unique within a registry.
    pub id: String,
    /// Category tag such as `curve` or `bridge_structure`.
    #[serde(rename = "type")]
    pub component_type: String,
    /// Human-readable label.
    pub name: String,
    /// Free text, searched during reference resolution.
    pub description: String,
    /// Arbitrary metadata.
    #[serde(default)]
    pub properties: Properties,
    /// When the component was registered.
    pub created_at: DateTime<Utc>,
    /// When any field last changed.
    pub updated_at: DateTime<Utc>,
}

impl Component {
    /// The one-line summary mirrored into durable memory.
    pub fn summary(&self) -> ComponentSummary {
        ComponentSummary {
            component_type: self.component_type.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// Apply the fields present in `update` and refresh `updated_at`.
    ///
    /// `updated_at` always moves strictly forward, even when the clock has
    /// not advanced since the previous write.
    pub(crate) fn apply(&mut self, update: ComponentUpdate) {
        let ComponentUpdate {
            component_type,
            name,
            description,
            properties,
        } = update;

        if let Some(component_type) = component_type {
            self.component_type = component_type;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(properties) = properties {
            self.properties = properties;
        }

        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

/// Input for [`ComponentRegistry::register`](crate::ComponentRegistry::register).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewComponent {
    pub id: String,
    pub component_type: String,
    pub name: String,
    pub description: String,
    pub properties: Properties,
}

impl NewComponent {
    pub fn new(
        id: impl Into<String>,
        component_type: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            name: name.into(),
            description: description.into(),
            properties: Properties::new(),
        }
    }

    /// Add one property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Replace all properties.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub(crate) fn into_component(self, now: DateTime<Utc>) -> Component {
        Component {
            id: self.id,
            component_type: self.component_type,
            name: self.name,
            description: self.description,
            properties: self.properties,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for [`ComponentRegistry::update`](crate::ComponentRegistry::update).
///
/// Absent fields are left untouched. `properties`, when present, replaces the
/// whole map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentUpdate {
    pub component_type: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub properties: Option<Properties>,
}

impl ComponentUpdate {
    pub fn with_type(mut self, component_type: impl Into<String>) -> Self {
        self.component_type = Some(component_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Whether no field would change.
    pub fn is_empty(&self) -> bool {
        self.component_type.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.properties.is_none()
    }
}
