//! Typed asset records and the raw wire shapes they are normalized from.
//!
//! The catalog is inconsistent about field names (`name` vs `core.name` vs
//! `displayName`, ...) and about value types. Raw structs list the closed set
//! of field names we understand; everything else is ignored. Raw types never
//! leave this crate's client boundary: callers only see [`AssetRecord`] and
//! [`LineageLink`].

use lineage_core::LinkDirection;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One key/value fact attached to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub attribute_id: String,
    pub value: String,
}

/// Normalized relationship from an asset to one of its neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageLink {
    pub target_id: String,
    pub target_name: String,
    pub target_class_type: String,
    pub association: Option<String>,
    pub direction: LinkDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Normalized catalog asset. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,
    pub name: String,
    pub class_type: String,
    pub description: String,
    pub facts: Vec<Fact>,
    pub src_links: Vec<LineageLink>,
    pub dst_links: Vec<LineageLink>,
    /// False when the catalog answered with an empty result set.
    pub found: bool,
}

impl AssetRecord {
    pub fn links(&self, direction: LinkDirection) -> &[LineageLink] {
        match direction {
            LinkDirection::Upstream => &self.src_links,
            LinkDirection::Downstream => &self.dst_links,
        }
    }

    pub fn fact(&self, attribute_id: &str) -> Option<&str> {
        self.facts
            .iter()
            .find(|f| f.attribute_id == attribute_id)
            .map(|f| f.value.as_str())
    }
}

/// Body of a catalog query response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RawItem>,
}

impl CatalogResponse {
    pub fn new(items: Vec<RawItem>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "core.name",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub core_name: Option<String>,
    #[serde(
        rename = "displayName",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    #[serde(
        rename = "classType",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub class_type: Option<String>,
    #[serde(
        rename = "core.classType",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub core_class_type: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub facts: Vec<RawFact>,
    #[serde(rename = "srcLinks", default, deserialize_with = "null_as_default")]
    pub src_links: Vec<RawLink>,
    #[serde(rename = "dstLinks", default, deserialize_with = "null_as_default")]
    pub dst_links: Vec<RawLink>,
}

impl RawItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_class_type(mut self, class_type: impl Into<String>) -> Self {
        self.class_type = Some(class_type.into());
        self
    }

    pub fn with_fact(mut self, attribute_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.push(RawFact {
            attribute_id: Some(attribute_id.into()),
            value: Some(value.into()),
        });
        self
    }

    pub fn with_src_link(mut self, link: RawLink) -> Self {
        self.src_links.push(link);
        self
    }

    pub fn with_dst_link(mut self, link: RawLink) -> Self {
        self.dst_links.push(link);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub association: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "core.name",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub core_name: Option<String>,
    #[serde(
        rename = "displayName",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    #[serde(
        rename = "classType",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub class_type: Option<String>,
    #[serde(
        rename = "core.classType",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub core_class_type: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub href: Option<String>,
}

impl RawLink {
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// A link record with no target id.
    pub fn dangling() -> Self {
        Self::default()
    }

    pub fn association(mut self, association: impl Into<String>) -> Self {
        self.association = Some(association.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_class_type(mut self, class_type: impl Into<String>) -> Self {
        self.class_type = Some(class_type.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    #[serde(
        rename = "attributeId",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub attribute_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
}

/// Accepts strings, numbers and booleans; anything else reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
