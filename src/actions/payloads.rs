//! Normalized per-action payloads.
//!
//! Each type is built only by its `from_payload` validator on the gateway
//! side, and is also the request body the client sends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::result::{GatewayError, GatewayResult};
use crate::validation::{Ean, FieldLimit};

/// Maximum serialized length of `event_data`
pub const MAX_EVENT_DATA_CHARS: usize = 10_000;

// ============================================================================
// record-scan
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanRecord {
    #[schema(example = "5901234123457")]
    pub ean: String,
}

impl ScanRecord {
    /// Format check only; scans of unknown or misprinted codes are still
    /// worth recording.
    pub fn from_payload(payload: &Map<String, Value>) -> GatewayResult<Self> {
        let ean = Ean::parse_format(ean_field(payload)?)?;
        Ok(Self {
            ean: ean.into_inner(),
        })
    }
}

// ============================================================================
// submit-product
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductSubmission {
    #[schema(example = "5901234123457")]
    pub ean: String,
    #[schema(example = "Oat Drink Barista")]
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProductSubmission {
    pub fn from_payload(payload: &Map<String, Value>) -> GatewayResult<Self> {
        let ean = Ean::parse(ean_field(payload)?)?;
        Ok(Self {
            ean: ean.into_inner(),
            product_name: FieldLimit::PRODUCT_NAME.required(payload.get("product_name"))?,
            brand: FieldLimit::BRAND.optional(payload.get("brand"))?,
            category: FieldLimit::CATEGORY.optional(payload.get("category"))?,
            photo_url: FieldLimit::PHOTO_URL.optional(payload.get("photo_url"))?,
            notes: FieldLimit::NOTES.optional(payload.get("notes"))?,
        })
    }
}

// ============================================================================
// track-event
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mobile" => Some(Self::Mobile),
            "tablet" => Some(Self::Tablet),
            "desktop" => Some(Self::Desktop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrackedEvent {
    #[schema(example = "product_viewed")]
    pub event_name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub event_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
}

impl TrackedEvent {
    pub fn from_payload(payload: &Map<String, Value>) -> GatewayResult<Self> {
        let event_name = FieldLimit::EVENT_NAME.required(payload.get("event_name"))?;

        let event_data = object_field(payload, "event_data")?;
        let serialized = serde_json::to_string(&event_data).map_err(|_| {
            GatewayError::invalid_input("event_data must be serializable")
        })?;
        if serialized.chars().count() > MAX_EVENT_DATA_CHARS {
            return Err(GatewayError::invalid_input(format!(
                "event_data exceeds maximum size of {} characters",
                MAX_EVENT_DATA_CHARS
            )));
        }

        Ok(Self {
            event_name,
            event_data,
            session_id: FieldLimit::SESSION_ID.optional(payload.get("session_id"))?,
            device_type: device_type_field(payload)?,
        })
    }
}

// ============================================================================
// save-search
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavedSearch {
    #[schema(example = "Vegan snacks")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filters: Map<String, Value>,
}

impl SavedSearch {
    pub fn from_payload(payload: &Map<String, Value>) -> GatewayResult<Self> {
        Ok(Self {
            name: FieldLimit::SEARCH_NAME.required(payload.get("name"))?,
            query: FieldLimit::SEARCH_QUERY.optional(payload.get("query"))?,
            filters: object_field(payload, "filters")?,
        })
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Raw `ean` string; anything else is a format error. Not trimmed.
fn ean_field(payload: &Map<String, Value>) -> GatewayResult<&str> {
    match payload.get("ean") {
        Some(Value::String(ean)) => Ok(ean),
        _ => Err(crate::validation::BarcodeError::InvalidFormat.into()),
    }
}

/// Absent or `null` → `{}`; any non-object is rejected.
fn object_field(payload: &Map<String, Value>, field: &str) -> GatewayResult<Map<String, Value>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(GatewayError::invalid_input(format!(
            "{} must be an object",
            field
        ))),
    }
}

fn device_type_field(payload: &Map<String, Value>) -> GatewayResult<Option<DeviceType>> {
    match payload.get("device_type") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => DeviceType::from_name(s).map(Some).ok_or_else(|| {
            GatewayError::invalid_input("device_type must be one of mobile, tablet, desktop")
        }),
        Some(_) => Err(GatewayError::invalid_input(
            "device_type must be one of mobile, tablet, desktop",
        )),
    }
}
