//! Domain records exchanged with the REST backend.
//!
//! Every record is replaced wholesale on re-fetch; nothing here is patched
//! in place.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::dashboard::DashboardScope;
use crate::error::PosError;

pub type ItemId = String;

fn default_true() -> bool {
    true
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

/// Accept a string, number or null `_id` and produce a display label.
fn label_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => "Unknown".to_string(),
    })
}

fn unknown_label() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "item_id", alias = "id")]
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(rename = "price", default, deserialize_with = "null_as_default")]
    pub unit_price: f64,
    #[serde(rename = "is_offer", default, deserialize_with = "null_as_default")]
    pub is_on_offer: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "phonepe")]
    PhonePe,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::PhonePe => "phonepe",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "phonepe" | "phone_pe" | "upi" => Ok(PaymentMethod::PhonePe),
            other => Err(PosError::Validation(format!(
                "Unknown payment method: {other}"
            ))),
        }
    }
}

/// Body of `POST /api/record-sale`.
#[derive(Debug, Clone, Serialize)]
pub struct SaleRecord<'a> {
    pub item_id: &'a str,
    pub payment_method: PaymentMethod,
}

/// Body of `PUT /api/admin/update-price/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceUpdate {
    pub price: f64,
    pub is_offer: bool,
    pub reason: String,
}

impl PriceUpdate {
    pub fn validate(&self) -> Result<(), PosError> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(PosError::Validation(
                "Please enter a valid price greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Admin create/edit payload for a menu item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDraft {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_visible: bool,
}

impl ItemDraft {
    pub fn validate(&self) -> Result<(), PosError> {
        if self.name.trim().is_empty() {
            return Err(PosError::Validation("Item name is required".to_string()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(PosError::Validation(
                "Please enter a valid price greater than 0".to_string(),
            ));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(PosError::Validation("Cost cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// A file picked for upload, bound to an item by the upload workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryTotals {
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub total_profit: f64,
    #[serde(default)]
    pub order_count: u64,
    #[serde(default)]
    pub avg_order_value: Option<f64>,
    #[serde(default)]
    pub phonepe_amount: f64,
    #[serde(default)]
    pub cash_amount: f64,
}

/// One grouped row: a category, a time slot or a month.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BreakdownRow {
    #[serde(rename = "_id", default = "unknown_label", deserialize_with = "label_from_any")]
    pub label: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrendPoint {
    #[serde(rename = "_id", default = "unknown_label", deserialize_with = "label_from_any")]
    pub label: String,
    #[serde(default)]
    pub revenue: f64,
}

#[derive(Debug, Default, Deserialize)]
struct DashboardSections {
    #[serde(default)]
    categories: Vec<BreakdownRow>,
    #[serde(default)]
    time_slots: Vec<BreakdownRow>,
    #[serde(default)]
    trend: Vec<TrendPoint>,
    #[serde(default)]
    monthly_breakdown: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub scope: DashboardScope,
    pub totals: SummaryTotals,
    pub categories: Vec<BreakdownRow>,
    pub time_slots: Vec<BreakdownRow>,
    pub trend: Vec<TrendPoint>,
    pub monthly_breakdown: Vec<BreakdownRow>,
}

impl DashboardSummary {
    /// Parse a dashboard body. Accepts the wrapped `{ summary, ... }` shape
    /// and the flat `{ total_revenue, ... }` shape.
    pub fn from_value(scope: DashboardScope, body: Value) -> Result<Self, PosError> {
        if !body.is_object() {
            return Err(PosError::Decode("dashboard body is not an object".into()));
        }
        let totals_value = match body.get("summary") {
            Some(summary) if summary.is_object() => summary.clone(),
            _ => body.clone(),
        };
        let totals: SummaryTotals = serde_json::from_value(totals_value)
            .map_err(|e| PosError::Decode(format!("dashboard summary: {e}")))?;
        let sections: DashboardSections = serde_json::from_value(body)
            .map_err(|e| PosError::Decode(format!("dashboard sections: {e}")))?;

        Ok(Self {
            scope,
            totals,
            categories: sections.categories,
            time_slots: sections.time_slots,
            trend: sections.trend,
            monthly_breakdown: sections.monthly_breakdown,
        })
    }
}

/// One row of the staff ranking; list order is the server's rank.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StaffPerformance {
    #[serde(rename = "_id", alias = "id", default = "unknown_label", deserialize_with = "label_from_any")]
    pub id: String,
    #[serde(default)]
    pub total_sales: u64,
    #[serde(default)]
    pub total_revenue: f64,
}
