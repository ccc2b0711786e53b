//! Row building
//!
//! Maps a [`RawEvent`] into the flat destination schema. `build_row`
//! never fails: every field has a defined default (null, empty string
//! semantics via `Option`, or empty sequence), so a malformed or partial
//! record always yields a best-effort row. Dropping a mostly-null row is
//! a decision left to the caller.

use crate::decode::RawEvent;
use crate::extended::ExtendedScalar;
use crate::normalize::{
    decode_extended_int, decode_extended_numeric, normalize_local_time, normalize_small_int,
    Numeric,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// One line item from a cart. Owned exclusively by its parent row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartProductLine {
    pub product_id: Option<i64>,
    pub amount: Option<i64>,
    /// Opaque passthrough: the export carries numeric or string prices.
    pub price: Option<Value>,
    pub currency: Option<String>,
    pub option: Vec<OptionEntry>,
}

/// One product option. Ids are carried as strings; numeric ids are
/// stringified, never parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionEntry {
    pub option_label: Option<String>,
    pub option_id: Option<String>,
    pub value_label: Option<String>,
    pub value_id: Option<String>,
    pub quality: Option<String>,
    pub quality_label: Option<String>,
}

/// Fixed set of customization fields extracted from a mapping-shaped
/// option field. An absent mapping yields the all-null struct, never an
/// omitted one, so consumers can always read it unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtendedOptions {
    pub alloy: Option<String>,
    pub stone: Option<String>,
    pub pearlcolor: Option<String>,
    pub finish: Option<String>,
    pub price: Option<Value>,
    pub category_id: Option<String>,
    pub kollektion: Option<String>,
    pub kollektion_id: Option<String>,
    pub diamond: Option<String>,
    pub shapediamond: Option<String>,
}

impl ExtendedOptions {
    pub fn is_empty(&self) -> bool {
        self == &ExtendedOptions::default()
    }
}

/// The flat destination schema: one row per input record, immutable once
/// built, consumed exactly once by the load client.
///
/// Invariant: at most one of `product_options` / `extended_options` is
/// populated per row; both come from the same source field, dispatched
/// on its shape.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRow {
    pub record_id: Option<String>,
    pub event_collection: Option<String>,
    pub timestamp: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub resolution: Option<String>,
    pub user_id_db: Option<String>,
    pub device_id: Option<String>,
    pub api_version: Option<String>,
    pub store_id: Option<String>,
    pub local_time: Option<String>,
    pub show_recommendation: Option<Value>,
    pub current_url: Option<String>,
    pub referrer_url: Option<String>,
    pub email_address: Option<String>,
    pub product_id: Option<Value>,
    pub viewing_product_id: Option<Value>,
    pub price: Option<Value>,
    pub currency: Option<String>,
    pub is_paypal: Option<Value>,
    pub key_search: Option<String>,
    pub cat_id: Option<Value>,
    pub collect_id: Option<Value>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub recommendation: Option<Value>,
    pub recommendation_product_id: Option<Value>,
    pub recommendation_clicked_position: Option<i64>,
    pub recommendation_product_position: Option<i64>,
    pub order_id: Option<Numeric>,
    pub cart_products: Vec<CartProductLine>,
    pub product_options: Vec<OptionEntry>,
    pub extended_options: ExtendedOptions,
}

/// Build the destination row for one raw event. Never fails.
pub fn build_row(event: &RawEvent) -> OutputRow {
    // order_id is the one strict field: an unrecognized encoding is a
    // normalization error, but the record is still emitted with the
    // field null rather than dropped wholesale.
    let order_id = match decode_extended_numeric(event.get("order_id"), "order_id") {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "order_id normalization failed, substituting null");
            None
        },
    };

    // Option-field dispatch: mapping populates extended options only,
    // sequence populates product options only, anything else leaves both
    // empty. Never both from the same record.
    let (product_options, extended_options) = match event.get("option") {
        Some(Value::Object(_)) => (Vec::new(), build_extended_options(event.get("option"))),
        Some(Value::Array(_)) => (
            build_option_entries(event.get("option")),
            ExtendedOptions::default(),
        ),
        _ => (Vec::new(), ExtendedOptions::default()),
    };

    OutputRow {
        record_id: record_id(event),
        event_collection: event.str_field("collection"),
        timestamp: decode_extended_int(event.get("time_stamp")).unwrap_or(0),
        ip: event.str_field("ip"),
        user_agent: event.str_field("user_agent"),
        resolution: event.str_field("resolution"),
        user_id_db: event.str_field("user_id_db"),
        device_id: event.str_field("device_id"),
        api_version: event.str_field("api_version"),
        store_id: event.str_field("store_id"),
        local_time: normalize_local_time(event.get("local_time")),
        show_recommendation: event.passthrough("show_recommendation"),
        current_url: event.str_field("current_url"),
        referrer_url: event.str_field("referrer_url"),
        email_address: event.str_field("email_address"),
        product_id: event.passthrough("product_id"),
        viewing_product_id: event.passthrough("viewing_product_id"),
        price: event.passthrough("price"),
        currency: event.str_field("currency"),
        is_paypal: event.passthrough("is_paypal"),
        key_search: event.str_field("key_search"),
        cat_id: event.passthrough("cat_id"),
        collect_id: event.passthrough("collect_id"),
        utm_source: event.stringified("utm_source"),
        utm_medium: event.stringified("utm_medium"),
        recommendation: event.passthrough("recommendation"),
        recommendation_product_id: event.passthrough("recommendation_product_id"),
        recommendation_clicked_position: decode_extended_int(
            event.get("recommendation_clicked_position"),
        ),
        recommendation_product_position: normalize_small_int(
            event.get("recommendation_product_position"),
        ),
        order_id,
        cart_products: build_cart_products(event.get("cart_products")),
        product_options,
        extended_options,
    }
}

/// Flatten cart line items. Non-list or absent input yields an empty
/// sequence; each element defaults missing fields independently rather
/// than skipping the whole line.
pub fn build_cart_products(value: Option<&Value>) -> Vec<CartProductLine> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let Some(map) = item.as_object() else {
                return CartProductLine::default();
            };
            CartProductLine {
                product_id: decode_extended_int(field(map, "product_id")),
                amount: decode_extended_int(field(map, "amount")),
                price: field(map, "price").cloned(),
                currency: str_of(field(map, "currency")),
                option: build_option_entries(field(map, "option")),
            }
        })
        .collect()
}

/// Flatten a sequence-shaped option field, one entry per element, with
/// the same per-element tolerance as cart products.
pub fn build_option_entries(value: Option<&Value>) -> Vec<OptionEntry> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let Some(map) = item.as_object() else {
                return OptionEntry::default();
            };
            OptionEntry {
                option_label: str_of(field(map, "option_label")),
                option_id: id_string(field(map, "option_id")),
                value_label: str_of(field(map, "value_label")),
                value_id: id_string(field(map, "value_id")),
                quality: str_of(field(map, "quality")),
                quality_label: str_of(field(map, "quality_label")),
            }
        })
        .collect()
}

/// Extract the fixed customization fields from a mapping-shaped option
/// field. Absent or non-mapping input yields the all-null struct.
///
/// The source keys "category id" (with a space) and "Kollektion"
/// (capitalized) are exactly what the export emits.
pub fn build_extended_options(value: Option<&Value>) -> ExtendedOptions {
    let Some(map) = value.and_then(Value::as_object) else {
        return ExtendedOptions::default();
    };
    ExtendedOptions {
        alloy: str_of(field(map, "alloy")),
        stone: str_of(field(map, "stone")),
        pearlcolor: str_of(field(map, "pearlcolor")),
        finish: str_of(field(map, "finish")),
        price: field(map, "price").cloned(),
        category_id: id_string(field(map, "category id")),
        kollektion: str_of(field(map, "Kollektion")),
        kollektion_id: id_string(field(map, "kollektion_id")),
        diamond: str_of(field(map, "diamond")),
        shapediamond: str_of(field(map, "shapediamond")),
    }
}

fn record_id(event: &RawEvent) -> Option<String> {
    match ExtendedScalar::classify(event.get("_id")?) {
        Some(ExtendedScalar::ObjectId(oid)) => Some(oid),
        _ => None,
    }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match map.get(key) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

fn str_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Stringify an id-bearing value: wrapped ints and bare numbers become
/// their decimal text, strings pass through.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        wrapped @ Value::Object(_) => match ExtendedScalar::classify(wrapped) {
            Some(ExtendedScalar::Int(n)) => Some(n.to_string()),
            _ => None,
        },
        _ => None,
    }
}
