//! Payload validation.
//!
//! Every rule is checked and all failures are collected per field before
//! the operation is rejected, so a caller sees the whole picture at once.

use chrono::{DateTime, Utc};
use stockroom_types::{parse_iso_date, start_of_day, Decimal, StockKey};

use crate::error::{EngineError, EngineResult, FieldErrors};
use crate::request::{ItemRef, Movement, NewStock, Sale};

pub const MISSING: &str = "Missing data for required field.";
pub const BLANK: &str = "Must not be blank.";
pub const MIN_QUANTITY: &str = "Must be greater than or equal to 1.";
pub const MIN_PRICE: &str = "Must be greater than or equal to 0.01.";
pub const NON_NEGATIVE: &str = "Must be greater than or equal to 0.";
pub const BAD_DATE: &str = "Invalid date format. Expected YYYY-MM-DD.";

/// Smallest accepted unit price: one cent.
pub fn min_unit_price() -> Decimal {
    Decimal::new(1, 2)
}

/// Collects per-field failures.
#[derive(Debug, Default)]
pub struct Validator {
    fields: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// A required, non-blank text field.
    pub fn text<'a>(&mut self, field: &str, value: &'a Option<String>) -> Option<&'a str> {
        match value.as_deref() {
            None => {
                self.reject(field, MISSING);
                None
            }
            Some(raw) if raw.trim().is_empty() => {
                self.reject(field, BLANK);
                None
            }
            Some(raw) => Some(raw),
        }
    }

    /// A required quantity of at least one unit.
    pub fn quantity(&mut self, field: &str, value: Option<i64>) -> Option<u64> {
        match value {
            None => {
                self.reject(field, MISSING);
                None
            }
            Some(q) if q < 1 => {
                self.reject(field, MIN_QUANTITY);
                None
            }
            Some(q) => u64::try_from(q).ok(),
        }
    }

    /// An optional count that may be zero but not negative.
    pub fn optional_count(&mut self, field: &str, value: Option<i64>) -> Option<u64> {
        let raw = value?;
        match u64::try_from(raw) {
            Ok(v) => Some(v),
            Err(_) => {
                self.reject(field, NON_NEGATIVE);
                None
            }
        }
    }

    /// Fail with `message` if anything was rejected.
    pub fn finish(self, message: &str) -> EngineResult<()> {
        if self.fields.is_empty() {
            return Ok(());
        }
        Err(EngineError::Validation {
            message: message.to_string(),
            fields: self.fields,
        })
    }
}

/// A validated [`NewStock`].
#[derive(Clone, Debug)]
pub struct ValidStock {
    pub key: StockKey,
    pub unit_price: Decimal,
    pub quantity: u64,
    pub date_of_addition: DateTime<Utc>,
    pub category: Option<String>,
    pub minimum_stock: Option<u64>,
}

pub fn new_stock(item: &NewStock) -> EngineResult<ValidStock> {
    let mut v = Validator::new();
    let name = v.text("name", &item.name);
    let company = v.text("company", &item.company);
    let quantity = v.quantity("quantity", item.quantity);

    let unit_price = match item.unit_price {
        None => {
            v.reject("unit_price", MISSING);
            None
        }
        Some(p) if p < min_unit_price() => {
            v.reject("unit_price", MIN_PRICE);
            None
        }
        Some(p) => Some(p),
    };

    let date_of_addition = match item.date_of_addition.as_deref() {
        None => {
            v.reject("date_of_addition", MISSING);
            None
        }
        Some(raw) => match parse_iso_date(raw.trim()) {
            Ok(date) => Some(start_of_day(date)),
            Err(_) => {
                v.reject("date_of_addition", BAD_DATE);
                None
            }
        },
    };

    let minimum_stock = v.optional_count("minimum_stock", item.minimum_stock);
    let category = item
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    // A lone date failure gets the date message; anything else is generic.
    let date_only = v.fields.len() == 1 && v.fields.contains_key("date_of_addition");
    v.finish(if date_only { BAD_DATE } else { "Validation error" })?;

    match (name, company, unit_price, quantity, date_of_addition) {
        (Some(name), Some(company), Some(unit_price), Some(quantity), Some(date_of_addition)) => {
            Ok(ValidStock {
                key: StockKey::new(name, company)?,
                unit_price,
                quantity,
                date_of_addition,
                category,
                minimum_stock,
            })
        }
        _ => Err(EngineError::Internal("validator accepted incomplete stock".into())),
    }
}

/// A validated [`Sale`].
#[derive(Clone, Debug)]
pub struct ValidSale {
    pub key: StockKey,
    pub quantity: u64,
    pub buyer: Option<String>,
    pub price: Option<Decimal>,
}

pub fn sale(sale: &Sale) -> EngineResult<ValidSale> {
    let mut v = Validator::new();
    let name = v.text("item_name", &sale.item_name);
    let company = v.text("company", &sale.company);
    let quantity = v.quantity("quantity", sale.quantity);
    if matches!(sale.price, Some(p) if p.is_sign_negative()) {
        v.reject("price", NON_NEGATIVE);
    }
    v.finish("Item name, company, and a positive quantity are required")?;

    match (name, company, quantity) {
        (Some(name), Some(company), Some(quantity)) => Ok(ValidSale {
            key: StockKey::new(name, company)?,
            quantity,
            buyer: clean_optional(&sale.buyer),
            price: sale.price,
        }),
        _ => Err(EngineError::Internal("validator accepted incomplete sale".into())),
    }
}

/// A validated [`Movement`].
#[derive(Clone, Debug)]
pub struct ValidMovement {
    pub key: StockKey,
    pub quantity: u64,
    pub buyer: Option<String>,
}

pub fn movement(movement: &Movement) -> EngineResult<ValidMovement> {
    let mut v = Validator::new();
    let name = v.text("item_name", &movement.item_name);
    let company = v.text("company", &movement.company);
    let quantity = v.quantity("quantity", movement.quantity);
    v.finish("Item name, company, and quantity are required")?;

    match (name, company, quantity) {
        (Some(name), Some(company), Some(quantity)) => Ok(ValidMovement {
            key: StockKey::new(name, company)?,
            quantity,
            buyer: clean_optional(&movement.buyer),
        }),
        _ => Err(EngineError::Internal("validator accepted incomplete movement".into())),
    }
}

pub fn item_ref(item: &ItemRef) -> EngineResult<StockKey> {
    let mut v = Validator::new();
    let name = v.text("name", &item.name);
    let company = v.text("company", &item.company);
    v.finish("Item name and company are required")?;

    match (name, company) {
        (Some(name), Some(company)) => Ok(StockKey::new(name, company)?),
        _ => Err(EngineError::Internal("validator accepted incomplete key".into())),
    }
}

fn clean_optional(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
