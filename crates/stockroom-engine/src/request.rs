//! Inbound mutation payloads.
//!
//! Every field is optional at this layer so that missing input turns into a
//! per-field validation message rather than a decode failure.

use serde::Deserialize;
use stockroom_types::Decimal;

/// Stock to add: creates the record on first sight, increments it after.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NewStock {
    pub name: Option<String>,
    pub company: Option<String>,
    pub unit_price: Option<Decimal>,
    pub quantity: Option<i64>,
    /// `YYYY-MM-DD`.
    pub date_of_addition: Option<String>,
    pub category: Option<String>,
    pub minimum_stock: Option<i64>,
}

impl NewStock {
    pub fn new(
        name: impl Into<String>,
        company: impl Into<String>,
        unit_price: Decimal,
        quantity: i64,
        date_of_addition: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            company: Some(company.into()),
            unit_price: Some(unit_price),
            quantity: Some(quantity),
            date_of_addition: Some(date_of_addition.into()),
            category: None,
            minimum_stock: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_minimum_stock(mut self, minimum_stock: i64) -> Self {
        self.minimum_stock = Some(minimum_stock);
        self
    }
}

/// A sale that decrements stock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Sale {
    pub item_name: Option<String>,
    pub company: Option<String>,
    pub quantity: Option<i64>,
    pub buyer: Option<String>,
    pub price: Option<Decimal>,
}

impl Sale {
    pub fn new(item_name: impl Into<String>, company: impl Into<String>, quantity: i64) -> Self {
        Self {
            item_name: Some(item_name.into()),
            company: Some(company.into()),
            quantity: Some(quantity),
            buyer: None,
            price: None,
        }
    }

    pub fn to_buyer(mut self, buyer: impl Into<String>, price: Option<Decimal>) -> Self {
        self.buyer = Some(buyer.into());
        self.price = price;
        self
    }
}

/// A reference to one stock record by its raw key components.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ItemRef {
    pub name: Option<String>,
    pub company: Option<String>,
}

impl ItemRef {
    pub fn new(name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            company: Some(company.into()),
        }
    }
}

/// Quantity moving to or from a buyer: returns and allotments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Movement {
    pub item_name: Option<String>,
    pub company: Option<String>,
    pub quantity: Option<i64>,
    pub buyer: Option<String>,
}

impl Movement {
    pub fn new(item_name: impl Into<String>, company: impl Into<String>, quantity: i64) -> Self {
        Self {
            item_name: Some(item_name.into()),
            company: Some(company.into()),
            quantity: Some(quantity),
            buyer: None,
        }
    }

    pub fn by(mut self, buyer: impl Into<String>) -> Self {
        self.buyer = Some(buyer.into());
        self
    }
}
