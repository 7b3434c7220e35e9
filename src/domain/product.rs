use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the store needs to know about a product handed back by the backend.
pub trait StoreProduct: Clone + Send + Sync + 'static {
    fn identifier(&self) -> &str;
    fn price(&self) -> Decimal;
    /// ISO 4217 code of the price locale, if the backend knows it.
    fn currency_code(&self) -> Option<&str>;
}

/// Plain product record, as listed in a catalog.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub identifier: String,
    pub price: Decimal,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub currency: Option<String>,
}

impl Product {
    pub fn new(identifier: impl Into<String>, price: Decimal, currency: Option<&str>) -> Self {
        Self {
            identifier: identifier.into(),
            price,
            currency: currency.map(str::to_owned),
        }
    }
}

impl StoreProduct for Product {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn price(&self) -> Decimal {
        self.price
    }

    fn currency_code(&self) -> Option<&str> {
        self.currency.as_deref()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|code| !code.trim().is_empty()))
}
