use super::product::StoreProduct;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a successful purchase cost the user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Payment {
    pub amount: Decimal,
    /// Empty when the product's price locale has no currency code.
    pub currency: String,
}

impl Payment {
    pub fn for_product<P: StoreProduct>(product: &P) -> Self {
        Self {
            amount: product.price(),
            currency: product.currency_code().unwrap_or_default().to_string(),
        }
    }
}
