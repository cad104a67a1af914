// ABOUTME: Product catalog for the three sellable offerings
// ABOUTME: Product ids are URL slugs shared with the front-end and the purchase ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

/// Product slug for the 7-day email course
pub const SEVEN_DAY_RESET: &str = "7-day-reset";
/// Product slug for the flagship video course
pub const FROM_BROKEN_TO_WHOLE: &str = "from-broken-to-whole";
/// Product slug for the monthly membership circle
pub const BENT_NOT_BROKEN_CIRCLE: &str = "bent-not-broken-circle";

/// A sellable product
#[derive(Debug, Clone, Copy)]
pub struct Product {
    /// Slug used as `product_id` everywhere
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Price in cents
    pub amount_cents: i64,
    /// Monthly subscription rather than one-time payment
    pub recurring: bool,
}

/// All sellable products
pub const PRODUCTS: &[Product] = &[
    Product {
        id: SEVEN_DAY_RESET,
        name: "The 7-Day Reset",
        amount_cents: 2700,
        recurring: false,
    },
    Product {
        id: FROM_BROKEN_TO_WHOLE,
        name: "From Broken to Whole",
        amount_cents: 9700,
        recurring: false,
    },
    Product {
        id: BENT_NOT_BROKEN_CIRCLE,
        name: "The Bent Not Broken Circle",
        amount_cents: 2900,
        recurring: true,
    },
];

/// Look up a product by slug
#[must_use]
pub fn get(product_id: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == product_id)
}

/// The only subscription product. Invoice webhooks carry no product
/// metadata, so subscription payments resolve to this.
#[must_use]
pub fn subscription_product() -> &'static Product {
    // PRODUCTS always contains the circle
    PRODUCTS
        .iter()
        .find(|p| p.recurring)
        .unwrap_or(&PRODUCTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_slug() {
        assert_eq!(get(SEVEN_DAY_RESET).map(|p| p.amount_cents), Some(2700));
        assert_eq!(get(FROM_BROKEN_TO_WHOLE).map(|p| p.amount_cents), Some(9700));
        assert!(get("unknown-product").is_none());
    }

    #[test]
    fn circle_is_the_subscription_product() {
        assert_eq!(subscription_product().id, BENT_NOT_BROKEN_CIRCLE);
    }
}
