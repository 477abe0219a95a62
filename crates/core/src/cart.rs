//! Shopping cart with quantity reconciliation.
//!
//! The cart is an ordered list of product snapshots and quantities. It is
//! persisted as a JSON array (the storefront keeps it in the session) and
//! upholds two invariants at all times:
//!
//! - product ids are unique within the cart
//! - every quantity is at least 1; a line reduced to zero is removed
//!
//! Deserialization re-establishes both invariants, so a hand-edited or
//! stale payload can never produce a cart that breaks them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// How a product is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    /// Listed price, purchasable online.
    #[default]
    Fixed,
    /// Price on request; goes through a quote request.
    Quote,
}

impl PriceType {
    /// Returns `true` for price-on-request products.
    #[must_use]
    pub const fn is_quote(self) -> bool {
        matches!(self, Self::Quote)
    }
}

/// Snapshot of a product taken when it was added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub price_type: PriceType,
    /// First product image, as returned by the backend (relative or absolute).
    #[serde(default)]
    pub image: Option<String>,
}

impl CartProduct {
    /// Price of `qty` units, or `None` for quote items and unpriced products.
    #[must_use]
    pub fn line_total(&self, qty: u32) -> Option<Decimal> {
        match self.price_type {
            PriceType::Fixed => self.price.map(|price| price * Decimal::from(qty)),
            PriceType::Quote => None,
        }
    }
}

/// A product and how many of it the customer wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: CartProduct,
    pub qty: u32,
}

impl CartLine {
    /// Line subtotal; `None` for quote items.
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.product.line_total(self.qty)
    }
}

/// The customer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from raw lines, merging duplicates and dropping empty lines.
    ///
    /// Duplicate product ids keep the position of their first occurrence and
    /// the snapshot of their last one; quantities are summed.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line.product, line.qty);
        }
        cart
    }

    /// Add `qty` units of a product.
    ///
    /// An existing line has its quantity increased and its snapshot refreshed;
    /// otherwise a new line is appended. Adding zero units does nothing.
    pub fn add(&mut self, product: CartProduct, qty: u32) {
        if qty == 0 {
            return;
        }

        match self.line_mut(product.id) {
            Some(line) => {
                line.qty = line.qty.saturating_add(qty);
                line.product = product;
            }
            None => self.lines.push(CartLine { product, qty }),
        }
    }

    /// Remove a product. Returns `true` if it was in the cart.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product.id != id);
        self.lines.len() != before
    }

    /// Change a line's quantity by `delta`, removing it if it drops to zero.
    ///
    /// Returns the new quantity (0 when the line was removed), or `None` if
    /// the product is not in the cart.
    pub fn update_qty(&mut self, id: ProductId, delta: i64) -> Option<u32> {
        let current = self.quantity_of(id)?;
        let next = i64::from(current).saturating_add(delta);
        let next = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
        self.set_qty(id, next)
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Returns the new quantity, or `None` if the product is not in the cart.
    pub fn set_qty(&mut self, id: ProductId, qty: u32) -> Option<u32> {
        if qty == 0 {
            return self.remove(id).then_some(0);
        }
        let line = self.line_mut(id)?;
        line.qty = qty;
        Some(qty)
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products (the navbar badge).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.qty)).sum()
    }

    /// Quantity of a product, if present.
    #[must_use]
    pub fn quantity_of(&self, id: ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|line| line.product.id == id)
            .map(|line| line.qty)
    }

    /// Total of fixed-price lines that carry a price. Quote lines are excluded.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().filter_map(CartLine::subtotal).sum()
    }

    /// Number of fixed-price lines.
    #[must_use]
    pub fn fixed_items_count(&self) -> usize {
        self.fixed_lines().count()
    }

    /// Number of price-on-request lines.
    #[must_use]
    pub fn quote_items_count(&self) -> usize {
        self.quote_lines().count()
    }

    /// Returns `true` if the cart mixes purchasable and quote-only products.
    #[must_use]
    pub fn has_mixed_items(&self) -> bool {
        self.fixed_items_count() > 0 && self.quote_items_count() > 0
    }

    /// Fixed-price lines, in cart order.
    pub fn fixed_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines
            .iter()
            .filter(|line| line.product.price_type == PriceType::Fixed)
    }

    /// Price-on-request lines, in cart order.
    pub fn quote_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines
            .iter()
            .filter(|line| line.product.price_type == PriceType::Quote)
    }

    /// Parse a persisted cart, falling back to an empty cart.
    ///
    /// A payload that cannot be read is logged and discarded rather than
    /// surfacing an error to the shopper.
    #[must_use]
    pub fn from_json_lenient(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load cart, starting empty");
            Self::new()
        })
    }

    fn line_mut(&mut self, id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.product.id == id)
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(id: i64, price: Option<i64>, price_type: PriceType) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            category: "Software".to_string(),
            price: price.map(|p| Decimal::new(p, 2)),
            price_type,
            image: None,
        }
    }

    fn fixed(id: i64, cents: i64) -> CartProduct {
        product(id, Some(cents), PriceType::Fixed)
    }

    fn quote(id: i64) -> CartProduct {
        product(id, None, PriceType::Quote)
    }

    #[test]
    fn test_add_merges_existing_line() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1000), 1);
        cart.add(fixed(2, 500), 1);
        cart.add(fixed(1, 1000), 2);

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(3));
        assert_eq!(cart.lines()[0].product.id, ProductId::new(1));
    }

    #[test]
    fn test_add_refreshes_snapshot() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1000), 1);
        cart.add(fixed(1, 1200), 1);

        assert_eq!(cart.lines()[0].product.price, Some(Decimal::new(1200, 2)));
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1000), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_qty_removes_at_zero() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1000), 2);

        assert_eq!(cart.update_qty(ProductId::new(1), -1), Some(1));
        assert_eq!(cart.update_qty(ProductId::new(1), -1), Some(0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_qty_large_negative_delta_removes() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1000), 2);

        assert_eq!(cart.update_qty(ProductId::new(1), -50), Some(0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_qty_unknown_product() {
        let mut cart = Cart::new();
        assert_eq!(cart.update_qty(ProductId::new(9), 1), None);
    }

    #[test]
    fn test_set_qty() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1000), 1);

        assert_eq!(cart.set_qty(ProductId::new(1), 5), Some(5));
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.set_qty(ProductId::new(1), 0), Some(0));
        assert!(cart.is_empty());
        assert_eq!(cart.set_qty(ProductId::new(1), 0), None);
    }

    #[test]
    fn test_total_skips_quote_and_unpriced_lines() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1999), 2);
        cart.add(quote(2), 3);
        cart.add(product(3, None, PriceType::Fixed), 1);

        assert_eq!(cart.total(), Decimal::new(3998, 2));
        assert_eq!(cart.fixed_items_count(), 2);
        assert_eq!(cart.quote_items_count(), 1);
        assert!(cart.has_mixed_items());
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.add(fixed(1, 1000), 1);
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
    }

    #[test]
    fn test_serialized_as_array() {
        let mut cart = Cart::new();
        cart.add(quote(4), 1);
        let json = serde_json::to_value(&cart).unwrap();

        assert!(json.is_array());
        assert_eq!(json[0]["qty"], 1);
        assert_eq!(json[0]["product"]["price_type"], "quote");
    }

    #[test]
    fn test_deserialize_normalizes_lines() {
        let raw = r#"[
            {"product": {"id": 1, "name": "A", "price": "10.00", "price_type": "fixed"}, "qty": 1},
            {"product": {"id": 2, "name": "B", "price_type": "quote"}, "qty": 0},
            {"product": {"id": 1, "name": "A v2", "price": "12.00", "price_type": "fixed"}, "qty": 2}
        ]"#;

        let cart: Cart = serde_json::from_str(raw).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].qty, 3);
        assert_eq!(cart.lines()[0].product.name, "A v2");
    }

    #[test]
    fn test_from_json_lenient_falls_back_to_empty() {
        assert!(Cart::from_json_lenient("not json").is_empty());
        assert!(Cart::from_json_lenient("{}").is_empty());
    }
}
