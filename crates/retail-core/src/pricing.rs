//! # Pricing Engine
//!
//! Computes the price a customer pays for one unit of a product, given the
//! shelf price and the promotions that are active for it.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  effective_price(base, active promotions)                               │
//! │                                                                         │
//! │  none active      → base, has_promotion = false                         │
//! │  percentage v     → base × (1 − v/100), floored at 0                    │
//! │  fixed v          → max(0, base − v)                                    │
//! │                                                                         │
//! │  several active   → exactly one applies: the LOWEST promotion id.       │
//! │                     Discounts never stack.                              │
//! │                                                                         │
//! │  Rounding: half away from zero to whole cents, once, at the end.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is a pure function: same inputs, same output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::Promotion;

/// Basis points in 100%.
const FULL_BPS: i64 = 10_000;

// =============================================================================
// Discount
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Discount {
    /// Percentage off, in basis points (2000 = 20%).
    Percentage { bps: i64 },
    /// Amount off, per unit.
    Fixed { amount: Money },
}

impl Discount {
    #[inline]
    pub const fn percentage_bps(bps: i64) -> Self {
        Discount::Percentage { bps }
    }

    #[inline]
    pub const fn fixed(amount: Money) -> Self {
        Discount::Fixed { amount }
    }

    /// Applies the discount to one unit price.
    ///
    /// ## Example
    /// ```rust
    /// use retail_core::money::Money;
    /// use retail_core::pricing::Discount;
    ///
    /// let base = Money::from_cents(10000);
    /// assert_eq!(Discount::percentage_bps(2000).apply(base).cents(), 8000);
    /// assert_eq!(Discount::fixed(Money::from_cents(1500)).apply(base).cents(), 8500);
    /// ```
    pub fn apply(&self, base: Money) -> Money {
        match *self {
            Discount::Percentage { bps } => base.scale_bps(FULL_BPS - bps).clamp_non_negative(),
            Discount::Fixed { amount } => (base - amount).clamp_non_negative(),
        }
    }
}

// =============================================================================
// Effective Price
// =============================================================================

/// Result of pricing one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedAmount {
    pub price: Money,
    /// The promotion that produced `price`, if one applied.
    pub promotion_id: Option<i64>,
}

impl PricedAmount {
    #[inline]
    pub fn has_promotion(&self) -> bool {
        self.promotion_id.is_some()
    }
}

/// Prices one unit given `(promotion_id, discount)` pairs that are already
/// known to be active for the product.
///
/// ## Example
/// ```rust
/// use retail_core::money::Money;
/// use retail_core::pricing::{effective_price, Discount};
///
/// let base = Money::from_cents(10000);
///
/// let none = effective_price(base, &[]);
/// assert_eq!(none.price, base);
/// assert!(!none.has_promotion());
///
/// // Promotion 3 wins over promotion 8: lowest id applies.
/// let priced = effective_price(
///     base,
///     &[(8, Discount::percentage_bps(5000)), (3, Discount::fixed(Money::from_cents(1500)))],
/// );
/// assert_eq!(priced.price.cents(), 8500);
/// assert_eq!(priced.promotion_id, Some(3));
/// ```
pub fn effective_price(base: Money, active: &[(i64, Discount)]) -> PricedAmount {
    match active.iter().min_by_key(|(id, _)| *id) {
        Some((id, discount)) => PricedAmount {
            price: discount.apply(base),
            promotion_id: Some(*id),
        },
        None => PricedAmount {
            price: base,
            promotion_id: None,
        },
    }
}

/// Prices a unit of stock held by `store_id` on `date`, picking the
/// applicable promotions out of `candidates`.
///
/// A candidate applies when it is active on `date` and is either
/// system-wide or scoped to `store_id`. Callers pass the promotions that
/// link the product; this function does not check product membership.
pub fn price_for_store<'a, I>(base: Money, candidates: I, store_id: i64, date: NaiveDate) -> PricedAmount
where
    I: IntoIterator<Item = &'a Promotion>,
{
    let active: Vec<(i64, Discount)> = candidates
        .into_iter()
        .filter(|p| p.is_active_on(date) && p.applies_to_store(store_id))
        .map(|p| (p.id, p.discount()))
        .collect();

    effective_price(base, &active)
}

// =============================================================================
// Unit Tests
// =============================================================================
