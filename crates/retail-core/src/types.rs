//! # Domain Types
//!
//! Core domain types used throughout the retail back office.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────────────┐           │
//! │  │   Store     │◄──│    User     │   │  Category/Supplier  │           │
//! │  │  id, name   │   │  role       │   └──────────┬──────────┘           │
//! │  └──────┬──────┘   │  store_id   │              │                      │
//! │         │          └─────────────┘   ┌──────────▼──────────┐           │
//! │         │                            │      Product        │           │
//! │         │                            │  sku (unique)       │           │
//! │         │                            └──────────┬──────────┘           │
//! │         │     ┌─────────────────────────────────┼──────────┐           │
//! │         ▼     ▼                                 ▼          ▼           │
//! │  ┌─────────────────┐   ┌─────────────┐   ┌─────────────────────┐       │
//! │  │ InventoryRecord │   │  SaleItem   │   │ Promotion (+ items) │       │
//! │  │ (product,store) │   │  snapshot   │   │ percentage | fixed  │       │
//! │  │ quantity ≥ 0    │   │  price      │   │ start..=end dates   │       │
//! │  └─────────────────┘   └──────┬──────┘   └─────────────────────┘       │
//! │                               ▼                                         │
//! │                        ┌─────────────┐                                  │
//! │                        │    Sale     │ total = Σ qty × unit price,     │
//! │                        │             │ frozen at creation              │
//! │                        └─────────────┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are the integer primary keys assigned by the database.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::Discount;
use crate::HEAD_OFFICE_STORE_ID;

// =============================================================================
// Role & Actor
// =============================================================================

/// The three account tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Head-office administrator, unrestricted.
    SystemAdmin,
    /// Runs one store.
    StoreManager,
    /// Operates the till in one store.
    Cashier,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SystemAdmin, Role::StoreManager, Role::Cashier];

    /// Stable wire/database name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "system_admin",
            Role::StoreManager => "store_manager",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the canonical names and the short aliases used by older clients
/// (`admin`, `manager`).
impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "system_admin" | "admin" => Ok(Role::SystemAdmin),
            "store_manager" | "manager" => Ok(Role::StoreManager),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            }),
        }
    }
}

/// An authenticated caller, as resolved by the identity provider.
///
/// ## Normalization
/// A system admin always acts from the head office store, so
/// `Actor::new(1, Role::SystemAdmin, Some(3))` has `home_store_id == Some(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
    pub home_store_id: Option<i64>,
}

impl Actor {
    pub fn new(user_id: i64, role: Role, home_store_id: Option<i64>) -> Self {
        let home_store_id = match role {
            Role::SystemAdmin => Some(HEAD_OFFICE_STORE_ID),
            _ => home_store_id,
        };
        Actor {
            user_id,
            role,
            home_store_id,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::SystemAdmin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.id, user.role, user.store_id)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A physical store. Store 1 is the head office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A back office account. The credential hash never leaves the db crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    /// `None` only for accounts that have not been assigned yet.
    pub store_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Partial update of an account. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub store_id: Option<i64>,
}

impl UserUpdate {
    /// Whether the update touches role or store assignment.
    #[inline]
    pub fn reassigns(&self) -> bool {
        self.role.is_some() || self.store_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub contact_info: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A sellable article. Prices live on the per-store inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields of a product as submitted for create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock and shelf price of one product in one store.
///
/// Exactly one record exists per (product_id, store_id) and `quantity`
/// is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryRecord {
    pub id: i64,
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: i64,
    pub price_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// An inventory row as shown to staff: shelf price plus the price after
/// the applicable promotion, evaluated at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedInventory {
    pub product_id: i64,
    pub store_id: i64,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    /// Shelf price before promotions.
    pub original_price: Money,
    /// Price after the applied promotion, if any.
    pub price: Money,
    pub has_promotion: bool,
    pub promotion_id: Option<i64>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Promotions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` is a percentage in basis points (2000 = 20%).
    Percentage,
    /// `discount_value` is an amount in cents.
    Fixed,
}

impl FromStr for DiscountType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err(ValidationError::NotAllowed {
                field: "discount_type".to_string(),
                allowed: vec!["percentage".to_string(), "fixed".to_string()],
            }),
        }
    }
}

/// Where a promotion sits relative to the evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Pending,
    Active,
    Expired,
}

/// A time-boxed discount on a set of products.
///
/// `store_id == None` means the promotion applies in every store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Promotion {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Hundredths: basis points for percentages, cents for fixed amounts.
    pub discount_value: i64,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub store_id: Option<i64>,
    pub created_by: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    /// The discount this promotion grants.
    pub fn discount(&self) -> Discount {
        match self.discount_type {
            DiscountType::Percentage => Discount::percentage_bps(self.discount_value),
            DiscountType::Fixed => Discount::fixed(Money::from_cents(self.discount_value)),
        }
    }

    /// Inclusive on both ends.
    #[inline]
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn status_on(&self, date: NaiveDate) -> PromotionStatus {
        if date < self.start_date {
            PromotionStatus::Pending
        } else if date > self.end_date {
            PromotionStatus::Expired
        } else {
            PromotionStatus::Active
        }
    }

    /// Whether the promotion can apply to stock held by `store_id`.
    #[inline]
    pub fn applies_to_store(&self, store_id: i64) -> bool {
        self.store_id.map_or(true, |s| s == store_id)
    }
}

/// A promotion as submitted for create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PromotionInput {
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Hundredths, as on [`Promotion::discount_value`].
    pub discount_value: i64,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub store_id: Option<i64>,
    pub product_ids: Vec<i64>,
}

/// A promotion with its linked products and computed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PromotionDetail {
    pub promotion: Promotion,
    pub status: PromotionStatus,
    pub product_ids: Vec<i64>,
}

// =============================================================================
// Sales
// =============================================================================

/// A committed sale. `total_cents` is frozen at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub store_id: i64,
    pub cashier_id: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    pub total_cents: i64,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze the unit price at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price() * self.quantity
    }
}

/// One line of a sale request, as submitted by the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

/// A sale together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Work Logs
// =============================================================================

/// Append-only audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WorkLog {
    pub id: i64,
    pub user_id: i64,
    pub store_id: Option<i64>,
    pub action: String,
    /// JSON document describing the action.
    pub details: Option<String>,
    #[ts(as = "String")]
    pub logged_at: DateTime<Utc>,
}

// =============================================================================
// Feature Permissions
// =============================================================================

/// Back office feature areas of the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    UserManagement,
    StoreManagement,
    CategoryManagement,
    SupplierManagement,
    ProductManagement,
    InventoryManagement,
    PromotionManagement,
    SalesManagement,
    PosSystem,
    PermissionManagement,
}

/// The four grant columns of the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PermissionOp {
    View,
    Create,
    Edit,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RolePermission {
    pub role: Role,
    pub feature: Feature,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl RolePermission {
    pub fn allows(&self, op: PermissionOp) -> bool {
        match op {
            PermissionOp::View => self.can_view,
            PermissionOp::Create => self.can_create,
            PermissionOp::Edit => self.can_edit,
            PermissionOp::Delete => self.can_delete,
        }
    }
}

/// New grant values for one (role, feature) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PermissionGrant {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

// =============================================================================
// Deletion Dependents
// =============================================================================

/// Entities whose deletion is guarded by dependent rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Store,
    Supplier,
    Category,
    Product,
    User,
}

impl EntityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Store => "Store",
            EntityKind::Supplier => "Supplier",
            EntityKind::Category => "Category",
            EntityKind::Product => "Product",
            EntityKind::User => "User",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    Users,
    Inventory,
    Sales,
    Products,
    SaleItems,
    PromotionItems,
    WorkLogs,
}

impl DependentKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DependentKind::Users => "users",
            DependentKind::Inventory => "inventory",
            DependentKind::Sales => "sales",
            DependentKind::Products => "products",
            DependentKind::SaleItems => "sale_items",
            DependentKind::PromotionItems => "promotion_items",
            DependentKind::WorkLogs => "work_logs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DependentCount {
    pub kind: DependentKind,
    pub count: i64,
}

/// Per-kind dependent row counts for one guarded entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DependentCounts {
    pub counts: Vec<DependentCount>,
}

impl DependentCounts {
    pub fn push(&mut self, kind: DependentKind, count: i64) {
        self.counts.push(DependentCount { kind, count });
    }

    pub fn get(&self, kind: DependentKind) -> i64 {
        self.counts
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.count)
            .sum()
    }

    pub fn total(&self) -> i64 {
        self.counts.iter().map(|c| c.count).sum()
    }

    #[inline]
    pub fn blocks_deletion(&self) -> bool {
        self.total() > 0
    }
}

/// Lists only the non-zero kinds: `"2 products, 1 sale_items"`.
impl fmt::Display for DependentCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .filter(|c| c.count > 0)
            .map(|c| format!("{} {}", c.count, c.kind.as_str()))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
