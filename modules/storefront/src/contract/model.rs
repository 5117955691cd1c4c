use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Verified identity of whoever issued the request. Passed explicitly into every
/// operation that depends on who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    /// Identity-provider subject id.
    pub user_id: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "buyer" => Some(Role::Buyer),
            "seller" => Some(Role::Seller),
            _ => None,
        }
    }
}

/// Pure user model for inter-module communication (no serde).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields refreshed on every sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: String,
    /// Public URL of the preview image, empty when none was uploaded.
    pub preview_url: String,
    /// Opaque key into the private asset store, empty when none was uploaded.
    pub file_key: String,
    pub seller_id: String,
    pub seller_name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Product projection carried by order items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub preview_url: String,
    pub file_key: String,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            preview_url: p.preview_url.clone(),
            file_key: p.file_key.clone(),
        }
    }
}

/// A file received at the boundary, already read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub file_name: String,
    pub data: Bytes,
}

/// Typed create-product command produced by the multipart boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: String,
    pub preview: Option<UploadedAsset>,
    pub digital: Option<UploadedAsset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Failed,
        OrderStatus::Refunded,
    ];

    /// Statuses whose items grant download rights.
    pub fn entitling() -> Vec<OrderStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.grants_entitlement())
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(OrderStatus::Pending),
            "completed" => Some(OrderStatus::Completed),
            "failed" => Some(OrderStatus::Failed),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// `Pending -> Completed | Failed`, `Completed -> Refunded`. Everything else is terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Completed, OrderStatus::Refunded)
        )
    }

    /// Only completed orders grant download rights.
    pub fn grants_entitlement(self) -> bool {
        self == OrderStatus::Completed
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub price_at_purchase: Decimal,
    pub product: ProductSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

pub type AssetReader = Box<dyn AsyncRead + Send + Unpin>;

/// An open, entitled download. Dropping it closes the underlying file.
pub struct Download {
    pub file_name: String,
    pub size: Option<u64>,
    pub reader: AssetReader,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 4] = OrderStatus::ALL;

    #[test]
    fn order_status_transition_table() {
        let allowed: Vec<(OrderStatus, OrderStatus)> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (OrderStatus::Pending, OrderStatus::Completed),
                (OrderStatus::Pending, OrderStatus::Failed),
                (OrderStatus::Completed, OrderStatus::Refunded),
            ]
        );
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for to in ALL {
            assert!(!OrderStatus::Failed.can_transition_to(to));
            assert!(!OrderStatus::Refunded.can_transition_to(to));
        }
    }

    #[test]
    fn only_completed_entitles() {
        assert_eq!(OrderStatus::entitling(), vec![OrderStatus::Completed]);
    }

    #[test]
    fn status_strings_parse_back() {
        for s in ALL {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("COMPLETED"), None);
        assert_eq!(Role::parse("seller"), Some(Role::Seller));
        assert_eq!(Role::parse("admin"), None);
    }
}
