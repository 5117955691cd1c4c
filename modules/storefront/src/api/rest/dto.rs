use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::contract::model::{
    Order, OrderItem, OrderStatus, Product, ProductSummary, User, UserProfile,
};

/// REST DTO for user representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// `buyer` or `seller`
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile the frontend reports after sign-in
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserReq {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub category: String,
    pub preview_url: String,
    /// Whether a downloadable file is attached
    pub has_file: bool,
    pub seller_id: String,
    pub seller_name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Multipart body of `POST /products`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductForm {
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "19.99")]
    pub price: String,
    pub category: String,
    #[schema(value_type = Option<String>, format = Binary)]
    pub preview_image: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub digital_file: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusDto {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Product projection inside an order item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductDto {
    pub id: Uuid,
    pub title: String,
    pub preview_url: String,
    pub file_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    #[schema(value_type = String, example = "19.99")]
    pub price_at_purchase: Decimal,
    pub product: OrderProductDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: Uuid,
    pub buyer_id: String,
    #[schema(value_type = String, example = "19.99")]
    pub total_amount: Decimal,
    pub status: OrderStatusDto,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemDto>,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<SyncUserReq> for UserProfile {
    fn from(req: SyncUserReq) -> Self {
        Self {
            email: req.email,
            name: req.name,
        }
    }
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            price: p.price,
            category: p.category,
            preview_url: p.preview_url,
            has_file: !p.file_key.is_empty(),
            seller_id: p.seller_id,
            seller_name: p.seller_name,
            active: p.active,
            created_at: p.created_at,
        }
    }
}

impl From<OrderStatus> for OrderStatusDto {
    fn from(s: OrderStatus) -> Self {
        match s {
            OrderStatus::Pending => Self::Pending,
            OrderStatus::Completed => Self::Completed,
            OrderStatus::Failed => Self::Failed,
            OrderStatus::Refunded => Self::Refunded,
        }
    }
}

impl From<ProductSummary> for OrderProductDto {
    fn from(p: ProductSummary) -> Self {
        Self {
            id: p.id,
            title: p.title,
            preview_url: p.preview_url,
            file_key: p.file_key,
        }
    }
}

impl From<OrderItem> for OrderItemDto {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            order_id: item.order_id,
            product_id: item.product_id,
            price_at_purchase: item.price_at_purchase,
            product: item.product.into(),
        }
    }
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            buyer_id: order.buyer_id,
            total_amount: order.total_amount,
            status: order.status.into(),
            created_at: order.created_at,
            items: order.items.into_iter().map(OrderItemDto::from).collect(),
        }
    }
}
