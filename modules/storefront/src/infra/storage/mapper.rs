use anyhow::anyhow;

use crate::contract::model::{Order, OrderItem, OrderStatus, Product, ProductSummary, Role, User};
use crate::domain::money;
use crate::infra::storage::entity::{order, order_item, product, user};

/// Convert a database entity to a contract model
pub fn user_to_contract(entity: user::Model) -> anyhow::Result<User> {
    let role = Role::parse(&entity.role)
        .ok_or_else(|| anyhow!("user {} has unknown role '{}'", entity.id, entity.role))?;
    Ok(User {
        id: entity.id,
        email: entity.email,
        name: entity.name,
        role,
        created_at: entity.created_at,
        updated_at: entity.updated_at,
    })
}

pub fn product_to_contract(entity: product::Model, seller: Option<user::Model>) -> Product {
    Product {
        id: entity.id,
        title: entity.title,
        description: entity.description,
        price: money::from_cents(entity.price_cents),
        category: entity.category,
        preview_url: entity.preview_url,
        file_key: entity.file_key,
        seller_id: entity.seller_id,
        seller_name: seller.and_then(|s| s.name),
        active: entity.active,
        created_at: entity.created_at,
    }
}

pub fn product_summary(entity: &product::Model) -> ProductSummary {
    ProductSummary {
        id: entity.id,
        title: entity.title.clone(),
        preview_url: entity.preview_url.clone(),
        file_key: entity.file_key.clone(),
    }
}

pub fn item_to_contract(entity: order_item::Model, product: ProductSummary) -> OrderItem {
    OrderItem {
        id: entity.id,
        order_id: entity.order_id,
        product_id: entity.product_id,
        price_at_purchase: money::from_cents(entity.price_at_purchase_cents),
        product,
    }
}

pub fn order_to_contract(entity: order::Model, items: Vec<OrderItem>) -> anyhow::Result<Order> {
    let status = OrderStatus::parse(&entity.status)
        .ok_or_else(|| anyhow!("order {} has unknown status '{}'", entity.id, entity.status))?;
    Ok(Order {
        id: entity.id,
        buyer_id: entity.buyer_id,
        total_amount: money::from_cents(entity.total_cents),
        status,
        created_at: entity.created_at,
        items,
    })
}
