use super::*;
use serde_json::json;

#[test]
fn test_add_to_cart_quantity_defaults_to_one() {
    let dto: AddToCartDto = serde_json::from_value(json!({ "product_id": "p-1" })).unwrap();
    assert_eq!(dto.product_id, "p-1");
    assert_eq!(dto.quantity, 1);
}

#[test]
fn test_create_product_defaults() {
    let dto: CreateProductDto = serde_json::from_value(json!({
        "name": "Mug",
        "price_cents": 1250
    }))
    .unwrap();
    assert!(dto.description.is_none());
    assert_eq!(dto.stock, 0);
}

#[test]
fn test_update_product_dto_all_optional() {
    let dto: UpdateProductDto = serde_json::from_value(json!({ "stock": 4 })).unwrap();
    assert!(dto.name.is_none());
    assert!(dto.price_cents.is_none());
    assert_eq!(dto.stock, Some(4));
}

#[test]
fn test_update_product_dto_omits_unset_fields() {
    let dto = UpdateProductDto { price_cents: Some(999), ..UpdateProductDto::default() };
    assert_eq!(serde_json::to_value(&dto).unwrap(), json!({ "price_cents": 999 }));
}

#[test]
fn test_product_query_dto_default() {
    let dto = ProductQueryDto::default();
    assert!(dto.search.is_none());
    assert!(!dto.in_stock);
}

#[test]
fn test_product_query_dto_display() {
    let dto = ProductQueryDto { search: Some("mug".to_string()), in_stock: true };
    let display = format!("{}", dto);
    assert!(display.contains("search: Some(\"mug\")"));
    assert!(display.contains("in_stock: true"));
}

#[test]
fn test_update_order_status_parses_lowercase() {
    let dto: UpdateOrderStatusDto = serde_json::from_value(json!({ "status": "shipped" })).unwrap();
    assert_eq!(dto.status, OrderStatus::Shipped);

    let bad = serde_json::from_value::<UpdateOrderStatusDto>(json!({ "status": "Shipped" }));
    assert!(bad.is_err());
}
