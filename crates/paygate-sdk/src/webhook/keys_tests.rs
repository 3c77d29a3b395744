//! Tests for key-name normalization.

use super::*;
use serde_json::json;

// ============================================================================
// to_snake_case
// ============================================================================

mod snake_case_tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_snake_case("orderId"), "order_id");
        assert_eq!(to_snake_case("customerSubscriptionId"), "customer_subscription_id");
        assert_eq!(to_snake_case("mdOrder"), "md_order");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_snake_case("PaymentStatus"), "payment_status");
        assert_eq!(to_snake_case("Event"), "event");
    }

    #[test]
    fn test_acronyms_stay_together() {
        assert_eq!(to_snake_case("HTTPStatus"), "http_status");
        assert_eq!(to_snake_case("orderID"), "order_id");
        assert_eq!(to_snake_case("ID"), "id");
    }

    #[test]
    fn test_already_snake_case_is_unchanged() {
        assert_eq!(to_snake_case("authorize_id"), "authorize_id");
        assert_eq!(to_snake_case("status"), "status");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn test_digits_and_dashes() {
        assert_eq!(to_snake_case("address2Line"), "address2_line");
        assert_eq!(to_snake_case("cart-updated"), "cart_updated");
    }
}

// ============================================================================
// normalize_keys
// ============================================================================

mod normalize_tests {
    use super::*;

    /// Verify keys are rewritten at every nesting depth, including inside arrays.
    #[test]
    fn test_nested_structures() {
        let raw = json!({
            "event": "ORDER_STATUS_UPDATED",
            "Order": {
                "orderId": "order-123",
                "paymentStatus": "CAPTURED",
                "Items": [{"itemName": "Widget"}, {"ItemName": "Gadget"}]
            }
        });

        let normalized = normalize_keys(&raw);

        assert_eq!(
            normalized,
            json!({
                "event": "ORDER_STATUS_UPDATED",
                "order": {
                    "order_id": "order-123",
                    "payment_status": "CAPTURED",
                    "items": [{"item_name": "Widget"}, {"item_name": "Gadget"}]
                }
            })
        );
    }

    /// Verify string values that look like identifiers are never rewritten.
    #[test]
    fn test_leaf_values_are_untouched() {
        let raw = json!({"operationType": "declinedByTimeout", "amountValue": 10.5, "flag": null});

        let normalized = normalize_keys(&raw);

        assert_eq!(normalized["operation_type"], "declinedByTimeout");
        assert_eq!(normalized["amount_value"], 10.5);
        assert!(normalized["flag"].is_null());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let raw = json!({"orderId": "o-1"});
        let before = raw.clone();

        let _ = normalize_keys(&raw);

        assert_eq!(raw, before);
    }

    #[test]
    fn test_scalars_and_arrays_pass_through() {
        assert_eq!(normalize_keys(&json!("mdOrder")), json!("mdOrder"));
        assert_eq!(normalize_keys(&json!([1, "aB", true])), json!([1, "aB", true]));
    }

    #[test]
    fn test_custom_case_function() {
        let raw = json!({"order_id": {"payment_status": "NEW"}});

        let upper = normalize_keys_with(&raw, &|k: &str| k.to_uppercase());

        assert_eq!(upper, json!({"ORDER_ID": {"PAYMENT_STATUS": "NEW"}}));
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let mut value = json!({"leafValue": 1});
        for _ in 0..64 {
            value = json!({"innerNode": value});
        }

        let mut cursor = &normalize_keys(&value);
        for _ in 0..64 {
            cursor = &cursor["inner_node"];
        }
        assert_eq!(cursor["leaf_value"], 1);
    }
}
