//! Webhook authenticity and status mapping behavior

use advault_backend::payments::signature::{canonical_json, sign_ipn, verify_ipn_signature};
use advault_backend::payments::types::{DepositStatus, IpnPayload, ProviderStatus};
use serde_json::json;

#[test]
fn realistic_ipn_payload_round_trips_signature() {
    // Shaped like an actual NOWPayments IPN callback body
    let payload = json!({
        "payment_id": 5077125051_i64,
        "payment_status": "finished",
        "pay_address": "TNDFkUNA6SPWEG5nhBg1DNmdBpCNknvj4r",
        "price_amount": 100,
        "price_currency": "eur",
        "pay_amount": 165.652609,
        "actually_paid": 165.652609,
        "pay_currency": "usdttrc20",
        "order_id": "6ad6f8ab-2f3c-4c0a-9cde-1d3f1f9a3b55_1700000000",
        "order_description": "Advertising account deposit",
        "payin_hash": "aa6e8c8f3f0e3b5f0f7a0f9f3b1c2d4e",
        "outcome_amount": 164.51,
        "outcome_currency": "usdttrc20"
    });

    let signature = sign_ipn(&payload, "ipn_secret");
    assert!(verify_ipn_signature(&payload, "ipn_secret", &signature));

    // A single flipped byte in the body breaks verification
    let mut tampered = payload.clone();
    tampered["actually_paid"] = json!(265.652609);
    assert!(!verify_ipn_signature(&tampered, "ipn_secret", &signature));
}

#[test]
fn verification_does_not_depend_on_sender_key_order() {
    let sorted = json!({"a": 1, "payment_id": 7, "payment_status": "waiting"});
    let shuffled = json!({"payment_status": "waiting", "a": 1, "payment_id": 7});

    let signature = sign_ipn(&sorted, "secret");
    assert!(verify_ipn_signature(&shuffled, "secret", &signature));
}

#[test]
fn canonical_form_sorts_nested_objects() {
    let value = json!({"z": {"b": [1, {"y": 2, "x": 3}], "a": null}, "m": "text"});
    assert_eq!(
        canonical_json(&value),
        r#"{"m":"text","z":{"a":null,"b":[1,{"x":3,"y":2}]}}"#
    );
}

#[test]
fn status_vocabulary_maps_to_exactly_one_internal_state() {
    let pending = ["waiting", "confirming", "sending"];
    let completed = ["finished", "confirmed"];
    let failed = ["failed", "expired", "refunded"];

    for raw in pending {
        assert_eq!(
            ProviderStatus::parse(raw).settlement(),
            Some(DepositStatus::Pending),
            "{} should stay pending",
            raw
        );
    }
    for raw in completed {
        assert_eq!(
            ProviderStatus::parse(raw).settlement(),
            Some(DepositStatus::Completed),
            "{} should complete",
            raw
        );
    }
    for raw in failed {
        assert_eq!(
            ProviderStatus::parse(raw).settlement(),
            Some(DepositStatus::Failed),
            "{} should fail",
            raw
        );
    }
}

#[test]
fn provider_status_parsing_is_case_and_whitespace_tolerant() {
    assert_eq!(ProviderStatus::parse(" Finished "), ProviderStatus::Finished);
    assert_eq!(ProviderStatus::parse("WAITING"), ProviderStatus::Waiting);
}

#[test]
fn ipn_payload_schema_is_strict_about_required_fields() {
    let ok: Result<IpnPayload, _> = serde_json::from_value(json!({
        "payment_id": "42",
        "payment_status": "waiting"
    }));
    assert!(ok.is_ok());

    let missing_id: Result<IpnPayload, _> = serde_json::from_value(json!({
        "payment_status": "waiting"
    }));
    assert!(missing_id.is_err());

    let missing_status: Result<IpnPayload, _> = serde_json::from_value(json!({
        "payment_id": "42"
    }));
    assert!(missing_status.is_err());
}
