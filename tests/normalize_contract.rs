// tests/normalize_contract.rs
//
// The response contract downstream consumers rely on, checked over a spread of
// vendor payload shapes (including ones the vendor has never been seen to send).

use serde_json::{json, Value};

use echoframe_relay::normalize::{normalize, AiUsage};

fn odd_payloads() -> Vec<Value> {
    vec![
        json!({}),
        json!(null),
        json!(17),
        json!("done"),
        json!([{"score": 1}]),
        json!({"score": null, "label": null, "status": null}),
        json!({"score": {"value": 3}, "label": ["x"]}),
        json!({"detections": null}),
        json!({"detections": [null]}),
        json!({"detections": [{"confidence": "0.7x"}]}),
        json!({"score": "1e400"}),
        json!({"score": -12, "label": ""}),
        json!({"score": 1000}),
    ]
}

#[test]
fn every_payload_yields_a_complete_result() {
    for raw in odd_payloads() {
        let out = normalize(&raw, "media");
        let v = serde_json::to_value(&out).expect("serializable");

        for key in ["label", "mediaUrl", "score", "ai_usage", "status", "raw"] {
            assert!(v.get(key).is_some(), "missing {key} for raw={raw}");
        }
        assert!(!out.label.is_empty(), "raw={raw}");
        assert!(!out.status.is_empty(), "raw={raw}");
        assert!(out.score.is_finite(), "raw={raw}");
        assert_eq!(out.raw, raw);

        if let AiUsage::Derived(n) = out.ai_usage {
            assert!(n <= 100, "raw={raw}");
        }
    }
}

#[test]
fn numeric_score_and_label_are_identity() {
    for (score, label) in [(0.5, "FAKE"), (99.0, "AUTHENTIC"), (42.25, "SUSPICIOUS")] {
        let raw = json!({"score": score, "label": label});
        let out = normalize(&raw, "m");
        assert_eq!(out.score, score);
        assert_eq!(out.label, label);
    }
}

#[test]
fn detections_fill_in_for_missing_score() {
    let out = normalize(&json!({"detections": [{"confidence": 0.81, "label": "FAKE"}]}), "m");
    assert_eq!((out.score, out.label.as_str()), (0.81, "FAKE"));

    let out = normalize(&json!({"detections": [{}]}), "m");
    assert_eq!((out.score, out.label.as_str()), (0.0, "unknown"));
}

#[test]
fn empty_object_maps_to_documented_defaults() {
    let v = serde_json::to_value(normalize(&json!({}), "https://cdn.test/x.jpg")).unwrap();
    assert_eq!(
        v,
        json!({
            "label": "unknown",
            "mediaUrl": "https://cdn.test/x.jpg",
            "score": 0.0,
            "ai_usage": 100,
            "status": "unknown",
            "raw": {}
        })
    );
}

#[test]
fn vendor_ai_usage_wins_even_when_out_of_range() {
    let out = normalize(&json!({"score": 10, "ai_usage": 250}), "m");
    assert_eq!(out.ai_usage, AiUsage::Vendor(json!(250)));
}

#[test]
fn extreme_scores_clamp_derived_usage() {
    assert_eq!(normalize(&json!({"score": 1000}), "m").ai_usage, AiUsage::Derived(0));
    assert_eq!(normalize(&json!({"score": -12}), "m").ai_usage, AiUsage::Derived(100));
}
