use std::time::Duration;

use serde_json::json;

use super::*;
use crate::RpcError;
use crate::VersionToken;

#[test]
fn test_collection_args_requires_two_arguments() {
    assert_eq!(collection_args(&[]), Err(RpcError::MissingArguments));
    assert_eq!(
        collection_args(&[json!("orders")]),
        Err(RpcError::MissingArguments)
    );
}

#[test]
fn test_collection_args_requires_string_name() {
    assert_eq!(
        collection_args(&[json!(7), json!({})]),
        Err(RpcError::CollectionNameNotString)
    );
    assert_eq!(
        collection_args(&[json!(""), json!({})]),
        Err(RpcError::EmptyCollectionName)
    );
}

#[test]
fn test_collection_args_ignores_extra_arguments() {
    let args = [json!("orders"), json!({"id": 1}), json!("extra")];
    let (name, payload) = collection_args(&args).unwrap();
    assert_eq!(name, "orders");
    assert_eq!(payload, &json!({"id": 1}));
}

#[test]
fn test_error_messages_match_wire_text() {
    assert_eq!(RpcError::MissingArguments.to_string(), "needs 2 arguments");
    assert_eq!(
        RpcError::CollectionNameNotString.to_string(),
        "Assuming string as col name"
    );
    assert_eq!(RpcError::NoArguments.to_string(), "no arguments received");
}

#[test]
fn test_listener_parse_reads_all_keys() {
    let listener = ListenerInfo::parse(&json!({
        "is-init": false,
        "version": "12",
        "col": "orders",
        "wait-time-sec": 30,
        "unrelated": [1, 2]
    }))
    .unwrap();

    assert_eq!(
        listener,
        ListenerInfo {
            is_init: false,
            version: "12".to_string(),
            collection: "orders".to_string(),
            wait_time_sec: 30,
        }
    );
}

#[test]
fn test_listener_parse_defaults_missing_keys() {
    let listener = ListenerInfo::parse(&json!({"col": "orders"})).unwrap();
    assert!(!listener.is_init);
    assert_eq!(listener.version, "");
    assert_eq!(listener.wait_time_sec, 0);
}

#[test]
fn test_listener_parse_rejects_wrong_types() {
    assert_eq!(
        ListenerInfo::parse(&json!({"is-init": "yes"})),
        Err(RpcError::InvalidListenerField {
            key: "is-init",
            value: "\"yes\"".to_string(),
        })
    );
    assert_eq!(
        ListenerInfo::parse(&json!({"version": 3}))
            .unwrap_err()
            .to_string(),
        "version invalid value: 3"
    );
    assert!(ListenerInfo::parse(&json!({"col": null})).is_err());
    assert!(ListenerInfo::parse(&json!({"wait-time-sec": 1.5})).is_err());
    assert!(matches!(
        ListenerInfo::parse(&json!(["col", "orders"])),
        Err(RpcError::ListenerNotMapping(_))
    ));
}

#[test]
fn test_first_call_request_ignores_version() {
    let request = ListenerInfo {
        is_init: true,
        version: "not-a-number".to_string(),
        collection: "orders".to_string(),
        wait_time_sec: 5,
    }
    .into_request()
    .unwrap();

    assert!(request.is_first_call);
    assert_eq!(request.known_version, None);
    assert_eq!(request.timeout, Duration::from_secs(5));
}

#[test]
fn test_follow_up_request_keeps_version_as_sent() {
    let request = ListenerInfo {
        is_init: false,
        version: "21".to_string(),
        collection: "orders".to_string(),
        wait_time_sec: 1,
    }
    .into_request()
    .unwrap();

    assert!(!request.is_first_call);
    assert_eq!(request.known_version, Some(VersionToken::new("21")));

    // Not canonical, still carried verbatim
    let request = ListenerInfo {
        is_init: false,
        version: "00".to_string(),
        collection: "orders".to_string(),
        wait_time_sec: 1,
    }
    .into_request()
    .unwrap();
    assert_eq!(request.known_version.unwrap().as_str(), "00");
}

#[test]
fn test_follow_up_request_with_empty_version_has_nothing_to_compare() {
    let request = ListenerInfo {
        collection: "orders".to_string(),
        ..Default::default()
    }
    .into_request()
    .unwrap();

    assert_eq!(request.known_version, None);
}

#[test]
fn test_request_rejects_empty_collection() {
    assert_eq!(
        ListenerInfo::default().into_request(),
        Err(RpcError::EmptyCollectionName)
    );

    let no_collection = ListenerInfo {
        version: "v3".to_string(),
        ..Default::default()
    };
    assert_eq!(no_collection.into_request(), Err(RpcError::EmptyCollectionName));
}

#[test]
fn test_negative_wait_time_becomes_zero() {
    let request = ListenerInfo {
        collection: "orders".to_string(),
        wait_time_sec: -10,
        ..Default::default()
    }
    .into_request()
    .unwrap();

    assert_eq!(request.timeout, Duration::ZERO);
}

#[test]
fn test_render_version() {
    assert_eq!(render_version(None), "");
    assert_eq!(render_version(Some(&VersionToken::from(20u64))), "20");
    assert_eq!(render_version(Some(&VersionToken::new("007"))), "007");
}
