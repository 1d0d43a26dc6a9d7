use std::sync::Arc;
use std::time::Duration;

use cid_codec::{ContentCodec, ContentIdentifier, encode, encode_v1, identifier_of};
use document::{FieldKind, Schema};
use ipfs_client::LocalClient;
use ipfs_client::client_testing_utils::{ScriptedClient, ScriptedResponse};
use retriever::{ErrorKind, RetrievalError, Retriever};
use retriever_config::{ApiFlavor, BackoffStrategy, RetrieverConfig};
use serde::Deserialize;
use serial_test::serial;
use utils::EnvVarGuard;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIGEST_HEX: &str = "0x9d6c2be50f706953479ab9df2ce3edca90b68053c00b3004b7f0accbe1e8eedf";
const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

fn known_id() -> ContentIdentifier {
    DIGEST_HEX.parse().unwrap()
}

fn value_schema() -> Schema {
    Schema::new().required("value", FieldKind::Number)
}

fn test_config(endpoint: &str) -> RetrieverConfig {
    let mut config = RetrieverConfig::default();
    config.client.endpoint = endpoint.to_owned();
    config.client.max_retries = 2;
    config.client.retry_base_delay = Duration::from_millis(5);
    config.client.retry_backoff = BackoffStrategy::Fixed;
    config.client.attempt_timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn end_to_end_over_gateway() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("GET"))
        .and(path(format!("/ipfs/{CID_V0}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value": 42}"#))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let retriever = Retriever::from_config(&test_config(&server.uri())).unwrap();
    let doc = retriever.retrieve(&known_id(), &value_schema()).await.unwrap();

    assert_eq!(doc.get("value").unwrap(), 42);
}

#[tokio::test]
async fn end_to_end_over_rpc() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value": 42, "label": "answer"}"#))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.client.api = ApiFlavor::Rpc;

    #[derive(Deserialize)]
    struct Answer {
        value: u64,
        label: String,
    }

    let retriever = Retriever::from_config(&config).unwrap();
    let answer: Answer = retriever.retrieve_as(&known_id(), &value_schema()).await.unwrap();
    assert_eq!(answer.value, 42);
    assert_eq!(answer.label, "answer");
}

#[tokio::test]
async fn transient_gateway_errors_are_retried() {
    let server = MockServer::start().await;
    let _guard1 = Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount_as_scoped(&server)
        .await;
    let _guard2 = Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value": 1}"#))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let retriever = Retriever::from_config(&test_config(&server.uri())).unwrap();
    assert!(retriever.retrieve(&known_id(), &value_schema()).await.is_ok());
}

#[tokio::test]
async fn failure_kinds_surface_from_the_network() {
    let server = MockServer::start().await;
    let retriever = Retriever::from_config(&test_config(&server.uri())).unwrap();

    let cases = [
        (ResponseTemplate::new(404), ErrorKind::NotFound, 1),
        (ResponseTemplate::new(400), ErrorKind::MalformedIdentifier, 1),
        (ResponseTemplate::new(503), ErrorKind::TransportError, 3),
        (ResponseTemplate::new(200).set_body_string("{\"value\": "), ErrorKind::DecodeError, 1),
        (ResponseTemplate::new(200).set_body_string(r#"{"other": 1}"#), ErrorKind::SchemaViolation, 1),
    ];

    for (response, kind, calls) in cases {
        let _guard = Mock::given(method("GET"))
            .respond_with(response)
            .expect(calls)
            .mount_as_scoped(&server)
            .await;

        let err = retriever.retrieve(&known_id(), &value_schema()).await.unwrap_err();
        assert_eq!(err.kind(), kind, "{err}");
    }
}

#[tokio::test]
async fn schema_violation_names_the_missing_field() {
    let client = ScriptedClient::always(ScriptedResponse::payload(&br#"{"label": "no value"}"#[..]));
    let retriever = Retriever::new(client, &test_config("http://unused"));

    match retriever.retrieve(&known_id(), &value_schema()).await {
        Err(RetrievalError::SchemaViolation(violations)) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].path, "value");
            assert_eq!(violations[0].found, "missing");
        },
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn always_timing_out_client_gives_retrieval_timeout() {
    let client = ScriptedClient::always(ScriptedResponse::Hang);
    let mut config = test_config("http://unused");
    config.client.max_retries = 4;
    config.client.attempt_timeout = Duration::from_millis(200);
    let retriever = Retriever::new(client.clone(), &config);

    let err = retriever.retrieve(&known_id(), &value_schema()).await.unwrap_err();
    assert!(matches!(err, RetrievalError::RetrievalTimeout { attempts: 5 }), "{err:?}");
    assert_eq!(client.num_calls(), 5);
}

#[tokio::test]
async fn malformed_addresses_are_rejected_before_fetching() {
    let client = ScriptedClient::always(ScriptedResponse::payload(&b"{}"[..]));
    let retriever = Retriever::new(client.clone(), &test_config("http://unused"));

    for address in ["", "Qm", "not-a-cid", "bafybeigarbage!!"] {
        let err = retriever.retrieve_address(address, &Schema::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedIdentifier, "{address:?}");
    }
    assert_eq!(client.num_calls(), 0);
}

#[tokio::test]
async fn retrieve_by_any_address_form() {
    let client = ScriptedClient::always(ScriptedResponse::payload(&br#"{"value": 7}"#[..]));
    let retriever = Retriever::new(client, &test_config("http://unused"));
    let v1 = encode_v1(&known_id(), ContentCodec::Raw).unwrap().to_string();

    for address in [CID_V0.to_owned(), format!("/ipfs/{CID_V0}"), v1] {
        let doc = retriever.retrieve_address(&address, &value_schema()).await.unwrap();
        assert_eq!(doc.get("value").unwrap(), 7);
    }
}

#[tokio::test]
async fn local_endpoint_reads_directory_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = LocalClient::new(dir.path()).unwrap();
    let address = store.put(br#"{"value": 42}"#).await.unwrap();
    let id = identifier_of(&address).unwrap();

    let config = test_config(&format!("local://{}", dir.path().display()));
    let retriever = Retriever::from_config(&config).unwrap();
    let doc = retriever.retrieve(&id, &value_schema()).await.unwrap();
    assert_eq!(doc.get("value").unwrap(), 42);

    let missing = ContentIdentifier::from_bytes([1u8; 32]);
    let err = retriever.retrieve(&missing, &value_schema()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn cached_retrievals_fetch_once() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("GET"))
        .and(path(format!("/ipfs/{CID_V0}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"value": 42}"#)
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.cache.enabled = true;
    let retriever = Arc::new(Retriever::from_config(&config).unwrap());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let retriever = retriever.clone();
            tokio::spawn(async move { retriever.retrieve(&known_id(), &value_schema()).await })
        })
        .collect();

    for t in tasks {
        assert_eq!(t.await.unwrap().unwrap().get("value").unwrap(), 42);
    }

    // Served from the cache, even with a different schema.
    let doc = retriever.retrieve(&known_id(), &Schema::new()).await.unwrap();
    assert_eq!(doc.get("value").unwrap(), 42);
    assert_eq!(retriever.cache().unwrap().len(), 1);
}

#[tokio::test]
#[serial(env_var_tests)]
async fn gateway_alias_selects_endpoint() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("GET"))
        .and(path(format!("/ipfs/{CID_V0}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value": 42}"#))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let _primary = EnvVarGuard::remove("IPFS_RETRIEVER_CLIENT_ENDPOINT");
    let _env = EnvVarGuard::set("IPFS_GATEWAY", server.uri());
    let config = RetrieverConfig::new();
    assert_eq!(config.client.endpoint, server.uri());

    let retriever = Retriever::from_config(&config).unwrap();
    let doc = retriever.retrieve(&known_id(), &value_schema()).await.unwrap();
    assert_eq!(doc.get("value").unwrap(), 42);
}

#[test]
fn identifier_round_trip_through_native_address() {
    let address = encode(&known_id()).unwrap();
    assert_eq!(address.to_string(), CID_V0);
    assert_eq!(identifier_of(&address).unwrap(), known_id());
}
