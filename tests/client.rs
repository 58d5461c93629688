mod common;

use hemmer_provider_foreman::api::{ForemanClient, ForemanError, Location, QueryResponse};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_requests_carry_auth_and_accept_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/locations/4"))
        .and(basic_auth(common::USERNAME, common::PASSWORD))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4, "name": "lyon"})))
        .expect(1)
        .mount(&server)
        .await;

    let location = assert_ok!(common::client(&server).read_location(4).await);
    assert_eq!(location.id, 4);
    assert_eq!(location.name, "lyon");
    assert_eq!(location.domain_ids, Some(vec![]));
}

#[tokio::test]
async fn test_scope_is_sent_with_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/puppetclasses"))
        .and(query_param("location_id", "2"))
        .and(query_param("organization_id", "1"))
        .and(body_json(json!({"puppetclass": {"name": "ntp"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5, "name": "ntp"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/puppetclasses"))
        .and(query_param("location_id", "2"))
        .and(query_param("organization_id", "1"))
        .and(query_param("search", r#"name="ntp""#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::search_results(json!({"ntp": [{"id": 5, "name": "ntp"}]}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(ForemanClient::new(
        &common::client_config(&server).with_scope(Some(2), Some(1))
    ));
    let created = assert_ok!(
        client
            .create_puppet_class(&hemmer_provider_foreman::api::PuppetClass {
                id: 0,
                name: "ntp".into(),
            })
            .await
    );
    assert_eq!(created.id, 5);

    let found = assert_ok!(client.query_puppet_classes("ntp").await);
    assert_eq!(found.results.len(), 1);
    assert_eq!(found.results[0].name, "ntp");
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/locations/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(common::not_found("location")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/locations/2"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "Unable to authenticate user admin"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/locations/3"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": {"id": 3, "errors": {"name": ["has already been taken"]},
                      "full_messages": ["Name has already been taken"]}
        })))
        .mount(&server)
        .await;

    let client = common::client(&server);

    let err = assert_err!(client.read_location(1).await);
    assert!(matches!(err, ForemanError::NotFound(_)), "{}", err);

    let err = assert_err!(client.read_location(2).await);
    match err {
        ForemanError::Authentication(message) => {
            assert!(message.contains("Unable to authenticate user admin"))
        },
        other => panic!("unexpected error: {}", other),
    }

    let location = Location {
        id: 3,
        name: "paris".into(),
        ..Default::default()
    };
    let err = assert_err!(client.update_location(&location).await);
    match err {
        ForemanError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "PUT locations/3 failed: Name has already been taken");
        },
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_delete_ignores_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/compute_profiles/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\": 7, \"name\": \"1-Small\"}"))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(common::client(&server).delete_compute_profile(7).await);
}

#[tokio::test]
async fn test_search_envelope_tolerates_loose_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/compute_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": "3",
            "subtotal": null,
            "page": "1",
            "per_page": 20,
            "results": [{"id": "1", "name": "1-Small"}, {"id": 2, "name": "2-Medium"}]
        })))
        .mount(&server)
        .await;

    let response: QueryResponse<Value> = assert_ok!(
        common::client(&server)
            .search("compute_profiles", r#"name~"Small""#)
            .await
    );
    assert_eq!(response.total, 3);
    assert_eq!(response.subtotal, 0);
    assert_eq!(response.matched(), 2);
}
