mod common;

use std::time::Duration;

use actix_web::{http::StatusCode, test, web, App};
use common::{connection_body, delta, fake_connector, sse_body, test_state};
use serde_json::{json, Value};
use web_service::{app_config, AppState};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn names(tables: &Value) -> Vec<String> {
    tables
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().or_else(|| t["name"].as_str()).unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn selection_flow_drives_the_prompt_budget() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(test_state("http://localhost:1", None, fake_connector())))
            .configure(app_config),
    )
    .await;

    let connection: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/connections")
            .set_json(connection_body())
            .to_request(),
    )
    .await;
    let connection_id = connection["id"].as_str().unwrap().to_string();

    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/conversations")
            .set_json(json!({"connectionId": connection_id, "databaseName": "app"}))
            .to_request(),
    )
    .await;
    let id = conversation["id"].as_str().unwrap().to_string();
    assert_eq!(conversation["assistantId"], "sql-chat-bot");

    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}/schema"))
            .set_json(json!({"schemaName": "public"}))
            .to_request(),
    )
    .await;
    assert_eq!(conversation["selectedSchemaName"], "public");

    // Budget 4000: t1 (500) fits, t1+t2 (4100) does not, and the greedy
    // prefix stops there even though t3 (5) would fit.
    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/conversations/{id}/default-selection"))
            .to_request(),
    )
    .await;
    assert_eq!(names(&conversation["selectedTableNameList"]), vec!["t1"]);

    // Toggling marks the schema initialized; the default never runs again.
    test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}/tables"))
            .set_json(json!({"tableName": "t1", "selected": false}))
            .to_request(),
    )
    .await;
    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/conversations/{id}/default-selection"))
            .to_request(),
    )
    .await;
    assert!(names(&conversation["selectedTableNameList"]).is_empty());

    test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}/tables"))
            .set_json(json!({"tableNames": ["t1", "t2", "t3"]}))
            .to_request(),
    )
    .await;

    let usage: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/conversations/{id}/token-usage"))
            .to_request(),
    )
    .await;
    assert_eq!(usage, json!({"used": 4105, "max": 4000}));

    // Question is 15 tokens: 15 -> 515 (t1) -> 4115 (t2), then 2 * 4115 >= 4000.
    let composed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/conversations/{id}/prompt"))
            .set_json(json!({"question": "how many users?"}))
            .to_request(),
    )
    .await;
    assert_eq!(names(&composed["budget"]["includedTables"]), vec!["t1", "t2"]);
    assert_eq!(composed["budget"]["used"], 4115);
    assert_eq!(composed["budget"]["remaining"], -115);
    let prompt = composed["prompt"].as_str().unwrap();
    assert!(prompt.contains("CREATE TABLE t1"));
    assert!(!prompt.contains("CREATE TABLE t3"));
}

#[actix_web::test]
async fn unknown_selected_table_is_a_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(test_state("http://localhost:1", None, fake_connector())))
            .configure(app_config),
    )
    .await;

    let connection: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/connections")
            .set_json(connection_body())
            .to_request(),
    )
    .await;
    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/conversations")
            .set_json(json!({"connectionId": connection["id"], "databaseName": "app"}))
            .to_request(),
    )
    .await;
    let id = conversation["id"].as_str().unwrap();

    test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}/schema"))
            .set_json(json!({"schemaName": "public"}))
            .to_request(),
    )
    .await;
    test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}/tables"))
            .set_json(json!({"tableNames": ["ghost"]}))
            .to_request(),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/conversations/{id}/prompt"))
            .set_json(json!({"question": "q"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[actix_web::test]
async fn chat_streams_reply_and_stores_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[&delta("SELECT "), &delta("count(*) FROM users;"), "[DONE]"]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let state = web::Data::new(test_state(&server.uri(), Some("sk-test"), fake_connector()));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(app_config),
    )
    .await;

    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/conversations")
            .set_json(json!({"title": "general"}))
            .to_request(),
    )
    .await;
    let id = conversation["id"].as_str().unwrap().to_string();

    for question in ["how many users?", "and orders?"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/conversations/{id}/chat"))
                .set_json(json!({"question": question}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-message-id"));
        let body = test::read_body(resp).await;
        assert_eq!(body, "SELECT count(*) FROM users;");
    }

    let messages: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/conversations/{id}/messages"))
            .to_request(),
    )
    .await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1]["creatorRole"], "assistant");
    assert_eq!(messages[1]["status"], "DONE");
    assert_eq!(messages[1]["content"], "SELECT count(*) FROM users;");

    // The second request carries the first exchange as history.
    let requests = server.received_requests().await.unwrap();
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let roles: Vec<&str> = second["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(second["messages"][3]["content"], "and orders?");

    assert_eq!(state.conversations.all_messages().await.len(), 4);
}

#[actix_web::test]
async fn failed_upstream_marks_reply_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let state: web::Data<AppState> =
        web::Data::new(test_state(&server.uri(), Some("sk-test"), fake_connector()));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(app_config),
    )
    .await;

    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/conversations")
            .set_json(json!({}))
            .to_request(),
    )
    .await;
    let id = conversation["id"].as_str().unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/conversations/{id}/chat"))
            .set_json(json!({"question": "hi"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(test::read_body(resp).await, "slow down");

    let messages = state.conversations.messages(id).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].status, chat_core::MessageStatus::Failed);
}

#[actix_web::test]
async fn moving_a_conversation_resets_its_selection() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(test_state("http://localhost:1", None, fake_connector())))
            .configure(app_config),
    )
    .await;

    let connection: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/connections")
            .set_json(connection_body())
            .to_request(),
    )
    .await;
    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/conversations")
            .set_json(json!({"connectionId": connection["id"], "databaseName": "app"}))
            .to_request(),
    )
    .await;
    let id = conversation["id"].as_str().unwrap();
    test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}/schema"))
            .set_json(json!({"schemaName": "public"}))
            .to_request(),
    )
    .await;

    let renamed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}"))
            .set_json(json!({"title": "renamed", "databaseName": "app"}))
            .to_request(),
    )
    .await;
    assert_eq!(renamed["title"], "renamed");
    assert_eq!(renamed["selectedSchemaName"], "public");

    let moved: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}"))
            .set_json(json!({"databaseName": "postgres"}))
            .to_request(),
    )
    .await;
    assert_eq!(moved["databaseName"], "postgres");
    assert_eq!(moved["selectedSchemaName"], "");

    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}"))
            .set_json(json!({"connectionId": "nope"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn manual_choice_during_slow_default_selection_wins() {
    let mut connector = fake_connector();
    connector.schema_delay = Duration::from_millis(300);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(test_state("http://localhost:1", None, connector)))
            .configure(app_config),
    )
    .await;

    let connection: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/connections")
            .set_json(connection_body())
            .to_request(),
    )
    .await;
    let conversation: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/conversations")
            .set_json(json!({"connectionId": connection["id"], "databaseName": "app"}))
            .to_request(),
    )
    .await;
    let id = conversation["id"].as_str().unwrap().to_string();
    test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/conversations/{id}/schema"))
            .set_json(json!({"schemaName": "public"}))
            .to_request(),
    )
    .await;

    // The default selection waits on the schema fetch while the user picks t3.
    let (defaulted, _) = tokio::join!(
        async {
            let body: Value = test::call_and_read_body_json(
                &app,
                test::TestRequest::post()
                    .uri(&format!("/api/conversations/{id}/default-selection"))
                    .to_request(),
            )
            .await;
            body
        },
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            test::call_service(
                &app,
                test::TestRequest::put()
                    .uri(&format!("/api/conversations/{id}/tables"))
                    .set_json(json!({"tableNames": ["t3"]}))
                    .to_request(),
            )
            .await
        }
    );
    assert_eq!(names(&defaulted["selectedTableNameList"]), vec!["t3"]);

    let stored: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/conversations/{id}"))
            .to_request(),
    )
    .await;
    assert_eq!(names(&stored["selectedTableNameList"]), vec!["t3"]);
}
