use crate::helpers::spawn_app;

#[tokio::test]
async fn health_check_responds_while_office_and_browser_are_not_real_binaries() {
    let app = spawn_app().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/healthcheck", &app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // None of the configured backend executables exist in the test
    // environment, so the supervisors never reach `healthy`. The endpoint
    // must still respond (never hang or panic), just with 503.
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await.expect("response is valid JSON");
    assert!(body.get("health").is_some());
}

#[tokio::test]
async fn health_check_options_reports_allowed_methods() {
    let app = spawn_app().await;

    let client = reqwest::Client::new();
    let response = client
        .request(reqwest::Method::OPTIONS, format!("{}/healthcheck", &app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
    assert_eq!(response.headers().get("Allow").unwrap(), "GET");
}
