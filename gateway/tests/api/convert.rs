use reqwest::multipart;

use crate::helpers::spawn_app;

#[tokio::test]
async fn pdf_passthrough_returns_input_byte_for_byte() {
    let app = spawn_app().await;

    let pdf_bytes = vec![b'%', b'P', b'D', b'F', b'-', 1, 2, 3, 4];
    let form = multipart::Form::new().part(
        "input",
        multipart::Part::bytes(pdf_bytes.clone())
            .file_name("doc.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );

    let response = reqwest::Client::new()
        .post(&app.address)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    let body = response.bytes().await.expect("response body");
    assert_eq!(body.as_ref(), pdf_bytes.as_slice());
}

#[tokio::test]
async fn unknown_type_is_rejected() {
    let app = spawn_app().await;

    let form = multipart::Form::new().part(
        "input",
        multipart::Part::bytes(vec![0, 1, 2, 3])
            .file_name("thing.xyz")
            .mime_str("application/octet-stream")
            .unwrap(),
    );

    let response = reqwest::Client::new()
        .post(&app.address)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn contradictory_type_is_rejected() {
    let app = spawn_app().await;

    let form = multipart::Form::new()
        .part(
            "input",
            multipart::Part::bytes(b"# hello".to_vec())
                .file_name("note.md")
                .mime_str("text/markdown")
                .unwrap(),
        )
        .text("type", "docx");

    let response = reqwest::Client::new()
        .post(&app.address)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn missing_input_is_rejected() {
    let app = spawn_app().await;

    let form = multipart::Form::new().text("type", "html");

    let response = reqwest::Client::new()
        .post(&app.address)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn convert_options_reports_allowed_methods() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &app.address)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
    assert_eq!(response.headers().get("Allow").unwrap(), "POST");
}
