use reqwest::multipart;
use tempfile::tempdir;

use crate::helpers::{spawn_app_with, write_fake_executable};

const FAKE_MARKUP_CONVERTER: &str = "#!/bin/sh\nsleep 0.5\ncat >/dev/null\nprintf 'PDF-FAKE'\n";
const CONCURRENT_REQUESTS: usize = 6;

fn markdown_form() -> multipart::Form {
    multipart::Form::new().part(
        "input",
        multipart::Part::bytes(b"# hello".to_vec())
            .file_name("note.md")
            .mime_str("text/markdown")
            .unwrap(),
    )
}

/// With `max_concurrent_jobs = 1` and `max_queued_jobs = 1` against a slow
/// backend, bursting more requests than the pipeline can hold must turn at
/// least one of them away with 503 rather than queuing it unboundedly.
#[tokio::test]
async fn bursting_past_capacity_rejects_some_requests_as_queue_full() {
    let dir = tempdir().expect("tempdir");
    let markup_executable = write_fake_executable(dir.path(), "fake-pandoc", FAKE_MARKUP_CONVERTER);

    let app = spawn_app_with(|settings| {
        settings.converters.markup_executable = Some(markup_executable.display().to_string());
    })
    .await;

    let client = reqwest::Client::new();

    let handles: Vec<_> = (0..CONCURRENT_REQUESTS)
        .map(|_| {
            let client = client.clone();
            let address = app.address.clone();
            tokio::spawn(async move {
                client
                    .post(&address)
                    .multipart(markdown_form())
                    .send()
                    .await
                    .expect("request should still get a response")
            })
        })
        .collect();

    let mut ok_count = 0;
    let mut rejected_count = 0;

    for handle in handles {
        let response = handle.await.expect("task join");
        match response.status() {
            reqwest::StatusCode::OK => ok_count += 1,
            reqwest::StatusCode::SERVICE_UNAVAILABLE => rejected_count += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert!(rejected_count > 0, "expected at least one 503 under burst load");
    assert!(ok_count > 0, "expected at least one request to still succeed");
    assert_eq!(ok_count + rejected_count, CONCURRENT_REQUESTS);
}
