//! Per-request browser conversion: single-page render with request
//! interception.

use base64::Engine;
use chromiumoxide::cdp::browser_protocol::emulation::SetScriptExecutionDisabledParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams, FulfillRequestParams,
    HeaderEntry, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{self, ErrorReason};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::BrowserError;
use crate::resource::Resource;

use super::supervisor::{BrowserRef, Supervisor};

/// Render `input` (treated as HTML) plus its `resources` to a PDF using the
/// currently live browser.
pub async fn convert(
    supervisor: &Supervisor,
    settings: &Settings,
    input: &[u8],
    resources: &[Resource],
) -> Result<Vec<u8>, BrowserError> {
    let browser_ref = supervisor.acquire().ok_or(BrowserError::NotAvailable)?;

    let host = format!("http://{}.invalid", Uuid::new_v4().simple());
    let encoding = detect_encoding(input);
    let html = encoding_rs::UTF_8.decode(input).0.into_owned();

    render(&browser_ref, settings, &host, &html, &encoding, resources).await
}

fn detect_encoding(input: &[u8]) -> String {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(input, true);
    detector.guess(None, true).name().to_string()
}

async fn render(
    browser_ref: &BrowserRef,
    settings: &Settings,
    host: &str,
    html: &str,
    encoding: &str,
    resources: &[Resource],
) -> Result<Vec<u8>, BrowserError> {
    let new_page = browser_ref.with(|browser| {
        let browser = browser.clone();
        async move { browser.new_page("about:blank").await }
    });
    let page = new_page.await?;

    let outcome = tokio::time::timeout(
        settings.pdf_render_timeout,
        render_on_page(&page, settings, host, html, encoding, resources),
    )
    .await;

    if let Err(error) = page.close().await {
        tracing::warn!(%error, "failed to close browser page");
    }

    outcome.unwrap_or(Err(BrowserError::ConvertTimeout))
}

async fn render_on_page(
    page: &Page,
    settings: &Settings,
    host: &str,
    html: &str,
    encoding: &str,
    resources: &[Resource],
) -> Result<Vec<u8>, BrowserError> {
    // Untrusted input: no outbound fetches, no script execution, no cached
    // responses leaking across requests sharing the same renderer.
    page.execute(network::EnableParams::default()).await?;
    page.execute(
        network::SetCacheDisabledParams::builder()
            .cache_disabled(true)
            .build()
            .expect("required fields set"),
    )
    .await?;
    page.execute(
        network::EmulateNetworkConditionsParams::builder()
            .offline(true)
            .latency(0.0)
            .download_throughput(0.0)
            .upload_throughput(0.0)
            .build()
            .expect("required fields set"),
    )
    .await?;
    page.execute(
        SetScriptExecutionDisabledParams::builder()
            .value(true)
            .build()
            .expect("required fields set"),
    )
    .await?;

    page.execute(
        fetch::EnableParams::builder()
            .patterns(vec![RequestPattern::default()])
            .build(),
    )
    .await?;

    let mut events = page.event_listener::<EventRequestPaused>().await?;

    let host = host.to_string();
    let html = html.to_string();
    let encoding = encoding.to_string();
    let resources = resources.to_vec();
    let interceptor_page = page.clone();

    let interceptor = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            handle_intercepted_request(&interceptor_page, &event, &host, &html, &encoding, &resources)
                .await;
        }
    });

    page.goto(&host).await?;
    page.wait_for_navigation().await?;

    let pdf = page
        .pdf(
            PrintToPdfParams::builder()
                .paper_width(8.27)
                .paper_height(11.69)
                .build(),
        )
        .await?;

    interceptor.abort();
    Ok(pdf)
}

/// Rules evaluated in order: serve the document at the host URL, abort
/// anything whose initiator isn't the host (origin isolation), serve a
/// matching resource, else let the request proceed, which, with offline
/// mode enabled, resolves as a deny.
async fn handle_intercepted_request(
    page: &Page,
    event: &EventRequestPaused,
    host: &str,
    html: &str,
    encoding: &str,
    resources: &[Resource],
) {
    let request_id = event.request_id.clone();
    let url = &event.request.url;

    if url == host || url == &format!("{host}/") {
        let _ = page
            .execute(
                FulfillRequestParams::builder()
                    .request_id(request_id)
                    .response_code(200)
                    .response_headers(vec![
                        HeaderEntry::new("Content-Type", format!("text/html;charset={encoding}")),
                        HeaderEntry::new("Access-Control-Allow-Origin", host),
                    ])
                    .body(base64::engine::general_purpose::STANDARD.encode(html.as_bytes()))
                    .build()
                    .expect("required fields set"),
            )
            .await;
        return;
    }

    let initiator_is_host = event
        .request
        .headers
        .get("Referer")
        .map(|referer| referer.starts_with(host))
        .unwrap_or(false);

    if !initiator_is_host {
        let _ = page
            .execute(
                FailRequestParams::builder()
                    .request_id(request_id)
                    .error_reason(ErrorReason::Aborted)
                    .build()
                    .expect("required fields set"),
            )
            .await;
        return;
    }

    let path = url.strip_prefix(host).unwrap_or(url).trim_start_matches('/');

    if let Some(resource) = resources.iter().find(|r| r.name == path) {
        let _ = page
            .execute(
                FulfillRequestParams::builder()
                    .request_id(request_id)
                    .response_code(200)
                    .response_headers(vec![
                        HeaderEntry::new("Content-Type", resource.content_type.clone()),
                        HeaderEntry::new("Access-Control-Allow-Origin", host),
                    ])
                    .body(base64::engine::general_purpose::STANDARD.encode(&resource.bytes))
                    .build()
                    .expect("required fields set"),
            )
            .await;
        return;
    }

    let _ = page
        .execute(
            ContinueRequestParams::builder()
                .request_id(request_id)
                .build()
                .expect("required fields set"),
        )
        .await;
}
