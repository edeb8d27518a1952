use actix_multipart::Multipart;
use actix_web::{HttpResponse, Responder, web};
use converters::dispatch::Upload;
use converters::queue::Queue;
use converters::resource::Resource;
use converters::{Gateway, error::ConvertError};
use futures::{FutureExt, StreamExt};
use tokio::sync::oneshot;
use tracing::instrument;

use crate::error::ApiError;

#[instrument(skip(gateway, queue, payload))]
pub async fn convert(
    gateway: web::Data<Gateway>,
    queue: web::Data<Queue>,
    mut payload: Multipart,
) -> Result<impl Responder, ApiError> {
    let upload = extract_upload(&mut payload, gateway.settings.max_file_size).await?;

    let (tx, rx) = oneshot::channel();
    let gateway = gateway.into_inner();

    let job: converters::queue::Job = Box::new(move || {
        async move {
            let result = gateway.convert(upload).await;
            let _ = tx.send(result);
        }
        .boxed()
    });

    queue
        .try_enqueue(job)
        .map_err(ApiError::from)?;

    let result = rx
        .await
        .map_err(|_| ApiError::Convert(ConvertError::Internal(anyhow::anyhow!(
            "conversion task dropped its response"
        ))))?;

    match result {
        Ok(pdf) => Ok(HttpResponse::Ok()
            .content_type("application/pdf")
            .body(pdf)),
        Err(err) => Err(ApiError::from(err)),
    }
}

pub async fn convert_options() -> impl Responder {
    HttpResponse::NoContent()
        .insert_header(("Accept", "multipart/form-data"))
        .insert_header(("Allow", "POST"))
        .finish()
}

async fn extract_upload(payload: &mut Multipart, max_file_size: u64) -> Result<Upload, ApiError> {
    let mut input_bytes: Option<Vec<u8>> = None;
    let mut input_name = String::new();
    let mut input_mime: Option<String> = None;
    let mut resources = Vec::new();
    let mut declared_type: Option<String> = None;
    let mut total_size: u64 = 0;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ApiError::Validation(e.to_string()))?;
        let content_disposition = field.content_disposition().cloned();
        let field_name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();

        if field_name == "type" {
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                bytes.extend_from_slice(&chunk.map_err(|e| ApiError::Validation(e.to_string()))?);
            }
            declared_type = Some(
                String::from_utf8(bytes).map_err(|_| ApiError::Validation("type is not a string".into()))?,
            );
            continue;
        }

        let file_name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let mime = field.content_type().map(|m| m.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::Validation(e.to_string()))?;
            total_size += chunk.len() as u64;
            if total_size > max_file_size {
                return Err(ApiError::UploadTooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        match field_name.as_str() {
            "input" => {
                if input_bytes.is_some() {
                    return Err(ApiError::Validation("multiple input fields".into()));
                }
                input_name = file_name;
                input_mime = mime;
                input_bytes = Some(bytes);
            }
            "resources" => {
                resources.push(Resource {
                    name: file_name,
                    content_type: mime.unwrap_or_else(|| "application/octet-stream".into()),
                    bytes,
                });
            }
            other => {
                return Err(ApiError::Validation(format!("unexpected field: {other}")));
            }
        }
    }

    let input_bytes = input_bytes.ok_or_else(|| ApiError::Validation("input is required".into()))?;

    Ok(Upload {
        input_bytes,
        input_name,
        input_mime,
        resources,
        declared_type,
    })
}
