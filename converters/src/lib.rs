//! Converter orchestration layer: supervised office/browser/markup
//! backends, a bounded job queue, health aggregation, and the request
//! dispatcher that ties them together. Transport-agnostic: the `gateway`
//! crate owns HTTP framing and maps `ConvertError` to status codes.

pub mod browser;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod markup;
pub mod office;
pub mod process;
pub mod queue;
pub mod resource;

use std::sync::Arc;

use config::Settings;
use dispatch::{Route, Upload};
use error::ConvertError;
use health::HealthMap;
use resource::Resource;

/// Owns every supervised subsystem and exposes the single `convert` entry
/// point the HTTP layer calls after admission. One instance per process.
pub struct Gateway {
    pub settings: Arc<Settings>,
    pub health: HealthMap,
    office: office::Supervisor,
    browser: browser::Supervisor,
}

impl Gateway {
    pub fn start(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        let health = HealthMap::new();
        health.set(health::WEBSERVER, health::Health::Healthy);

        let office = office::Supervisor::start(settings.clone(), health.clone());
        let browser = browser::Supervisor::start(settings.clone(), health.clone());

        if settings.backends.markup_executable.is_some() {
            health.set(health::PANDOC, health::Health::Healthy);
        }

        Self {
            settings,
            health,
            office,
            browser,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.health
            .is_ready(self.settings.backends.markup_executable.is_some())
    }

    /// Validate, route, and run a single upload to completion. The job
    /// queue gates *admission* into this call; by the time it runs,
    /// `MAX_CONCURRENT` has already been enforced by the caller's
    /// semaphore.
    pub async fn convert(&self, upload: Upload) -> Result<Vec<u8>, ConvertError> {
        dispatch::validate_resource_count(upload.resources.len(), self.settings.max_resource_count)?;
        let effective_type = dispatch::effective_type(&upload)?;

        match dispatch::route(&effective_type) {
            Route::PdfPassthrough => Ok(upload.input_bytes),
            Route::Html => self.convert_html(&upload).await,
            Route::Office => self.convert_office(&upload).await,
            Route::Markup => self.convert_markup(&upload, &effective_type).await,
        }
    }

    async fn convert_html(&self, upload: &Upload) -> Result<Vec<u8>, ConvertError> {
        let resources: Vec<Resource> = upload.resources.clone();
        browser::convert(&self.browser, &self.settings, &upload.input_bytes, &resources)
            .await
            .map_err(ConvertError::from)
    }

    async fn convert_office(&self, upload: &Upload) -> Result<Vec<u8>, ConvertError> {
        let worker = self.office.claim_any().ok_or(ConvertError::Overload)?;
        self.office
            .convert(&worker, &self.settings, upload.input_bytes.clone())
            .await
            .map_err(ConvertError::from)
    }

    async fn convert_markup(&self, upload: &Upload, tag: &str) -> Result<Vec<u8>, ConvertError> {
        let executable = self
            .settings
            .backends
            .markup_executable
            .as_deref()
            .ok_or_else(|| ConvertError::UnsupportedMedia("markup converter not configured".into()))?;

        markup::convert(executable, &self.settings, tag, &upload.input_bytes)
            .await
            .map_err(ConvertError::from)
    }
}
