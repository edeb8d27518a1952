use std::net::TcpListener;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, rt::signal, web};
use anyhow::Result;
use converters::Gateway;
use converters::queue::Queue;

use crate::app_settings::AppSettings;
use crate::routes::{convert, health};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(settings: AppSettings) -> Result<Self> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr().unwrap().port();
        let server = run(listener, settings)?;
        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the web server and block the current task until it stops, or
    /// until ctrl-c is received.
    pub async fn run_until_stopped(self) -> Result<()> {
        tokio::select! {
            result = self.server => result.map_err(Into::into),
            _ = signal::ctrl_c() => Ok(()),
        }
    }
}

fn run(listener: TcpListener, settings: AppSettings) -> Result<Server> {
    let port = listener.local_addr().expect("TcpListener is invalid").port();

    let converter_settings = settings.converters.into_settings();
    let gateway = Gateway::start(converter_settings);
    let queue = Queue::start(
        gateway.settings.max_queued_jobs,
        gateway.settings.max_concurrent_jobs,
        gateway.health.clone(),
    );

    let gateway = web::Data::new(gateway);
    let queue = web::Data::new(queue);

    // A slow/large upload must not be cut off by actix-web's own client
    // timeout before the converter even gets a chance to time it out.
    let client_request_timeout = gateway.settings.pdf_render_timeout + std::time::Duration::from_secs(5);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .route("/healthcheck", web::get().to(health::health_check))
            .route("/healthcheck", web::method(actix_web::http::Method::OPTIONS).to(health::health_options))
            .route("/", web::post().to(convert::convert))
            .route("/", web::method(actix_web::http::Method::OPTIONS).to(convert::convert_options))
            .app_data(gateway.clone())
            .app_data(queue.clone())
    })
    .client_request_timeout(client_request_timeout)
    .listen(listener)?
    .run();

    tracing::info!(port, "gateway is running");

    Ok(server)
}
