use anyhow::Result;
use gateway::{
    app_settings::get_app_settings,
    startup::Application,
    telemetry::{get_telemetry_subscriber, init_telemetry_subscriber},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let subscriber = get_telemetry_subscriber("gateway", "info", std::io::stdout);
    init_telemetry_subscriber(subscriber);

    let app_settings = get_app_settings().expect("Could not create AppSettings");
    let app = Application::build(app_settings).await?;
    app.run_until_stopped().await?;

    Ok(())
}
