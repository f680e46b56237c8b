use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use payslip_mailer::{
    helpers::spreadsheet, service::PayslipService, AppConfig, SmtpMailer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting payslip run");

    let config = AppConfig::from_env().context("invalid mail relay configuration")?;
    let records = spreadsheet::load_employees(&config.input_path)
        .with_context(|| format!("failed to load {}", config.input_path.display()))?;

    let mailer = SmtpMailer::new(&config.mail);
    let service = PayslipService::new(mailer, config.output_dir.clone());
    service.run(&records).await;

    Ok(())
}
