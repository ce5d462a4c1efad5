//! `brewlink scan` -- discover the gateway and list attached devices.

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn run(global: &GlobalOpts) -> Result<(), CliError> {
    let session = super::discover(global).await?;

    if let Some(endpoint) = session.coordinator.endpoint().await {
        println!("Gateway: {endpoint}");
    }

    if session.devices.is_empty() {
        println!("No devices attached.");
    } else {
        println!("{:<12} {:<8} NAME", "ID", "TYPE");
        for device in &session.devices {
            println!(
                "{:<12} {:<8} {}",
                device.id,
                device.kind.to_string(),
                device.name.as_deref().unwrap_or("-")
            );
        }
    }

    session.coordinator.dispose().await;
    Ok(())
}
