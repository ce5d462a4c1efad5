//! `brewlink status` -- one-shot machine overview.

use brewlink_core::{Device, Machine};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn run(global: &GlobalOpts) -> Result<(), CliError> {
    let session = super::discover(global).await?;
    let machine = session.machine().await?;

    machine
        .connect()
        .await
        .map_err(|source| CliError::ConnectionFailed {
            device: machine.id().to_owned(),
            source,
        })?;

    if let Some(info) = machine.info() {
        println!("Model:     {}", info.model.as_deref().unwrap_or("-"));
        println!("Serial:    {}", info.serial.as_deref().unwrap_or("-"));
        println!(
            "Firmware:  {}",
            info.firmware_version.as_deref().unwrap_or("-")
        );
    }

    if let Some(settings) = machine.shot_settings().latest() {
        if let Some(volume) = settings.target_shot_volume {
            println!("Shot:      {volume:.0} g target");
        }
    }

    if let Some(levels) = machine.water_levels().latest() {
        if let Some(current) = levels.current_percentage {
            let warning = if levels.is_low() { "  (low!)" } else { "" };
            println!("Water:     {current:.0}%{warning}");
        }
    }

    machine.disconnect().await;
    session.coordinator.dispose().await;
    Ok(())
}
