//! `brewlink watch` -- stream live telemetry until interrupted.

use brewlink_core::{Device, Machine, Scale};

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

    // A scale is optional company; a failed scale connect shouldn't end
    // the machine stream.
    let scale = match session.scale().await {
        Ok(scale) => match scale.connect().await {
            Ok(()) => Some(scale),
            Err(e) => {
                tracing::warn!(error = %e, "scale connect failed, continuing without it");
                None
            }
        },
        Err(_) => None,
    };

    println!("Streaming (ctrl-c to stop)...");

    let mut snapshots = machine.snapshots();
    let mut weights = scale.as_ref().map(|s| s.snapshots());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = snapshots.changed() => {
                let Some(snapshot) = snapshot else { break };
                let pressure = snapshot.pressure.unwrap_or(0.0);
                let flow = snapshot.flow.unwrap_or(0.0);
                let group = snapshot.group_temperature.unwrap_or(0.0);
                println!(
                    "machine  {:<10} {:>5.1} bar  {:>4.1} ml/s  {:>5.1} C",
                    snapshot.state.to_string(),
                    pressure,
                    flow,
                    group,
                );
            }
            weight = next_weight(&mut weights) => {
                let Some(weight) = weight else { break };
                println!(
                    "scale    {:>7.1} g  {:>4.1} g/s",
                    weight.weight_grams,
                    weight.flow_grams_per_sec.unwrap_or(0.0),
                );
            }
        }
    }

    if let Some(scale) = &scale {
        scale.disconnect().await;
    }
    machine.disconnect().await;
    session.coordinator.dispose().await;
    Ok(())
}

/// Next scale reading, or pend forever when no scale is attached so the
/// machine branch keeps the select alive.
async fn next_weight(
    stream: &mut Option<brewlink_core::ValueStream<brewlink_core::ScaleSnapshot>>,
) -> Option<std::sync::Arc<brewlink_core::ScaleSnapshot>> {
    match stream {
        Some(stream) => stream.changed().await,
        None => std::future::pending().await,
    }
}
