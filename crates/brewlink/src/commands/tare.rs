//! `brewlink tare` -- zero the scale.

use brewlink_core::Scale;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn run(global: &GlobalOpts) -> Result<(), CliError> {
    let session = super::discover(global).await?;
    let scale = session.scale().await?;

    scale.tare().await?;
    println!("Scale tared.");

    session.coordinator.dispose().await;
    Ok(())
}
