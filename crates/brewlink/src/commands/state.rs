//! `brewlink state <name>` -- request a machine state transition.

use brewlink_core::{Machine, MachineState};

use crate::cli::{GlobalOpts, StateArgs};
use crate::error::CliError;

pub async fn run(args: &StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = super::discover(global).await?;
    let machine = session.machine().await?;

    let state = MachineState::from_wire(&args.state);
    machine.set_state(state).await?;
    println!("Requested state: {state}");

    session.coordinator.dispose().await;
    Ok(())
}
