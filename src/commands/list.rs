//! The `psylab list` command.

use anyhow::Result;

use psylab_engine::ExperimentKind;

pub fn execute() -> Result<()> {
    for kind in ExperimentKind::ALL {
        println!("{:<12} {}", kind.name(), kind.title());
    }
    Ok(())
}
