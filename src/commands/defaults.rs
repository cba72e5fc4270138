//! The `psylab defaults` command.

use anyhow::Result;

use psylab_engine::ExperimentKind;

pub fn execute(kind: &str) -> Result<()> {
    let kind: ExperimentKind = kind.parse()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&kind.default_configuration())?
    );
    Ok(())
}
