// validate.rs — `dg validate`: load every config file and report.

use dg_config::{LoaderError, Project};

pub fn execute(project: &Project) -> anyhow::Result<()> {
    let snapshot = match project.load_snapshot() {
        Ok(snapshot) => snapshot,
        Err(LoaderError::Config(e)) if !e.violations().is_empty() => {
            println!("{}", e);
            anyhow::bail!("configuration is invalid ({} violation(s))", e.violations().len());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "Configuration valid: {} component kind(s), {} directory polic(ies), {} operation(s).",
        snapshot.registry.len(),
        snapshot.structure.len(),
        snapshot.operations.len()
    );
    for op in snapshot.operations.iter() {
        println!("  {:<16} {}", op.id, op.describe_phases());
    }
    Ok(())
}
