// resolve.rs — `dg resolve`: show the effective directory policy.

use dg_config::Project;
use dg_policy::{resolve, EffectivePolicy};

pub fn execute(project: &Project, path: &str, json: bool) -> anyhow::Result<()> {
    let snapshot = project.load_snapshot()?;
    let effective = resolve(&snapshot.structure, path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }
    print_summary(&effective);
    Ok(())
}

fn print_summary(effective: &EffectivePolicy) {
    println!("Path:        {}", effective.path);
    if effective.is_default {
        println!("Anchor:      (none, no directory policy covers this path)");
        return;
    }
    println!("Anchor:      {}", dir(effective.anchor.as_deref().unwrap_or_default()));
    println!(
        "Chain:       {}",
        effective.chain.iter().map(|p| dir(p)).collect::<Vec<_>>().join(" -> ")
    );
    println!(
        "Kinds:       {}",
        describe(&effective.allowed_component_kinds, effective.component_kinds_from.as_deref())
    );
    println!(
        "Extensions:  {}",
        describe(&effective.allowed_extensions, effective.extensions_from.as_deref())
    );
    if effective.requires_scaffold.is_empty() {
        println!("Scaffold:    -");
    }
    for rule in &effective.requires_scaffold {
        println!("Scaffold:    {} (from {})", rule.pattern, dir(&rule.declared_in));
    }
}

fn describe(values: &std::collections::BTreeSet<String>, from: Option<&str>) -> String {
    if values.is_empty() {
        return "any".to_string();
    }
    let list = values.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    match from {
        Some(from) => format!("[{}] (from {})", list, dir(from)),
        None => format!("[{}]", list),
    }
}

fn dir(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
