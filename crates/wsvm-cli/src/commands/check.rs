//! Check a module's imports against the host capability table.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use wsvm_host::{HostServices, ImportStatus, WasmVm};

pub fn run(module: &str) -> Result<()> {
    let bytes = std::fs::read(module).with_context(|| format!("Failed to read {}", module))?;
    let imports = imports_of(bytes)?;

    println!("{} {} imports", "→".blue(), imports.len());
    for import in &imports {
        let mark = if import.provided { "✓".green() } else { "✗".red() };
        println!("  {} {}::{}", mark, import.module, import.name);
    }

    let missing = imports.iter().filter(|i| !i.provided).count();
    if missing > 0 {
        bail!("{} import(s) are not provided by the host", missing);
    }
    println!("{} All imports resolved", "✓".green().bold());
    Ok(())
}

fn imports_of(bytes: Vec<u8>) -> Result<Vec<ImportStatus>> {
    WasmVm::new(bytes, HostServices::new())
        .imports()
        .context("Failed to compile module")
}
