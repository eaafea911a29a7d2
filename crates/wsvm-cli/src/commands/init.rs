//! Initialize a new wsvm project.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::{data_dir, Config, CONFIG_FILE};

pub fn run(path: Option<String>) -> Result<()> {
    let base_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };

    println!("{} Initializing wsvm project...", "→".blue());
    init_at(&base_path)?;

    println!();
    println!("{} wsvm project initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  {} wsvm check <module.wasm>", "1.".blue());
    println!("  {} wsvm run <module.wasm> --data '{{\"key\":\"value\"}}'", "2.".blue());

    Ok(())
}

fn init_at(base_path: &Path) -> Result<()> {
    let wsvm_dir = data_dir(base_path);
    std::fs::create_dir_all(&wsvm_dir)
        .with_context(|| format!("Failed to create {}", wsvm_dir.display()))?;
    println!("  {} Created {}", "✓".green(), wsvm_dir.display());

    let config_path = base_path.join(CONFIG_FILE);
    if !config_path.exists() {
        Config::default().save(&config_path)?;
        println!("  {} Created {}", "✓".green(), config_path.display());
    } else {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
    }

    let gitignore_path = wsvm_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "*.db\n*.db-wal\n*.db-shm\n")
            .with_context(|| format!("Failed to write {}", gitignore_path.display()))?;
        println!("  {} Created {}", "✓".green(), gitignore_path.display());
    }
    Ok(())
}
