//! Recipe commands (resolve, deps, anchors, check, config)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::{Dependency, NormalizeOptions, ResolveError, ToolchainDocument};
use crate::storage::{Config, RecipeFile};

/// Print the normalized document
pub fn resolve(output: &Output, options: &NormalizeOptions, file: &Path) -> Result<()> {
    let recipe = RecipeFile::open(file)?;
    let doc = recipe.resolve(options)?;
    output.verbose_ctx(
        "resolve",
        &format!("Resolved {} with {} dependencies", doc.package_name(), doc.dependencies.len()),
    );

    if output.is_json() {
        output.data(&doc);
    } else {
        print_document(&doc);
    }

    Ok(())
}

fn print_document(doc: &ToolchainDocument) {
    println!("{} {}", doc.name, doc.version);
    if let Some(easyblock) = &doc.easyblock {
        println!("  {:<13} {}", "easyblock:", easyblock);
    }
    if let Some(homepage) = &doc.homepage {
        println!("  {:<13} {}", "homepage:", homepage);
    }
    if let Some(description) = &doc.description {
        println!("  {:<13} {}", "description:", description.trim());
    }
    let system = if doc.toolchain.is_system() { " (system)" } else { "" };
    println!("  {:<13} {}{}", "toolchain:", doc.toolchain, system);
    println!("  {:<13} {}", "moduleclass:", doc.moduleclass);
    println!("  {:<13} {}", "package:", doc.package_name());

    print_dependencies("Dependencies", &doc.dependencies);
    if !doc.builddependencies.is_empty() {
        print_dependencies("Build dependencies", &doc.builddependencies);
    }

    if !doc.parameters.is_empty() {
        println!();
        println!("Parameters:");
        for (key, value) in &doc.parameters {
            println!("  {}: {}", key, value);
        }
    }
}

fn print_dependencies(title: &str, deps: &[Dependency]) {
    println!();
    if deps.is_empty() {
        println!("{}: none", title);
        return;
    }

    println!("{} ({}):", title, deps.len());
    println!("{:<16} {:<14} {:<20} FULL VERSION", "NAME", "VERSION", "TOOLCHAIN");
    println!("{}", "-".repeat(72));
    for dep in deps {
        let toolchain = dep
            .toolchain
            .as_ref()
            .map(|tc| tc.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<16} {:<14} {:<20} {}", dep.name, dep.version, toolchain, dep.full_version());
    }
}

/// Print dependencies in recipe order
pub fn deps(output: &Output, options: &NormalizeOptions, file: &Path, build: bool) -> Result<()> {
    let recipe = RecipeFile::open(file)?;
    let doc = recipe.resolve(options)?;
    let deps = if build { &doc.builddependencies } else { &doc.dependencies };
    output.verbose_ctx("deps", &format!("Found {} dependencies", deps.len()));

    if output.is_json() {
        let items: Vec<_> = deps
            .iter()
            .map(|dep| {
                serde_json::json!({
                    "name": dep.name,
                    "version": dep.version,
                    "versionsuffix": dep.versionsuffix,
                    "toolchain": dep.toolchain,
                    "full_version": dep.full_version(),
                })
            })
            .collect();
        output.data(&items);
    } else if deps.is_empty() {
        println!("No dependencies.");
    } else {
        for dep in deps {
            println!("{}", dep);
        }
    }

    Ok(())
}

/// Print the resolved anchor table
pub fn anchors(output: &Output, file: &Path) -> Result<()> {
    let recipe = RecipeFile::open(file)?;
    let table = recipe.anchors()?;
    output.verbose_ctx("anchors", &format!("Resolved {} anchors", table.len()));

    if output.is_json() {
        let items: Vec<_> = table
            .iter()
            .map(|(name, value)| {
                serde_json::json!({
                    "name": name,
                    "value": value,
                })
            })
            .collect();
        output.data(&items);
    } else if table.is_empty() {
        println!("No anchors defined.");
    } else {
        for (name, value) in table.iter() {
            println!("&{} = {}", name, value);
        }
    }

    Ok(())
}

/// Check that each recipe resolves; returns false if any failed
pub fn check(output: &Output, options: &NormalizeOptions, files: &[PathBuf]) -> Result<bool> {
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        let outcome = RecipeFile::open(file).and_then(|recipe| recipe.resolve(options));
        match &outcome {
            Ok(doc) => output.verbose_ctx("check", &format!("{}: ok ({})", file.display(), doc.package_name())),
            Err(e) => output.verbose_ctx("check", &format!("{}: {:#}", file.display(), e)),
        }
        results.push((file, outcome));
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if output.is_json() {
        let items: Vec<_> = results
            .iter()
            .map(|(file, result)| match result {
                Ok(doc) => serde_json::json!({
                    "path": file.display().to_string(),
                    "ok": true,
                    "package": doc.package_name(),
                }),
                Err(e) => serde_json::json!({
                    "path": file.display().to_string(),
                    "ok": false,
                    "kind": e.downcast_ref::<ResolveError>().map(ResolveError::kind).unwrap_or("io"),
                    "error": format!("{:#}", e),
                }),
            })
            .collect();
        output.data(&items);
    } else {
        for (file, result) in &results {
            match result {
                Ok(_) => println!("ok    {}", file.display()),
                Err(e) => println!("FAIL  {}: {}", file.display(), root_message(e)),
            }
        }
        println!();
        println!("{} checked, {} failed", results.len(), failed);
    }

    if failed > 0 {
        output.error(&format!("{} of {} recipe(s) failed to resolve", failed, results.len()));
    }

    Ok(failed == 0)
}

/// The innermost error message, without the file-path context
fn root_message(err: &anyhow::Error) -> String {
    err.root_cause().to_string()
}

/// Print the effective configuration
pub fn show_config(output: &Output, config: &Config) -> Result<()> {
    let resolve = config.resolve();

    if output.is_json() {
        output.data(&serde_json::json!({
            "project_file": config.project_file.as_ref().map(|p| p.display().to_string()),
            "default_format": config.global.default_format,
            "resolve": resolve,
        }));
    } else {
        match &config.project_file {
            Some(path) => println!("# project config: {}", path.display()),
            None => println!("# no project config"),
        }
        let text = toml::to_string_pretty(resolve).context("Failed to serialize configuration")?;
        println!("[resolve]");
        print!("{}", text);
    }

    Ok(())
}
