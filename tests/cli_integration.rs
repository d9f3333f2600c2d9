//! CLI integration tests for tcrecipe
//!
//! These tests run the binary against recipe files and check both the text
//! and JSON output.

use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command instance for the tcrecipe binary
fn tcrecipe_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("tcrecipe"));
    cmd.env_remove("TCRECIPE_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Write a recipe into a fresh temporary directory
fn write_recipe(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recipe.yeb");
    fs::write(&path, content).unwrap();
    (dir, path)
}

fn json_output(args: &[&str], path: &Path) -> serde_json::Value {
    let output = tcrecipe_cmd()
        .args(args)
        .arg(path)
        .args(["--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    serde_json::from_str(&stdout).unwrap()
}

// =============================================================================
// Resolve
// =============================================================================

#[test]
fn test_resolve_foss_text() {
    tcrecipe_cmd()
        .arg("resolve")
        .arg(fixture("foss-2018a.yeb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("foss 2018a"))
        .stdout(predicate::str::contains("dummy/dummy (system)"))
        .stdout(predicate::str::contains("Dependencies (5):"))
        .stdout(predicate::str::contains("2.0.2-gompi-2018a-OpenBLAS-0.2.20"));
}

#[test]
fn test_resolve_foss_json() {
    let json = json_output(&["resolve"], &fixture("foss-2018a.yeb"));

    assert_eq!(json["name"], "foss");
    assert_eq!(json["version"], "2018a");
    assert_eq!(json["easyblock"], "Toolchain");
    assert_eq!(json["moduleclass"], "toolchain");
    assert_eq!(json["toolchain"]["name"], "dummy");
    assert!(json["description"]
        .as_str()
        .unwrap()
        .starts_with("GNU Compiler Collection (GCC) based compiler toolchain"));
    assert!(json.get("_internal_variables_").is_none());
    assert!(json.get("parameters").is_none());

    let deps = json["dependencies"].as_array().unwrap();
    let names: Vec<_> = deps.iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["GCC", "OpenMPI", "OpenBLAS", "FFTW", "ScaLAPACK"]);

    // GCC has an empty suffix and no toolchain
    assert_eq!(deps[0]["version"], "6.4.0-2.28");
    assert!(deps[0].get("versionsuffix").is_none());
    assert!(deps[0].get("toolchain").is_none());

    // The toolchain anchor expands to a (name, version) pair
    assert_eq!(deps[1]["toolchain"]["name"], "GCC");
    assert_eq!(deps[1]["toolchain"]["version"], "6.4.0-2.28");
    assert_eq!(deps[2]["version"], "0.2.20");
    assert_eq!(deps[3]["toolchain"]["name"], "gompi");
    assert_eq!(deps[3]["toolchain"]["version"], "2018a");
    assert_eq!(deps[4]["versionsuffix"], "-OpenBLAS-0.2.20");
}

#[test]
fn test_resolve_keeps_extra_parameters() {
    let (_dir, path) = write_recipe(
        r#"
name: zlib
version: 1.2.11
homepage: https://zlib.net
description: compression library
toolchain: {name: GCCcore, version: 6.4.0}
sources: [zlib-1.2.11.tar.gz]
builddependencies:
  - [binutils, "2.28"]
"#,
    );

    let json = json_output(&["resolve"], &path);
    assert_eq!(json["moduleclass"], "base");
    assert_eq!(json["parameters"]["sources"][0], "zlib-1.2.11.tar.gz");
    assert_eq!(json["builddependencies"][0]["name"], "binutils");
}

#[test]
fn test_resolve_unknown_anchor_fails() {
    let (_dir, path) = write_recipe(
        r#"
name: foss
version: *version
homepage: https://example.com
description: test
toolchain: {name: dummy, version: dummy}
"#,
    );

    tcrecipe_cmd()
        .arg("resolve")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unresolved reference to anchor 'version'"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_resolve_missing_dependency_version_fails() {
    let (_dir, path) = write_recipe(
        r#"
name: foss
version: 2018a
homepage: https://example.com
description: test
toolchain: {name: dummy, version: dummy}
dependencies:
  - GCC:
      version: 6.4.0-2.28
  - OpenMPI:
      toolchain: [GCC, 6.4.0-2.28]
"#,
    );

    tcrecipe_cmd()
        .arg("resolve")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependencies[1].OpenMPI.version"));
}

#[test]
fn test_resolve_cycle_fails() {
    let (_dir, path) = write_recipe(
        r#"
_internal_variables_:
  - &a !join [x, *b]
  - &b !join [y, *a]
name: foss
version: *a
homepage: https://example.com
description: test
toolchain: {name: dummy, version: dummy}
"#,
    );

    tcrecipe_cmd()
        .arg("resolve")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cyclic anchor reference"));
}

#[test]
fn test_resolve_missing_file() {
    tcrecipe_cmd()
        .args(["resolve", "does-not-exist.yeb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read recipe"));
}

// =============================================================================
// Deps and anchors
// =============================================================================

#[test]
fn test_deps_lists_in_order() {
    tcrecipe_cmd()
        .arg("deps")
        .arg(fixture("foss-2018a.yeb"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "GCC/6.4.0-2.28\nOpenMPI/2.1.2-GCC-6.4.0-2.28\nOpenBLAS/0.2.20-GCC-6.4.0-2.28\nFFTW/3.3.7-gompi-2018a\nScaLAPACK/2.0.2-gompi-2018a-OpenBLAS-0.2.20\n",
        ));
}

#[test]
fn test_deps_build_empty() {
    tcrecipe_cmd()
        .args(["deps", "--build"])
        .arg(fixture("foss-2018a.yeb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependencies."));
}

#[test]
fn test_deps_json_has_full_version() {
    let json = json_output(&["deps"], &fixture("foss-2018a.yeb"));
    let deps = json.as_array().unwrap();

    assert_eq!(deps.len(), 5);
    assert_eq!(deps[1]["full_version"], "2.1.2-GCC-6.4.0-2.28");
}

#[test]
fn test_anchors_text() {
    tcrecipe_cmd()
        .arg("anchors")
        .arg(fixture("foss-2018a.yeb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("&comp = [GCC, 6.4.0-2.28]"))
        .stdout(predicate::str::contains("&blas = OpenBLAS-0.2.20"))
        .stdout(predicate::str::contains("&comp_mpi_tc = [gompi, 2018a]"));
}

#[test]
fn test_anchors_json_in_definition_order() {
    let json = json_output(&["anchors"], &fixture("foss-2018a.yeb"));
    let names: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();

    assert_eq!(
        names,
        vec![
            "version",
            "version_suffix",
            "gccver",
            "comp_name",
            "comp_version",
            "comp",
            "blaslib",
            "blasver",
            "blas",
            "comp_mpi_tc",
        ]
    );
}

#[test]
fn test_anchors_duplicate_fails() {
    let (_dir, path) = write_recipe("_v:\n  - &v 1\n  - &v 2\nname: x\n");

    tcrecipe_cmd()
        .arg("anchors")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Anchor 'v' is defined more than once"));
}

// =============================================================================
// Check
// =============================================================================

#[test]
fn test_check_reports_each_file() {
    let (_dir, bad) = write_recipe("name: broken\n");

    tcrecipe_cmd()
        .arg("check")
        .arg(fixture("foss-2018a.yeb"))
        .arg(&bad)
        .assert()
        .failure()
        .stdout(predicate::str::contains("ok    "))
        .stdout(predicate::str::contains("FAIL  "))
        .stdout(predicate::str::contains("2 checked, 1 failed"));
}

#[test]
fn test_check_json_kinds() {
    let (_dir, bad) = write_recipe("name: broken\n");

    let output = tcrecipe_cmd()
        .args(["check", "--format", "json"])
        .arg(fixture("foss-2018a.yeb"))
        .arg(&bad)
        .assert()
        .failure();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json[0]["ok"], true);
    assert_eq!(json[0]["package"], "foss-2018a");
    assert_eq!(json[1]["ok"], false);
    assert_eq!(json[1]["kind"], "schema");
}

#[test]
fn test_check_all_ok() {
    tcrecipe_cmd()
        .arg("check")
        .arg(fixture("foss-2018a.yeb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 checked, 0 failed"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_project_config_changes_internal_block() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tcrecipe.toml"),
        "[resolve]\ninternal_block = \"_vars_\"\ndefault_moduleclass = \"lib\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("zlib.yeb"),
        r#"
_vars_:
  - &ver 1.2.11
name: zlib
version: *ver
homepage: https://zlib.net
description: compression library
toolchain: {name: dummy, version: dummy}
"#,
    )
    .unwrap();

    let output = tcrecipe_cmd()
        .current_dir(dir.path())
        .args(["resolve", "zlib.yeb", "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["version"], "1.2.11");
    assert_eq!(json["moduleclass"], "lib");
    assert!(json.get("parameters").is_none());
}

#[test]
fn test_config_flag_and_show() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[resolve]\ndefault_moduleclass = \"tools\"\n").unwrap();

    tcrecipe_cmd()
        .arg("config")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("default_moduleclass = \"tools\""));
}

#[test]
fn test_verbose_logs_to_stderr() {
    tcrecipe_cmd()
        .args(["--verbose", "deps"])
        .arg(fixture("foss-2018a.yeb"))
        .assert()
        .success()
        .stderr(predicate::str::contains("[verbose:deps]"));
}

#[test]
fn test_project_config_required_fields() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tcrecipe.toml"),
        "[resolve]\nrequired_fields = [\"name\", \"version\", \"description\", \"toolchain\"]\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("bzip2.yeb"),
        r#"
name: bzip2
version: 1.0.6
description: high-quality data compressor
toolchain: {name: GCCcore, version: 6.4.0}
"#,
    )
    .unwrap();

    let output = tcrecipe_cmd()
        .current_dir(dir.path())
        .args(["resolve", "bzip2.yeb", "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["name"], "bzip2");
    assert!(json.get("homepage").is_none());

    // Without the project config, homepage is required again
    let elsewhere = TempDir::new().unwrap();
    tcrecipe_cmd()
        .current_dir(elsewhere.path())
        .arg("resolve")
        .arg(dir.path().join("bzip2.yeb"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid recipe at homepage"));
}

#[test]
fn test_package_name_includes_version_prefix_and_suffix() {
    let (_dir, path) = write_recipe(
        r#"
name: foss
versionprefix: x
version: 2018a
versionsuffix: -Python-3.6.4
homepage: https://example.com
description: test
toolchain: {name: dummy, version: dummy}
"#,
    );

    tcrecipe_cmd()
        .args(["check", "--format", "json"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"package\":\"foss-x2018a-Python-3.6.4\""));
}
