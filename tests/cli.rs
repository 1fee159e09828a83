//! Runs the built binary against dumps in a temp directory.
//!
//! Run with: cargo test --test cli

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn photometa(dir: &Path, args: &[&str]) -> Output {
    let out = Command::new(env!("CARGO_BIN_EXE_photometa"))
        .arg("--config-dir")
        .arg(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "photometa {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    out
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn set_rating_then_resolve() {
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("photo.jpg.json");
    std::fs::write(&dump, "{}").unwrap();
    let dump_arg = dump.to_str().unwrap();

    let out = photometa(tmp.path(), &["set-rating", dump_arg, "4"]);
    assert!(stdout(&out).contains("Rating 4 written to 5 namespaces"));

    photometa(tmp.path(), &["set-tags", dump_arg, "Places/Italy/Rome"]);

    let out = stdout(&photometa(tmp.path(), &["resolve", tmp.path().to_str().unwrap()]));
    assert!(out.contains("photo.jpg.json"), "{out}");
    assert!(out.contains("(4)"), "{out}");
    assert!(out.contains("Places/Italy/Rome"), "{out}");
    assert!(out.contains("Resolved 1 image, 0 failed"), "{out}");
}

#[test]
fn sidecar_only_mode_leaves_dump_untouched() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("photometa.toml"),
        "[sidecar]\nwriting_mode = \"sidecar_only\"\n",
    )
    .unwrap();
    let dump = tmp.path().join("photo.jpg.json");
    std::fs::write(&dump, "{}").unwrap();

    photometa(tmp.path(), &["set-comment", dump.to_str().unwrap(), "Harbour at dusk"]);

    assert_eq!(std::fs::read_to_string(&dump).unwrap(), "{}");
    let sidecar = std::fs::read_to_string(tmp.path().join("photo.jpg.json.xmp")).unwrap();
    assert!(sidecar.contains("Harbour at dusk"));
}

#[test]
fn gps_decode_prints_degrees() {
    let tmp = TempDir::new().unwrap();
    let out = stdout(&photometa(tmp.path(), &["gps", "decode", "33,27.40734S"]));
    let degrees: f64 = out.lines().next().unwrap().trim().parse().unwrap();
    assert!((degrees + 33.456789).abs() < 1e-6);
}

#[test]
fn orientation_applies_actions() {
    let tmp = TempDir::new().unwrap();
    let out = stdout(&photometa(
        tmp.path(),
        &["orientation", "1", "--apply", "rotate90", "--apply", "rotate90"],
    ));
    assert!(out.contains("Result: 3"), "{out}");
}

#[test]
fn gen_config_output_passes_check_config() {
    let tmp = TempDir::new().unwrap();
    let toml = stdout(&photometa(tmp.path(), &["gen-config"]));
    std::fs::write(tmp.path().join("photometa.toml"), toml).unwrap();

    let out = stdout(&photometa(tmp.path(), &["check-config"]));
    assert!(out.contains("Configuration is valid"));
}
