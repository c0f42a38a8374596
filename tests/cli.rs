//! End-to-end tests driving the built `iiif-gen` binary.
//!
//! Each test runs in its own temp directory (also the working directory, so
//! no stray `iiif-gen.toml` is picked up) with the generator's environment
//! variables cleared.

use image::{Rgb, RgbImage};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "IMAGES_DIR",
    "OUTPUT_DIR",
    "IIIF_BASE_URL",
    "MANIFEST_BASE_URL",
    "METADATA_FILE",
    "IIIF_GEN_CONFIG",
    "RUST_LOG",
];

fn iiif_gen(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_iiif-gen"));
    cmd.current_dir(dir);
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// `tmp/images` holding one 100×200 JPEG and one 50×50 PNG.
fn images_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let images = tmp.path().join("images");
    std::fs::create_dir_all(&images).unwrap();
    RgbImage::from_pixel(100, 200, Rgb([10, 20, 30]))
        .save_with_format(images.join("a.jpg"), image::ImageFormat::Jpeg)
        .unwrap();
    RgbImage::from_pixel(50, 50, Rgb([10, 20, 30]))
        .save_with_format(images.join("b.png"), image::ImageFormat::Png)
        .unwrap();
    tmp
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn help_exits_zero() {
    let tmp = TempDir::new().unwrap();
    let output = iiif_gen(tmp.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("gen-config"));
}

#[test]
fn gen_config_prints_stock_toml() {
    let tmp = TempDir::new().unwrap();
    let output = iiif_gen(tmp.path()).arg("gen-config").output().unwrap();
    assert!(output.status.success());
    let parsed: toml::Value = toml::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["base_url"].as_str(), Some("http://localhost:8182"));
}

#[test]
fn generate_writes_manifests_and_index() {
    let tmp = images_fixture();
    std::fs::write(
        tmp.path().join("meta.csv"),
        "filename,category\na.jpg,portrait\n",
    )
    .unwrap();

    let output = iiif_gen(tmp.path())
        .args(["--images-dir", "images", "--output-dir", "out"])
        .args(["--metadata-file", "meta.csv"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Generated 2 manifests, 1 collection"));
    assert!(out.contains("http://localhost:8182/iiif/3/a.jpg/info.json"));

    let a = read_json(&tmp.path().join("out/a.jpg.json"));
    assert_eq!(a["metadata"][0]["value"]["en"][0], "portrait");
    let index = read_json(&tmp.path().join("out/index.json"));
    assert_eq!(index["items"].as_array().unwrap().len(), 2);
}

#[test]
fn environment_variables_configure_the_run() {
    let tmp = images_fixture();
    let output = iiif_gen(tmp.path())
        .env("IMAGES_DIR", "images")
        .env("OUTPUT_DIR", "out")
        .env("IIIF_BASE_URL", "https://images.example.org")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let a = read_json(&tmp.path().join("out/a.jpg.json"));
    assert_eq!(
        a["items"][0]["items"][0]["items"][0]["body"]["service"][0]["id"],
        "https://images.example.org/iiif/3/a.jpg"
    );
}

#[test]
fn existing_output_needs_force() {
    let tmp = images_fixture();
    let args = ["--images-dir", "images", "--output-dir", "out"];
    assert!(iiif_gen(tmp.path()).args(args).output().unwrap().status.success());

    let again = iiif_gen(tmp.path()).args(args).output().unwrap();
    assert!(again.status.success());
    assert!(stdout(&again).contains("--force"));

    let forced = iiif_gen(tmp.path()).args(args).arg("--force").output().unwrap();
    assert!(forced.status.success());
    assert!(stdout(&forced).contains("Generated 2 manifests"));
}

#[test]
fn check_writes_nothing() {
    let tmp = images_fixture();
    let output = iiif_gen(tmp.path())
        .args(["check", "--images-dir", "images", "--output-dir", "out"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Would write 2 manifests"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn missing_images_dir_is_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let output = iiif_gen(tmp.path())
        .args(["--images-dir", "nope", "--output-dir", "out"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).starts_with("error: images directory not found"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn missing_images_dir_is_reported_before_existing_output() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("out")).unwrap();
    std::fs::write(tmp.path().join("out/a.jpg.json"), "{}").unwrap();

    let output = iiif_gen(tmp.path())
        .args(["--images-dir", "nope", "--output-dir", "out"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).starts_with("error: images directory not found"));
    assert!(!stdout(&output).contains("--force"));
}

#[test]
fn missing_key_column_is_metadata_error() {
    let tmp = images_fixture();
    std::fs::write(tmp.path().join("meta.csv"), "name,category\na.jpg,x\n").unwrap();
    let output = iiif_gen(tmp.path())
        .args(["--images-dir", "images", "--output-dir", "out"])
        .args(["--metadata-file", "meta.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn group_by_flag_writes_group_collections() {
    let tmp = images_fixture();
    std::fs::write(tmp.path().join("meta.csv"), "filename,set\na.jpg,train\nb.png,test\n").unwrap();
    let output = iiif_gen(tmp.path())
        .args(["--images-dir", "images", "--output-dir", "out"])
        .args(["--metadata-file", "meta.csv", "--group-by", "column:set"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(tmp.path().join("out/train.json").exists());
    assert!(tmp.path().join("out/test.json").exists());

    let index = read_json(&tmp.path().join("out/index.json"));
    assert_eq!(index["items"][0]["type"], "Collection");
}

#[test]
fn invalid_group_by_is_rejected_by_parser() {
    let tmp = TempDir::new().unwrap();
    let output = iiif_gen(tmp.path())
        .args(["--group-by", "colour:set"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid grouping"));
}
