use assert_cmd::Command;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use predicates::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn heic_convert() -> Command {
    let mut cmd = Command::cargo_bin("heic-convert").unwrap();
    cmd.env_remove("RUST_LOG").arg("--no-color");
    cmd
}

fn write_png(dir: &Path, name: &str, rgba: [u8; 4]) -> PathBuf {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba(rgba)))
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, buf.into_inner()).unwrap();
    path
}

fn jpeg_with_exif() -> Vec<u8> {
    let mut tiff = b"MM\0*\0\0\0\x08".to_vec();
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0110u16.to_be_bytes());
    tiff.extend_from_slice(&2u16.to_be_bytes());
    tiff.extend_from_slice(&3u32.to_be_bytes());
    tiff.extend_from_slice(b"X1\0\0");
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x01, 0x02, 0xFF, 0xD9]);
    out
}

#[test]
fn converts_directory_with_one_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", [255, 0, 0, 128]);
    write_png(dir.path(), "b.png", [0, 0, 255, 0]);
    std::fs::write(dir.path().join("c.png"), b"corrupt").unwrap();

    heic_convert()
        .args(["--from", "png"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Converted: 2"))
        .stdout(predicate::str::contains("Failed:    1"))
        .stderr(predicate::str::contains("E4002"));

    assert!(dir.path().join("a.jpg").exists());
    assert!(dir.path().join("b.jpg").exists());
    assert!(!dir.path().join("c.jpg").exists());
}

#[test]
fn empty_directory_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();

    heic_convert()
        .args(["--from", "png"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No source files found"));
}

#[test]
fn single_file_prints_no_summary() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "photo.PNG", [10, 20, 30, 255]);

    heic_convert()
        .args(["--from", "png", "--remove-exif"])
        .arg(&png)
        .assert()
        .success()
        .stdout(predicate::str::contains("photo.jpg"))
        .stdout(predicate::str::contains("Summary").not());

    let jpeg = std::fs::read(dir.path().join("photo.jpg")).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn json_batch_report() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", [1, 2, 3, 255]);

    let output = heic_convert()
        .args(["--from", "png", "--json"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["succeeded"], 1);
    assert_eq!(value["summary"]["failed"], 0);
}

#[test]
fn missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();

    heic_convert()
        .args(["--from", "png"])
        .arg(dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn unsupported_single_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, b"hi").unwrap();

    heic_convert()
        .args(["--from", "png"])
        .arg(&txt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4001"));
}

#[test]
fn unknown_source_format_is_rejected() {
    heic_convert()
        .args(["--from", "bmp", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown source format"));
}

#[test]
fn check_exif_reports_remaining_metadata() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("with.jpg"), jpeg_with_exif()).unwrap();
    write_png(dir.path(), "plain.png", [0, 0, 0, 255]);

    heic_convert()
        .args(["--from", "png"])
        .arg(dir.path().join("plain.png"))
        .assert()
        .success();

    heic_convert()
        .arg("--check-exif")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("with.jpg\n  first tag: Model"))
        .stderr(predicate::str::contains("EXIF present").not())
        .stdout(predicate::str::contains("No EXIF"))
        .stdout(predicate::str::contains("With EXIF:    1"));
}

#[test]
fn check_exif_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("with.jpg"), jpeg_with_exif()).unwrap();
    std::fs::write(dir.path().join("broken.jpg"), b"nope").unwrap();

    let output = heic_convert()
        .args(["--check-exif", "--json"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["with_metadata"], 1);
    assert_eq!(value["summary"]["errors"], 1);
}

#[test]
fn show_exif_without_exif() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", [0, 0, 0, 255]);

    heic_convert()
        .args(["--from", "png", "--show-exif"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("EXIF: a.png"))
        .stdout(predicate::str::contains("no EXIF data"));

    assert!(!dir.path().join("a.jpg").exists());
}

#[test]
fn config_file_sets_sources() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", [0, 0, 0, 255]);
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[convert]\nsources = [\"png\"]\nparallel = false\n").unwrap();

    heic_convert()
        .arg("--config")
        .arg(&config)
        .arg(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("a.jpg").exists());
}

#[test]
fn missing_config_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();

    heic_convert()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("E3001"));
}

#[cfg(not(feature = "heif"))]
#[test]
fn bare_run_converts_what_the_build_can_decode() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", [0, 0, 0, 255]);
    std::fs::write(dir.path().join("IMG_0001.HEIC"), b"ftypheic").unwrap();

    heic_convert()
        .current_dir(dir.path())
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("a.jpg"));

    assert!(dir.path().join("a.jpg").exists());
    assert!(!dir.path().join("IMG_0001.jpg").exists());
}

#[test]
fn check_exif_honours_skip_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let hidden = dir.path().join(".backup");
    std::fs::create_dir_all(&hidden).unwrap();
    std::fs::write(hidden.join("old.jpg"), jpeg_with_exif()).unwrap();
    std::fs::write(dir.path().join("with.jpg"), jpeg_with_exif()).unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[scan]\nskip_hidden = true\n").unwrap();

    heic_convert()
        .arg("--check-exif")
        .arg("--config")
        .arg(&config)
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("With EXIF:    1"))
        .stdout(predicate::str::contains("old.jpg").not());
}

#[test]
fn json_logging_from_config() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", [0, 0, 0, 255]);
    let config = dir.path().join("custom.toml");
    std::fs::write(
        &config,
        "[convert]\nsources = [\"png\"]\n\n[logging]\nlevel = \"debug\"\njson = true\n",
    )
    .unwrap();

    heic_convert()
        .arg("--config")
        .arg(&config)
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("\"level\":\"DEBUG\""))
        .stderr(predicate::str::contains("configuration loaded"));
}
