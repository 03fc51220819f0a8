use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_scene() -> NamedTempFile {
    let scene = r#"<scene>
  <camera>
    <position>0 2 8</position>
    <focus>0 0 0</focus>
    <heightangle>45</heightangle>
  </camera>
  <object>
    <light><type>directional</type><direction>-1 -1 -1</direction></light>
    <light><type>point</type><color>1 0.5 0.5</color></light>
    <primitive><type>cube</type><diffuse>1 0 0</diffuse></primitive>
    <object>
      <translate>2 0 0</translate>
      <primitive><type>sphere</type></primitive>
      <primitive><type>cone</type></primitive>
    </object>
  </object>
</scene>
"#;
    let mut tmp = NamedTempFile::new().expect("temp scene");
    tmp.write_all(scene.as_bytes()).expect("write scene");
    tmp
}

#[test]
fn summary_reports_loaded_scene() {
    let scene = write_scene();
    let mut cmd = Command::cargo_bin("lumen").expect("binary exists");
    cmd.arg(scene.path())
        .args(["--param1", "5", "--param2", "5"])
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Mode: geometry"))
        .stdout(contains("Built 3 draw items"))
        .stdout(contains("Lights: 2 (2 uploaded)"));
}

#[test]
fn summary_defaults_to_forest() {
    let mut cmd = Command::cargo_bin("lumen").expect("binary exists");
    cmd.arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Mode: fullscreen (forest)"))
        .stdout(contains("Built 0 draw items"));
}

#[test]
fn planet_summary_has_geometry() {
    let mut cmd = Command::cargo_bin("lumen").expect("binary exists");
    cmd.args(["--fullscreen", "planet", "--summary-only"])
        .assert()
        .success()
        .stdout(contains("Mode: planet"));
}

#[test]
fn unknown_flags_fail() {
    let mut cmd = Command::cargo_bin("lumen").expect("binary exists");
    cmd.arg("--warp-speed")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --warp-speed"));
}

#[test]
fn missing_scene_file_still_summarizes() {
    let mut cmd = Command::cargo_bin("lumen").expect("binary exists");
    cmd.args(["/definitely/not/here.xml", "--summary-only"])
        .assert()
        .success()
        .stdout(contains("Mode: geometry"))
        .stdout(contains("Built 0 draw items"));
}
