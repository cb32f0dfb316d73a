// Integration testing can be done either by calling library functions directly or by invoking your CLI as a subprocess.
use predicates::prelude::*;
use std::fs;

fn sassify() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("sassify").unwrap()
}

#[test]
fn render_writes_the_stylesheet() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("colors.js");
    let dest = dir.path().join("out").join("colors.scss");
    fs::write(
        &source,
        "export default { colors: { primary: '#fff', secondary: '#000' } };",
    )
    .unwrap();

    let mut cmd = sassify();

    cmd.arg("render").arg(&source).arg(&dest);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("write"));

    assert_eq!(
        fs::read_to_string(&dest).unwrap(),
        "$colors: (\n  primary: #fff,\n  secondary: #000,\n);\n"
    );
}

#[test]
fn render_honours_map_name_and_template() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("theme.mjs");
    let template = dir.path().join("vars.tera");
    let dest = dir.path().join("theme.scss");
    fs::write(&source, "export const spacing = Object.freeze({ small: 4, large: 16 });").unwrap();
    fs::write(
        &template,
        "{% for entry in groups[\"__rootKey__\"] %}$__rootKey__-{{ entry.keyName }}: {{ entry.keyValue }}px;\n{% endfor %}\n",
    )
    .unwrap();

    let mut cmd = sassify();

    cmd.arg("render")
        .arg(&source)
        .arg(&dest)
        .arg("--template")
        .arg(&template)
        .arg("--map-name")
        .arg("space");

    cmd.assert().success();

    assert_eq!(
        fs::read_to_string(&dest).unwrap(),
        "$space-small: 4px;\n$space-large: 16px;\n"
    );
}

#[test]
fn render_fails_without_parent_when_creation_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("colors.js");
    fs::write(&source, "module.exports = { colors: { primary: 'red' } };").unwrap();

    let mut cmd = sassify();

    cmd.arg("render")
        .arg(&source)
        .arg(dir.path().join("missing").join("colors.scss"))
        .arg("--no-create-dirs");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));

    assert!(!dir.path().join("missing").exists());
}

#[test]
fn build_isolates_failing_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.js"), "throw new Error('broken theme');").unwrap();
    fs::write(
        dir.path().join("sizes.js"),
        "module.exports = { sizes: { gutter: 16 } };",
    )
    .unwrap();
    fs::write(
        dir.path().join("sassify.toml"),
        r#"
[[files]]
source = "broken.js"
dest = "scss/broken.scss"

[[files]]
source = "sizes.js"
dest = "scss/sizes.scss"
mapName = "layout"
"#,
    )
    .unwrap();

    let mut cmd = sassify();

    cmd.current_dir(dir.path()).arg("build");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("broken theme"))
        .stderr(predicate::str::contains("1 of 2 file(s) failed"));

    assert_eq!(
        fs::read_to_string(dir.path().join("scss/sizes.scss")).unwrap(),
        "$layout: (\n  gutter: 16,\n);\n"
    );
    assert!(!dir.path().join("scss/broken.scss").exists());
}

#[test]
fn build_skips_empty_exports() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.js"), "export default {};").unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(
        &config,
        "[[files]]\nsource = \"empty.js\"\ndest = \"empty.scss\"\n",
    )
    .unwrap();

    let mut cmd = sassify();

    cmd.arg("build").arg("-c").arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("skip"));

    assert!(!dir.path().join("empty.scss").exists());
}

#[test]
fn build_reports_missing_config() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = sassify();

    cmd.current_dir(dir.path()).arg("build");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("sassify.toml"));
}
