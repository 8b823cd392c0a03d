use std::error::Error;
use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;

use csswatch::config::{load_and_validate, load_from_path};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn minimal_file_gets_defaults() -> TestResult {
    let dir = tempdir()?;
    let styles = dir.path().join("styles");
    fs::create_dir(&styles)?;

    let file = dir.path().join("csswatch.toml");
    fs::write(
        &file,
        format!(
            "input = {:?}\noutput = {:?}\n",
            styles,
            dir.path().join("out")
        ),
    )?;

    let settings = load_and_validate(&file)?;
    assert_eq!(settings.index_name, "index.css");
    assert!(settings.copy_assets.is_empty());
    assert_eq!(settings.vendor_dirs, vec!["node_modules".to_string()]);
    assert!(settings.watch);
    assert!(!settings.verbose);
    Ok(())
}

#[test]
fn explicit_options_override_defaults() -> TestResult {
    let dir = tempdir()?;
    let file = dir.path().join("csswatch.toml");
    fs::write(
        &file,
        r#"
input = "styles"
output = "public/css"
index_name = "*.entry.css"
copy_assets = ["png", "svg"]
vendor_dirs = ["node_modules", "bower_components"]
watch = false
verbose = true
"#,
    )?;

    // Raw load only; "styles" does not exist here, so validation would fail.
    let settings = load_from_path(&file)?;
    assert_eq!(settings.input, PathBuf::from("styles"));
    assert_eq!(settings.index_name, "*.entry.css");
    assert_eq!(settings.copy_assets, vec!["png".to_string(), "svg".to_string()]);
    assert_eq!(settings.vendor_dirs.len(), 2);
    assert!(!settings.watch);
    assert!(settings.verbose);
    Ok(())
}

#[test]
fn missing_required_keys_fail_to_parse() -> TestResult {
    let dir = tempdir()?;
    let file = dir.path().join("csswatch.toml");
    fs::write(&file, "output = \"out\"\n")?;

    assert!(load_from_path(&file).is_err());
    Ok(())
}

#[test]
fn validation_rejects_a_missing_input_root() -> TestResult {
    let dir = tempdir()?;
    let file = dir.path().join("csswatch.toml");
    fs::write(
        &file,
        format!(
            "input = {:?}\noutput = {:?}\n",
            dir.path().join("nope"),
            dir.path().join("out")
        ),
    )?;

    assert!(load_and_validate(&file).is_err());
    Ok(())
}
