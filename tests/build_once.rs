use std::error::Error;
use std::fs;

use tempfile::tempdir;

use csswatch::config::Settings;
use csswatch::run;

type TestResult = Result<(), Box<dyn Error>>;

fn one_shot(input: &std::path::Path, output: &std::path::Path) -> Settings {
    let mut settings = Settings::new(input, output);
    settings.watch = false;
    settings
}

#[tokio::test]
async fn empty_pipeline_passes_css_through_unchanged() -> TestResult {
    let input = tempdir()?;
    let output = tempdir()?;
    fs::write(input.path().join("index.css"), "body {background: pink;}")?;

    run(one_shot(input.path(), output.path()), vec![]).await?;

    let built = fs::read_to_string(output.path().join("index.css"))?;
    assert_eq!(built, "body {background: pink;}");
    Ok(())
}

#[tokio::test]
async fn walk_mirrors_the_tree_structure() -> TestResult {
    let input = tempdir()?;
    let output = tempdir()?;

    fs::create_dir_all(input.path().join("widgets/buttons"))?;
    fs::write(input.path().join("index.css"), "a{}")?;
    fs::write(input.path().join("widgets/buttons/index.css"), "b{}")?;
    fs::write(input.path().join("widgets/notes.txt"), "not css")?;

    run(one_shot(input.path(), output.path()), vec![]).await?;

    assert_eq!(fs::read_to_string(output.path().join("index.css"))?, "a{}");
    assert_eq!(
        fs::read_to_string(output.path().join("widgets/buttons/index.css"))?,
        "b{}"
    );
    assert!(!output.path().join("widgets/notes.txt").exists());
    Ok(())
}

#[tokio::test]
async fn allow_listed_assets_are_copied() -> TestResult {
    let input = tempdir()?;
    let output = tempdir()?;

    fs::create_dir_all(input.path().join("img"))?;
    fs::write(input.path().join("img/logo.svg"), "<svg/>")?;
    fs::write(input.path().join("img/raw.psd"), "binary")?;

    let mut settings = one_shot(input.path(), output.path());
    settings.copy_assets = vec!["svg".into()];

    run(settings, vec![]).await?;

    assert_eq!(fs::read_to_string(output.path().join("img/logo.svg"))?, "<svg/>");
    assert!(!output.path().join("img/raw.psd").exists());
    Ok(())
}

#[tokio::test]
async fn vendored_subtrees_are_not_built() -> TestResult {
    let input = tempdir()?;
    let output = tempdir()?;

    fs::create_dir_all(input.path().join("node_modules/pkg"))?;
    fs::write(input.path().join("node_modules/pkg/index.css"), "vendor{}")?;
    fs::write(input.path().join("index.css"), "mine{}")?;

    run(one_shot(input.path(), output.path()), vec![]).await?;

    assert!(output.path().join("index.css").exists());
    assert!(!output.path().join("node_modules/pkg/index.css").exists());
    Ok(())
}

#[tokio::test]
async fn building_twice_is_idempotent() -> TestResult {
    let input = tempdir()?;
    let output = tempdir()?;
    fs::write(input.path().join("index.css"), ".card { margin: 0; }")?;

    run(one_shot(input.path(), output.path()), vec![]).await?;
    let first = fs::read(output.path().join("index.css"))?;

    run(one_shot(input.path(), output.path()), vec![]).await?;
    let second = fs::read(output.path().join("index.css"))?;

    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn missing_input_root_is_fatal() -> TestResult {
    let somewhere = tempdir()?;
    let output = tempdir()?;
    let settings = one_shot(&somewhere.path().join("does-not-exist"), output.path());

    assert!(run(settings, vec![]).await.is_err());
    Ok(())
}
