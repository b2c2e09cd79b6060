// tests/build_properties.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::{init_tracing, mock_runner};

use std::fs;
use std::sync::Arc;

use assetdag::config::{load_from_str, ConfigFile, StepConfig};
use assetdag::errors::AssetdagError;
use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::RealFileSystem;
use assetdag::registry::TaskRegistry;
use assetdag::runner::Runner;

#[tokio::test]
async fn steps_run_in_declared_order() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/banner.txt", "");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            "banner",
            TaskConfigBuilder::new()
                .src("banner.txt")
                .append("A")
                .append("B")
                .append("C")
                .build(),
        )
        .build();

    let report = mock_runner(&fs, &cfg).run("banner").await.unwrap();
    assert!(report.is_success());
    assert_eq!(fs.contents("out/banner.txt").as_deref(), Some("ABC"));
}

#[tokio::test]
async fn dependencies_run_first_and_once() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/a.js", "a");
    fs.add_file("src/b.js", "b");

    let cfg = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::new().src("a.js").append("1").build())
        .with_task(
            "b",
            TaskConfigBuilder::new().src("b.js").append("2").after("a").build(),
        )
        .with_task("both", TaskConfigBuilder::new().after("a").after("b").build())
        .build();

    let report = mock_runner(&fs, &cfg).run("both").await.unwrap();

    assert_eq!(report.executed(), vec!["a", "b", "both"]);
    assert_eq!(fs.write_count("out/a.js"), 1);
    assert_eq!(fs.write_count("out/b.js"), 1);
    assert_eq!(fs.contents("out/a.js").as_deref(), Some("a1"));
    assert_eq!(fs.contents("out/b.js").as_deref(), Some("b2"));
}

#[tokio::test]
async fn rebuilding_unchanged_inputs_is_byte_identical() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("less")).unwrap();
    fs::create_dir_all(src.join("app")).unwrap();
    fs::write(
        src.join("less/site.less"),
        "@import \"vars\";\n.nav {\n  color: @brand;\n  a { color: red; }\n}\n",
    )
    .unwrap();
    fs::write(src.join("less/vars.less"), "@brand: #336699;\n").unwrap();
    fs::write(src.join("app/main.js"), "// entry\nvar app = 1;\n").unwrap();
    fs::write(src.join("app/util.js"), "function u() { return 2; }\n").unwrap();

    let cfg = ConfigFileBuilder::new()
        .with_task(
            "less",
            TaskConfigBuilder::new()
                .src("less/site.less")
                .dest("static")
                .step(StepConfig::Less)
                .step(StepConfig::Sourcemap { dir: String::new() })
                .build(),
        )
        .with_task(
            "js",
            TaskConfigBuilder::new()
                .src("app/main.js")
                .src("app/**/*.js")
                .dest("static")
                .concat("app.js")
                .step(StepConfig::Minify)
                .step(StepConfig::Sourcemap { dir: String::new() })
                .build(),
        )
        .with_task("build", TaskConfigBuilder::new().after("less").after("js").build())
        .build();

    let runner = Runner::new(
        Arc::new(TaskRegistry::from_config(&cfg).unwrap()),
        Arc::new(RealFileSystem),
        &src,
        dir.path().join("out"),
    );

    let first = runner.run("build").await.unwrap();
    assert!(first.is_success(), "{:?}", first.first_error());
    let mut changed = first.changed_paths();
    changed.sort();
    assert_eq!(
        changed,
        vec![
            "static/app.js",
            "static/app.js.map",
            "static/site.css",
            "static/site.css.map",
        ]
    );

    let out = dir.path().join("out/static");
    let css = fs::read(out.join("site.css")).unwrap();
    let js = fs::read(out.join("app.js")).unwrap();
    let map = fs::read(out.join("app.js.map")).unwrap();

    let second = runner.run("build").await.unwrap();
    assert!(second.is_success());
    assert!(second.changed_paths().is_empty());
    assert_eq!(fs::read(out.join("site.css")).unwrap(), css);
    assert_eq!(fs::read(out.join("app.js")).unwrap(), js);
    assert_eq!(fs::read(out.join("app.js.map")).unwrap(), map);
}

#[tokio::test]
async fn concatenation_keeps_declared_input_order() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/js/a.js", "var a = 'a';\n");
    fs.add_file("src/js/b.js", "var b = 'b';\n");
    fs.add_file("src/js/main.js", "var main = true;\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            "js",
            TaskConfigBuilder::new()
                .src("js/main.js")
                .src("js/a.js")
                .src("js/b.js")
                .dest("static")
                .concat("bundle.js")
                .build(),
        )
        .build();

    let report = mock_runner(&fs, &cfg).run("js").await.unwrap();
    assert!(report.is_success());
    assert_eq!(
        fs.contents("out/static/bundle.js").as_deref(),
        Some("var main = true;\nvar a = 'a';\nvar b = 'b';\n")
    );
}

#[tokio::test]
async fn missing_inputs_fail_the_task() {
    init_tracing();
    let fs = MockFileSystem::new();

    let cfg = ConfigFileBuilder::new()
        .with_task("js", TaskConfigBuilder::new().src("app/*.js").concat("app.js").build())
        .build();

    let report = mock_runner(&fs, &cfg).run("js").await.unwrap();
    let (task, err) = report.first_error().unwrap();
    assert_eq!(task, "js");
    assert!(matches!(err, AssetdagError::MissingInput { pattern, .. } if pattern == "app/*.js"));
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_back_up_the_tree_is_not_followed() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("less")).unwrap();
    fs::write(src.join("less/site.less"), ".a { color: red; }\n").unwrap();
    std::os::unix::fs::symlink(&src, src.join("less/loop")).unwrap();

    let cfg = ConfigFileBuilder::new()
        .with_task(
            "less",
            TaskConfigBuilder::new().src("**/*.less").dest("css").step(StepConfig::Less).build(),
        )
        .build();
    let runner = Runner::new(
        Arc::new(TaskRegistry::from_config(&cfg).unwrap()),
        Arc::new(RealFileSystem),
        &src,
        dir.path().join("out"),
    );

    let report = runner.run("less").await.unwrap();
    assert!(report.is_success(), "{:?}", report.first_error());
    assert_eq!(report.changed_paths(), vec!["css/less/site.css"]);
}

#[tokio::test]
async fn shipped_js_bundle_separates_files_with_newlines() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/mwbase/static/app/mwachx.module.js", "angular.module('mwachx', []); // module");
    fs.add_file("src/mwbase/static/app/z.js", "console.log('loaded');\n");

    let raw = load_from_str(include_str!("../Assetdag.toml")).unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();

    let report = mock_runner(&fs, &cfg).run("js").await.unwrap();
    assert!(report.is_success(), "{:?}", report.first_error());
    let bundle = fs.contents("out/mwbase/static/mwachx.js").unwrap();
    assert!(
        bundle.starts_with("angular.module('mwachx', []); // module\nconsole.log('loaded');\n"),
        "{bundle}"
    );
}
