use clap::Parser;
use std::fs;
use std::path::Path;

use phpgrep_cli::cli::Opts;
use phpgrep_cli::program;

fn run(args: &[&str]) -> anyhow::Result<bool> {
    let mut argv = vec!["phpgrep"];
    argv.extend_from_slice(args);
    let opts = Opts::parse_from(argv);
    program::run(opts)
}

fn write_php(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.display().to_string()
}

#[test]
fn test_match_and_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_php(dir.path(), "f1.php", "<?php\nvar_dump('1');\n");

    assert!(run(&[&file, r#"var_dump(${"*"})"#]).unwrap());
    assert!(!run(&[&file, "var_export($x)"]).unwrap());
}

#[test]
fn test_multi_target() {
    let dir = tempfile::tempdir().unwrap();
    let f1 = write_php(dir.path(), "f1.php", "<?php var_dump('1');\n");
    let f2 = write_php(dir.path(), "f2.php", "<?php var_dump('2');\n");

    let targets = format!("{f1},{f2}");
    assert!(run(&[&targets, r#"var_dump(${"str"})"#]).unwrap());
}

#[test]
fn test_recursive_walk_and_extension_filter() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("src").join("deep");
    fs::create_dir_all(&sub).unwrap();
    write_php(&sub, "hit.php", "<?php f(42);\n");
    write_php(&sub, "ignored.txt", "<?php f(42);\n");

    let target = dir.path().display().to_string();
    assert!(run(&[&target, "f(42)"]).unwrap());
    // a text file is not scanned even though its contents would match
    fs::remove_file(sub.join("hit.php")).unwrap();
    assert!(!run(&[&target, "f(42)"]).unwrap());
}

#[test]
fn test_exclude_regexp() {
    let dir = tempfile::tempdir().unwrap();
    let vendor = dir.path().join("vendor");
    fs::create_dir_all(&vendor).unwrap();
    write_php(&vendor, "lib.php", "<?php f(42);\n");

    let target = dir.path().display().to_string();
    assert!(run(&[&target, "f(42)"]).unwrap());
    assert!(!run(&[&target, "--exclude", "/vendor/", "f(42)"]).unwrap());
}

#[test]
fn test_filters_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_php(
        dir.path(),
        "consts.php",
        "<?php\nvar_dump(FOO);\nvar_dump(BAR);\n",
    );

    assert!(run(&[&file, r#"$_(${"x:const"})"#, "x=FOO"]).unwrap());
    assert!(!run(&[&file, r#"$_(${"x:const"})"#, "x=MISSING"]).unwrap());
}

#[test]
fn test_exclude_results_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_php(dir.path(), "f.php", "<?php\nf(42);\n");
    let exclude = dir.path().join("seen.txt");
    fs::write(&exclude, format!("{file}:2: f(42)\n")).unwrap();

    assert!(run(&[&file, "f(42)"]).unwrap());
    assert!(!run(&[
        &file,
        "--exclude-results",
        exclude.to_str().unwrap(),
        "f(42)"
    ])
    .unwrap());
}

#[test]
fn test_replace_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_php(
        dir.path(),
        "legacy.php",
        "<?php\n$v = legacy_call(1);\n$w = legacy_call($x + 2);\n",
    );

    let matched = run(&[
        "-i",
        "--format",
        "new_call({{.arg}})",
        &file,
        r#"legacy_call(${"arg:expr"})"#,
    ])
    .unwrap();
    assert!(matched);
    let contents = fs::read_to_string(&file).unwrap();
    assert_eq!(contents, "<?php\n$v = new_call(1);\n$w = new_call($x + 2);\n");
}

#[test]
fn test_parse_errors_are_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_php(dir.path(), "bad.php", "<?php if (\n");
    write_php(dir.path(), "good.php", "<?php f(42);\n");

    let target = dir.path().display().to_string();
    assert!(run(&[&target, "f(42)"]).unwrap());
}

#[test]
fn test_bad_flags_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_php(dir.path(), "f.php", "<?php f(1);\n");

    assert!(run(&[&file, "--workers", "0", "f(1)"]).is_err());
    assert!(run(&[&file, "--progress", "sideways", "f(1)"]).is_err());
    assert!(run(&[&file, "--color-match", "purple", "f(1)"]).is_err());
    assert!(run(&[&file, "f("]).is_err());
    assert!(run(&[&file, "f(1)", "x~["]).is_err());
}
