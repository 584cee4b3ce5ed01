#![cfg(all(feature = "gh", unix))]

use std::{os::unix::fs::PermissionsExt as _, path::PathBuf};

use run_fetcher::{
    FetchError, WorkflowRun,
    platform::{GhCli, Platform, RunQuery},
};
use tempfile::TempDir;

/// A stand-in for `gh` that logs its arguments and serves two runs.
const FAKE_GH: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
case "$1 $2" in
"run list")
    echo '[{"databaseId":100,"number":10,"headBranch":"main"},{"databaseId":99,"number":9,"headBranch":"dev"}]'
    ;;
"run download")
    while [ $# -gt 0 ]; do
        case "$1" in
        --dir) dir="$2" ;;
        --name) name="$2" ;;
        esac
        shift
    done
    if [ "$name" != "run-log" ]; then
        echo "no artifact matches any of the names or patterns provided" >&2
        exit 1
    fi
    for file in "$dir/tsp_db.sqlite3" "$dir/logs/run.log"; do
        if [ -e "$file" ]; then
            echo "open $file: file exists" >&2
            exit 1
        fi
    done
    mkdir -p "$dir/logs"
    wc -l < "$(dirname "$0")/calls.log" | tr -d ' ' > "$dir/tsp_db.sqlite3"
    echo log > "$dir/logs/run.log"
    ;;
*)
    echo "unknown command $1 $2" >&2
    exit 2
    ;;
esac
"#;

fn fake_gh() -> (TempDir, GhCli) {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("gh");
    std::fs::write(&program, FAKE_GH).unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
    let gh = GhCli::with_program(program);
    (dir, gh)
}

fn calls(dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join("calls.log"))
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

fn query(branches: &[&str]) -> RunQuery {
    RunQuery {
        repository: "g-adopt/g-adopt".parse().unwrap(),
        workflow: "test.yml".into(),
        limit: 10,
        branches: branches.iter().map(|b| (*b).to_owned()).collect(),
    }
}

#[tokio::test]
async fn lists_runs_with_gh() {
    let (dir, gh) = fake_gh();
    let runs = gh.list_successful_runs(&query(&[])).await.unwrap();
    assert_eq!(runs.numbers(), vec![10, 9]);
    assert_eq!(
        calls(&dir),
        ["run list --repo g-adopt/g-adopt --workflow test.yml --status success --limit 10 --json databaseId,number,headBranch"]
    );
}

#[tokio::test]
async fn filters_branches_after_listing() {
    let (dir, gh) = fake_gh();
    let runs = gh.list_successful_runs(&query(&["main"])).await.unwrap();
    assert_eq!(runs.numbers(), vec![10]);
    assert!(calls(&dir)[0].ends_with("--branch main"));

    let runs = gh
        .list_successful_runs(&query(&["dev", "release"]))
        .await
        .unwrap();
    assert_eq!(runs.numbers(), vec![9]);
}

#[tokio::test]
async fn downloads_into_the_run_directory() {
    let (dir, gh) = fake_gh();
    let destination: PathBuf = dir.path().join("10");
    let run = WorkflowRun {
        database_id: 100,
        number: 10,
        head_branch: None,
    };

    gh.download_artifact(
        &"g-adopt/g-adopt".parse().unwrap(),
        &run,
        "run-log",
        &destination,
    )
    .await
    .unwrap();

    assert!(destination.join("tsp_db.sqlite3").exists());
    let call = &calls(&dir)[0];
    assert!(call.starts_with("run download 100 --repo g-adopt/g-adopt --name run-log --dir "));
}

#[tokio::test]
async fn missing_artifacts_are_classified() {
    let (dir, gh) = fake_gh();
    let run = WorkflowRun {
        database_id: 99,
        number: 9,
        head_branch: None,
    };

    let err = gh
        .download_artifact(
            &"g-adopt/g-adopt".parse().unwrap(),
            &run,
            "coverage",
            &dir.path().join("9"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::ArtifactNotFound { run: 9, .. }));
}

#[tokio::test]
async fn downloading_again_replaces_existing_files() {
    let (dir, gh) = fake_gh();
    let destination = dir.path().join("10");
    let repository = "g-adopt/g-adopt".parse().unwrap();
    let run = WorkflowRun {
        database_id: 100,
        number: 10,
        head_branch: None,
    };

    for _ in 0..2 {
        gh.download_artifact(&repository, &run, "run-log", &destination)
            .await
            .unwrap();
    }

    // The database holds the number of gh calls made when it was written
    assert_eq!(
        std::fs::read_to_string(destination.join("tsp_db.sqlite3"))
            .unwrap()
            .trim(),
        "2"
    );
    assert!(destination.join("logs").join("run.log").exists());
    assert!(
        std::fs::read_dir(dir.path())
            .unwrap()
            .all(|entry| !entry.unwrap().file_name().to_string_lossy().starts_with(".gh-download-")),
        "staging directories are removed"
    );
}
