// ABOUTME: Integration tests for the compose-redeploy binary.
// ABOUTME: Validates --help output and the offline plan command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn redeploy_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("compose-redeploy"))
}

const COMPOSE: &str = r#"
services:
  redis:
    image: redis:7
    container_name: redis-gleam-prod
  gleam:
    image: ghcr.io/team/gleam:linux-arm
    volumes:
      - /srv/gleam/data:/app/data
      - /srv/gleam/logs:/app/logs
    networks:
      gleam:
        ipv4_address: 172.20.0.3
"#;

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("docker-compose.yml"), COMPOSE).unwrap();
    fs::write(
        dir.path().join("redeploy.yml"),
        "manifest: { path: docker-compose.yml }\nskip: [redis-gleam-prod]\n",
    )
    .unwrap();
    dir
}

#[test]
fn help_shows_commands() {
    redeploy_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("redeploy"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn plan_lists_services_without_touching_the_runtime() {
    let dir = project();

    redeploy_cmd()
        .arg("--config")
        .arg(dir.path().join("redeploy.yml"))
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("redis (redis-gleam-prod) skipped"))
        .stdout(predicate::str::contains("gleam (gleam-gleam-1)"))
        .stdout(predicate::str::contains("health: 172.20.0.3"))
        .stdout(predicate::str::contains("bind:   /srv/gleam/data:/app/data:rw"))
        .stdout(predicate::str::contains("ignored bind: /srv/gleam/logs:/app/logs:rw"))
        .stdout(predicate::str::contains("old image kept"));
}

#[test]
fn plan_discovers_config_in_working_directory() {
    let dir = project();

    redeploy_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("gleam (gleam-gleam-1)"));
}

#[test]
fn missing_manifest_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();

    redeploy_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("docker-compose.yml"));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("redeploy.yml"), "health: { attempts: 0 }\n").unwrap();

    redeploy_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("attempts"));
}
