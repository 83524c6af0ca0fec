use assert_cmd::prelude::*;
use assert_cmd::cargo::cargo_bin_cmd;

/// Tests that `--help` is handled successfully by the CLI.
///
/// This test verifies:
/// 1. Running `storekeeper-cli --help` exits successfully
/// 2. The help text lists every command group
/// 3. No unexpected stderr output is produced
#[test]
fn test_cli_help_success() {
  let mut cmd = cargo_bin_cmd!("storekeeper-cli");

  let assert = cmd.arg("--help").assert().success();

  let out = assert.get_output();
  let stdout = String::from_utf8_lossy(&out.stdout);
  println!("=== storekeeper-cli --help stdout ===\n\n{}\n=====================================", stdout);

  for group in ["auth", "product", "cart", "order", "admin"] {
    assert!(stdout.contains(group), "expected `{}` in --help output", group);
  }
  assert!(
  	out.stderr.is_empty(),
  	"expected empty stderr for --help, got:\n{}",
  	String::from_utf8_lossy(&out.stderr)
  );
}

/// Tests that a malformed price is rejected before any request is made.
#[test]
fn test_cli_rejects_bad_price() {
  let mut cmd = cargo_bin_cmd!("storekeeper-cli");

  let assert = cmd
    .args(["--server-url", "http://127.0.0.1:9", "product", "create", "--name", "Mug", "--price", "1.234"])
    .assert()
    .failure();

  let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
  assert!(stderr.contains("at most two decimal places"), "unexpected stderr:\n{}", stderr);
}

/// Tests that an unreachable server is reported on stderr with exit code 1.
#[test]
fn test_cli_unreachable_server() {
  let mut cmd = cargo_bin_cmd!("storekeeper-cli");

  let assert = cmd
    .args(["--server-url", "http://127.0.0.1:9", "product", "list"])
    .assert()
    .code(1);

  let out = assert.get_output();
  let stderr = String::from_utf8_lossy(&out.stderr);
  assert!(stderr.starts_with("Error: "), "unexpected stderr:\n{}", stderr);
  assert!(out.stdout.is_empty());
}
