//! Drives the `pipeshell` binary the way a user would, with piped stdin.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn pipeshell(args: &[&str], script: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pipeshell"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start pipeshell");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn transcript_of_a_session() {
    let out = pipeshell(&[], "echo hello | tr a-z A-Z\nexit\n");
    assert_eq!(
        text(&out.stdout),
        "sshell$ echo hello | tr a-z A-Z\n\
         HELLO\n\
         Return status value for 'echo hello | tr a-z A-Z': 0\n\
         sshell$ exit\n"
    );
    assert!(text(&out.stderr).contains("Bye..."));
    assert!(out.status.success());
}

#[test]
fn end_of_input_ends_the_session() {
    let out = pipeshell(&["--quiet", "--prompt", "> "], "echo a\n");
    assert_eq!(text(&out.stdout), "> echo a\na\n> \n");
    assert!(out.status.success());
}

#[test]
fn missing_program_is_reported_by_name() {
    let out = pipeshell(&["--quiet"], "pipeshell-no-such-program-42 | cat\nexit\n");
    let stderr = text(&out.stderr);
    assert!(
        stderr.contains("pipeshell-no-such-program-42: "),
        "stderr was: {stderr}"
    );
    // The session goes on after the failed stage.
    assert!(text(&out.stdout).contains("exit"));
}

#[test]
fn blank_stage_is_reported() {
    let out = pipeshell(&["-c", "echo hi ||  cat"], "");
    let stderr = text(&out.stderr);
    assert!(stderr.contains("stage 2: empty command"), "stderr was: {stderr}");
    assert!(text(&out.stdout).contains("Return status value for 'echo hi ||  cat': 0"));
}

#[test]
fn cd_changes_directory_for_later_stages() {
    let out = pipeshell(&["--quiet"], "cd /\npwd\nexit\n");
    assert!(text(&out.stdout).contains("pwd\n/\n"));
}

#[test]
fn cd_failure_sets_status() {
    let out = pipeshell(&[], "cd /pipeshell/does/not/exist\nexit\n");
    assert!(text(&out.stderr).contains("cd: "));
    assert!(text(&out.stdout).contains("Return status value for 'cd /pipeshell/does/not/exist': 1"));
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn single_command_mode_exit_status() {
    let out = pipeshell(&["-q", "-c", "false"], "");
    assert_eq!(out.status.code(), Some(1));

    let out = pipeshell(&["-q", "-c", "exit 3"], "");
    assert_eq!(out.status.code(), Some(3));

    let out = pipeshell(&["-q", "-c", "echo x | pipeshell-no-such-program-42"], "");
    assert_eq!(out.status.code(), Some(127));
}

#[test]
fn overlong_line_is_rejected() {
    let out = pipeshell(&["-q", "--max-line", "5", "-c", "echo hello"], "");
    assert!(text(&out.stderr).contains("too long"));
    assert!(text(&out.stdout).is_empty());
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn closed_pipe_ends_upstream_quietly() {
    let out = pipeshell(&["-q", "-c", "seq 1 1000000 | head -n 1"], "");
    assert_eq!(text(&out.stdout), "1\n");
    assert_eq!(text(&out.stderr), "");
    assert!(out.status.success());
}
