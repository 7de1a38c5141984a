//! The `EXEC` command's shell boundary.
//!
//! spec.md §9 flags `EXEC` as needing a seam so the core dispatcher never
//! shells out directly inside a unit test: [`CommandRunner`] is that seam,
//! injected into [`crate::server::NmServer`] so tests can substitute a fake
//! that just echoes its input.

use std::io::Write as _;
use std::process::{Command, Stdio};

use common::DocError;

/// Runs a program with a file's content piped to its stdin and returns the
/// captured stdout, truncated to a bounded size.
pub trait CommandRunner: Send + Sync {
    /// Executes `program` with `input` on stdin.
    ///
    /// # Errors
    ///
    /// Returns [`common::ErrorCode::SystemError`] if the program cannot be
    /// spawned or exits having written nothing recoverable.
    fn run(&self, program: &str, input: &str) -> Result<String, DocError>;
}

/// Maximum captured `EXEC` output, matching the NM response line's practical
/// budget.
pub const MAX_EXEC_OUTPUT: usize = 4096;

/// A [`CommandRunner`] that actually spawns a shell command, piping `input`
/// on stdin and capturing stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellCommandRunner;

impl CommandRunner for ShellCommandRunner {
    fn run(&self, program: &str, input: &str) -> Result<String, DocError> {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DocError::system_error(format!("failed to spawn: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(input.as_bytes());
        }

        let output = child
            .wait_with_output()
            .map_err(|e| DocError::system_error(format!("failed to wait: {e}")))?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured = captured.replace('\n', " ");
        captured.truncate(MAX_EXEC_OUTPUT);

        // spec.md §9 specifies "Exit code: N\nOutput:\n<stdout>" on success and
        // "Command terminated abnormally\nOutput:\n…" otherwise; NM replies are
        // single-line (`code:message\n`), so the two lines are joined with " | "
        // rather than a literal newline that would break the wire framing.
        let prefix = match output.status.code() {
            Some(code) => format!("Exit code: {code}"),
            None => "Command terminated abnormally".to_string(),
        };
        Ok(format!("{prefix} | Output: {captured}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl CommandRunner for Echo {
        fn run(&self, _program: &str, input: &str) -> Result<String, DocError> {
            Ok(input.to_string())
        }
    }

    #[test]
    fn fake_runner_returns_its_input() {
        let runner = Echo;
        assert_eq!(runner.run("cat", "hello world").unwrap(), "hello world");
    }
}
