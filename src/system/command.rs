use std::process::{Command, Output};

use tracing::debug;

use crate::error::{BlobmanError, Result};

/// Human-readable rendering of a command line, without environment.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Run `cmd` to completion, turning spawn failures and non-zero exits into
/// [`BlobmanError::Command`].
pub fn run(cmd: &mut Command) -> Result<Output> {
    let line = describe(cmd);
    debug!(command = %line, "running");

    let output = cmd.output().map_err(|e| BlobmanError::Command {
        command: line.clone(),
        exit_code: None,
        stderr: e.to_string(),
    })?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!(command = %line, code = ?output.status.code(), %stderr, "command failed");
        Err(BlobmanError::Command {
            command: line,
            exit_code: output.status.code(),
            stderr,
        })
    }
}

/// Split NUL-terminated command output into strings, skipping empties.
pub fn split_nul(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let mut cmd = Command::new("git");
        cmd.args(["ls-tree", "-r", "HEAD"]);
        assert_eq!(describe(&cmd), "git ls-tree -r HEAD");
    }

    #[test]
    fn test_split_nul() {
        assert_eq!(split_nul(b"a.bin\0dir/b c.bin\0"), vec!["a.bin", "dir/b c.bin"]);
        assert!(split_nul(b"").is_empty());
    }

    #[test]
    fn test_missing_program_is_command_error() {
        let mut cmd = Command::new("blobman-definitely-missing-program");
        assert!(matches!(
            run(&mut cmd),
            Err(BlobmanError::Command { exit_code: None, .. })
        ));
    }
}
