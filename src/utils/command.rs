use crate::error::{ProbeError, Result};
use std::process::{Command, Stdio};

/// Run a source command to completion and capture its stdout.
///
/// A nonzero exit status (or death by signal) is an upstream failure:
/// the caller gets no output and the probe run aborts.
pub fn run_command(source: &'static str, program: &str, args: &[&str]) -> Result<String> {
    tracing::debug!(source, program, ?args, "running source command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|error| ProbeError::Retrieval { source, error })?;

    if !output.status.success() {
        return Err(ProbeError::UpstreamCommandFailure {
            command: source,
            status: output.status.code().unwrap_or(-1),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let out = run_command("echo", "echo", &["hello"]).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_nonzero_status_is_upstream_failure() {
        let err = run_command("false", "false", &[]).unwrap_err();
        match err {
            ProbeError::UpstreamCommandFailure { command, status } => {
                assert_eq!(command, "false");
                assert_eq!(status, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_is_retrieval_failure() {
        let err = run_command("bogus", "definitely-not-a-real-command", &[]).unwrap_err();
        assert!(matches!(err, ProbeError::Retrieval { source: "bogus", .. }));
    }
}
