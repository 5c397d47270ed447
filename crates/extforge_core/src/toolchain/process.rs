//! Blocking execution of one external toolchain process.

use std::ffi::OsString;
use std::process::Command;
use std::time::{Duration, Instant};

/// How often a running child is polled when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Why a toolchain process did not succeed.
#[derive(Debug)]
pub(crate) enum ProcessFailure {
    /// The executable could not be started (or waited on).
    Launch(std::io::Error),
    /// The process exited unsuccessfully; carries the rendered exit status.
    Exit(String),
    /// The process exceeded the time limit and was killed.
    Timeout(Duration),
}

/// Renders a command line for logs, quoting arguments that contain spaces.
pub(crate) fn render(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.contains(char::is_whitespace) || arg.is_empty() {
            line.push('"');
            line.push_str(&arg);
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

/// Runs `program` with `args`, inheriting stdout and stderr, and waits for it.
///
/// With a `timeout`, the child is polled and killed once the limit passes.
pub(crate) fn run(
    program: &str,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<(), ProcessFailure> {
    log::debug!("{}", render(program, args));

    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(ProcessFailure::Launch)?;

    let status = match timeout {
        None => child.wait().map_err(ProcessFailure::Launch)?,
        Some(limit) => {
            let started = Instant::now();
            loop {
                if let Some(status) = child.try_wait().map_err(ProcessFailure::Launch)? {
                    break status;
                }
                if started.elapsed() >= limit {
                    // The child may have exited between the poll and the kill.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessFailure::Timeout(limit));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(ProcessFailure::Exit(status.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn render_quotes_spaces() {
        let line = render("cc", &os(&["-c", "my file.c", "-o", "a.o"]));
        assert_eq!(line, r#"cc -c "my file.c" -o a.o"#);
    }

    #[test]
    fn missing_program_is_launch_failure() {
        let err = run("extforge-no-such-tool-xyz", &[], None).unwrap_err();
        assert!(matches!(err, ProcessFailure::Launch(_)));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_reported() {
        assert!(run("true", &[], None).is_ok());
        let err = run("false", &[], None).unwrap_err();
        match err {
            ProcessFailure::Exit(status) => assert!(status.contains('1')),
            other => panic!("expected exit failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_child() {
        let err = run("sleep", &os(&["5"]), Some(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, ProcessFailure::Timeout(_)));
    }
}
