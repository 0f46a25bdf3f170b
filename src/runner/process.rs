use std::io;
use std::process::ExitStatus;

use tokio::process::{Child, Command};

/// Wrapper that kills the child's whole process group on drop.
///
/// Browsers and test binaries fork helpers; killing only the direct child
/// would leave those running after the run is over.
pub(crate) struct ChildGuard {
    child: Child,
    /// Process group ID saved at spawn time so we can kill the whole group.
    #[cfg(unix)]
    pgid: Option<u32>,
}

impl ChildGuard {
    /// Spawn `command` as the leader of a new process group.
    pub(crate) fn spawn(mut command: Command) -> io::Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.as_std_mut().process_group(0);
        }
        let child = command.spawn()?;
        Ok(Self {
            #[cfg(unix)]
            pgid: child.id(),
            child,
        })
    }

    pub(crate) async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        }
        // Fallback / non-Unix: kill just the direct child.
        let _ = self.child.start_kill();
    }
}

/// Split a configured command line and fill in placeholders.
///
/// A token that is exactly a placeholder expands to one argument per value
/// (so `{entry}` can stand for many files); a placeholder embedded in a
/// longer token is replaced by its values joined with spaces.
pub(crate) fn expand(
    template: &str,
    placeholders: &[(&str, &[String])],
) -> Result<Vec<String>, shell_words::ParseError> {
    let mut argv = Vec::new();
    for token in shell_words::split(template)? {
        if let Some((_, values)) = placeholders.iter().find(|(key, _)| *key == token) {
            argv.extend(values.iter().cloned());
            continue;
        }
        let token = placeholders
            .iter()
            .fold(token, |token, (key, values)| token.replace(key, &values.join(" ")));
        argv.push(token);
    }
    Ok(argv)
}

/// Exit code of a finished child. Death by signal counts as an operational
/// failure.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            tracing::warn!(%status, "child terminated by signal");
            2
        }
    }
}
