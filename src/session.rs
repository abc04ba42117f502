use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::app::Prompter;
use crate::app::logging::Logger;
use crate::error::RemoteFileError;
use crate::model::{ConnectionDescriptor, base_name};
use crate::ssh::{CommandRunner, ControlArgs, Input, Invocation, Output, next_socket_id};

const FALLBACK_STAGE_NAME: &str = "remote-file";

/// A multiplexed control connection to one remote file, plus the scratch
/// directory holding its local staging copy. Dropping the session tears
/// the connection down and deletes the scratch directory.
pub(crate) struct ControlSession<'a> {
    runner: &'a dyn CommandRunner,
    logger: &'a Logger,
    args: ControlArgs,
    remote_path: String,
    scratch: Option<TempDir>,
    stage_path: PathBuf,
}

fn run_logged(
    runner: &dyn CommandRunner,
    logger: &Logger,
    invocation: &Invocation,
) -> anyhow::Result<bool> {
    logger.log_line(&invocation.display());
    runner.run(invocation)
}

impl<'a> ControlSession<'a> {
    /// Start the control connection and create the scratch directory
    /// under `scratch_root`.
    pub(crate) fn open(
        runner: &'a dyn CommandRunner,
        logger: &'a Logger,
        conn: &ConnectionDescriptor,
        remote_path: &str,
        scratch_root: &Path,
    ) -> Result<Self, RemoteFileError> {
        let args = ControlArgs::new(conn, &next_socket_id());
        let connection_error = |reason: &str| RemoteFileError::Connection {
            host: conn.hostname.clone(),
            reason: reason.to_string(),
        };
        let shut_down = || {
            let _ = run_logged(runner, logger, &Invocation::quiet(args.control("exit")));
        };

        let establish = Invocation {
            argv: args.establish(),
            stdin: Input::Inherit,
            stdout: Output::Inherit,
            stderr: Output::Inherit,
        };
        if !run_logged(runner, logger, &establish)? {
            return Err(connection_error("could not start the control connection"));
        }
        let check = Invocation {
            argv: args.control("check"),
            stdin: Input::Null,
            stdout: Output::Null,
            stderr: Output::Inherit,
        };
        if !run_logged(runner, logger, &check)? {
            shut_down();
            return Err(connection_error("the control connection is not responding"));
        }

        let scratch = match tempfile::Builder::new()
            .prefix("remote-file-")
            .tempdir_in(scratch_root)
        {
            Ok(scratch) => scratch,
            Err(err) => {
                shut_down();
                return Err(anyhow::Error::new(err)
                    .context(format!("create scratch dir in {}", scratch_root.display()))
                    .into());
            }
        };
        let name = match base_name(remote_path) {
            name if name.is_empty() => FALLBACK_STAGE_NAME.to_string(),
            name => name,
        };
        let stage_path = scratch.path().join(name);
        Ok(Self {
            runner,
            logger,
            args,
            remote_path: remote_path.to_string(),
            scratch: Some(scratch),
            stage_path,
        })
    }

    pub(crate) fn stage_path(&self) -> &Path {
        &self.stage_path
    }

    #[cfg(test)]
    pub(crate) fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    pub(crate) fn is_alive(&self) -> bool {
        run_logged(
            self.runner,
            self.logger,
            &Invocation::quiet(self.args.control("check")),
        )
        .unwrap_or(false)
    }

    /// Replaces the staging copy with the remote contents. On `false` the
    /// staging copy may be empty or partial.
    pub(crate) fn download(&self) -> anyhow::Result<bool> {
        let invocation = Invocation {
            argv: self.args.read(&self.remote_path),
            stdin: Input::Null,
            stdout: Output::File(self.stage_path.clone()),
            stderr: Output::Null,
        };
        run_logged(self.runner, self.logger, &invocation)
    }

    /// Send the staging copy back. A visible upload announces its command
    /// line and lets ssh write to the terminal; a suppressed one is silent.
    pub(crate) fn upload(
        &self,
        suppress_output: bool,
        prompter: &mut dyn Prompter,
    ) -> anyhow::Result<bool> {
        let argv = self.args.write(&self.remote_path, !suppress_output);
        let sink = if suppress_output {
            Output::Null
        } else {
            Output::Inherit
        };
        let invocation = Invocation {
            argv,
            stdin: Input::File(self.stage_path.clone()),
            stdout: sink.clone(),
            stderr: sink,
        };
        if !suppress_output {
            prompter.announce(&invocation.display());
        }
        run_logged(self.runner, self.logger, &invocation)
    }

    pub(crate) fn close(self) {}
}

impl Drop for ControlSession<'_> {
    fn drop(&mut self) {
        let _ = run_logged(
            self.runner,
            self.logger,
            &Invocation::quiet(self.args.control("exit")),
        );
        if let Some(scratch) = self.scratch.take() {
            let _ = scratch.close();
        }
    }
}
