use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::app::constants::UNKNOWN_HOST_LABEL;
use crate::app::logging::{Logger, prune_log_file};
use crate::error::{RemoteFileError, TransferOp};
use crate::launcher::{CommandEditor, EditorLauncher};
use crate::model::{Action, ConflictChoice, ConnectionDescriptor, Mode, Settings, base_name};
use crate::ssh::{CommandRunner, Input, Invocation, Output, ProcessRunner, copy_command};
use crate::storage::{FileLastUsed, LastUsedStore, config_path, load_settings, log_path};

pub(crate) mod constants;
mod edit;
mod helpers;
pub(crate) mod logging;
mod save;

/// Interactive collaborator: menus, prompts and the error screen.
pub(crate) trait Prompter {
    fn ask_action(&mut self, hostname: &str, remote_path: &str) -> Result<Action>;
    /// `None` when the user backed out of the prompt.
    fn ask_destination(&mut self, default: &Path, cwd: &Path) -> Result<Option<String>>;
    fn ask_conflict(&mut self, dest: &Path) -> Result<ConflictChoice>;
    fn show_error(&mut self, message: &str) -> Result<()>;
    fn announce(&mut self, message: &str);
}

/// The remote file a run operates on.
#[derive(Debug, Clone)]
pub(crate) struct RemoteTarget {
    pub(crate) conn: ConnectionDescriptor,
    pub(crate) path: String,
    pub(crate) hostname: Option<String>,
}

impl RemoteTarget {
    pub(crate) fn label(&self) -> &str {
        match self.hostname.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => UNKNOWN_HOST_LABEL,
        }
    }
}

pub(crate) struct App {
    pub(crate) settings: Settings,
    pub(crate) logger: Logger,
    runner: Box<dyn CommandRunner>,
    prompter: Box<dyn Prompter>,
    editor: Box<dyn EditorLauncher>,
    last_used: Box<dyn LastUsedStore>,
}

impl App {
    pub(crate) fn load(config_override: Option<PathBuf>, prompter: Box<dyn Prompter>) -> Result<Self> {
        let config_path = match config_override {
            Some(path) => path,
            None => config_path()?,
        };
        let settings = load_settings(&config_path)
            .with_context(|| format!("load settings from {}", config_path.display()))?;
        let log_path = log_path();
        prune_log_file(&log_path);
        let editor = Box::new(CommandEditor::from_settings(&settings));
        Ok(Self::new(
            settings,
            Logger::new(log_path),
            Box::new(ProcessRunner),
            prompter,
            editor,
            Box::new(FileLastUsed::default_location()),
        ))
    }

    pub(crate) fn new(
        settings: Settings,
        logger: Logger,
        runner: Box<dyn CommandRunner>,
        prompter: Box<dyn Prompter>,
        editor: Box<dyn EditorLauncher>,
        last_used: Box<dyn LastUsedStore>,
    ) -> Self {
        Self {
            settings,
            logger,
            runner,
            prompter,
            editor,
            last_used,
        }
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.settings.poll_interval_ms)
    }

    pub(crate) fn prompter(&mut self) -> &mut dyn Prompter {
        self.prompter.as_mut()
    }

    /// Ask (or take from `mode`) what to do and do it. Returns a local
    /// path when the caller should hand a file to the system opener.
    pub(crate) fn run(&mut self, mode: Mode, target: &RemoteTarget) -> Result<Option<PathBuf>> {
        let action = match mode {
            Mode::Edit => Action::Edit,
            Mode::Ask => self.prompter.ask_action(target.label(), &target.path)?,
        };
        self.logger
            .log_line(&format!("{action:?} {} on {}", target.path, target.label()));
        self.handle_action(action, target)
    }

    pub(crate) fn handle_action(
        &mut self,
        action: Action,
        target: &RemoteTarget,
    ) -> Result<Option<PathBuf>> {
        let result = if target.path.trim().is_empty() && action != Action::Cancel {
            Err(RemoteFileError::MissingPath)
        } else {
            match action {
                Action::Open => self.open_remote_file(target).map(Some),
                Action::Edit => self.edit_remote_file(target).map(|_| None),
                Action::Save => self.save_remote_file(target).map(|_| None),
                Action::Cancel => Ok(None),
            }
        };
        match result {
            Ok(path) => Ok(path),
            Err(RemoteFileError::Unhandled(err)) => Err(err),
            Err(err) => {
                self.logger.log_line(&err.to_string());
                self.prompter.show_error(&err.to_string())?;
                Ok(None)
            }
        }
    }

    fn open_remote_file(&mut self, target: &RemoteTarget) -> Result<PathBuf, RemoteFileError> {
        self.prompter
            .announce(&format!("Opening {} from {}", target.path, target.label()));
        let dir = tempfile::Builder::new()
            .prefix("remote-file-open-")
            .tempdir()
            .context("create download dir")?
            .keep();
        let dest = dir.join(base_name(&target.path));
        let invocation = Invocation {
            argv: copy_command(&target.conn, &target.path),
            stdin: Input::Inherit,
            stdout: Output::File(dest.clone()),
            stderr: Output::Inherit,
        };
        self.logger.log_line(&invocation.display());
        if self.runner.run(&invocation)? {
            Ok(dest)
        } else {
            Err(RemoteFileError::transfer(TransferOp::Copy, &target.path))
        }
    }
}

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::rc::Rc;

#[cfg(test)]
#[derive(Default)]
pub(crate) struct PromptScript {
    pub(crate) actions: VecDeque<Action>,
    pub(crate) destinations: VecDeque<Option<String>>,
    pub(crate) conflicts: VecDeque<ConflictChoice>,
    pub(crate) errors: Vec<String>,
    pub(crate) conflict_prompts: Vec<PathBuf>,
    pub(crate) destination_defaults: Vec<PathBuf>,
    pub(crate) announcements: Vec<String>,
}

/// Prompter that answers from queues and records what it was shown.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct ScriptedPrompter {
    pub(crate) script: Rc<RefCell<PromptScript>>,
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn ask_action(&mut self, _hostname: &str, _remote_path: &str) -> Result<Action> {
        Ok(self
            .script
            .borrow_mut()
            .actions
            .pop_front()
            .unwrap_or(Action::Cancel))
    }

    fn ask_destination(&mut self, default: &Path, _cwd: &Path) -> Result<Option<String>> {
        let mut script = self.script.borrow_mut();
        script.destination_defaults.push(default.to_path_buf());
        Ok(script.destinations.pop_front().unwrap_or(None))
    }

    fn ask_conflict(&mut self, dest: &Path) -> Result<ConflictChoice> {
        let mut script = self.script.borrow_mut();
        script.conflict_prompts.push(dest.to_path_buf());
        Ok(script.conflicts.pop_front().unwrap_or(ConflictChoice::Abort))
    }

    fn show_error(&mut self, message: &str) -> Result<()> {
        self.script.borrow_mut().errors.push(message.to_string());
        Ok(())
    }

    fn announce(&mut self, message: &str) {
        self.script.borrow_mut().announcements.push(message.to_string());
    }
}

#[cfg(test)]
impl<T: CommandRunner + ?Sized> CommandRunner for Rc<T> {
    fn run(&self, invocation: &Invocation) -> Result<bool> {
        (**self).run(invocation)
    }
}

#[cfg(test)]
impl<T: LastUsedStore + ?Sized> LastUsedStore for Rc<T> {
    fn load(&self) -> Option<PathBuf> {
        (**self).load()
    }

    fn store(&self, dir: &Path) -> Result<()> {
        (**self).store(dir)
    }
}

#[cfg(test)]
pub(crate) struct TestHarness {
    pub(crate) remote: Rc<crate::ssh::FakeRemote>,
    pub(crate) prompter: ScriptedPrompter,
    pub(crate) last_used: Rc<crate::storage::MemoryLastUsed>,
}

#[cfg(test)]
impl TestHarness {
    pub(crate) fn new(last_used: crate::storage::MemoryLastUsed) -> Self {
        Self {
            remote: Rc::new(crate::ssh::FakeRemote::new()),
            prompter: ScriptedPrompter::default(),
            last_used: Rc::new(last_used),
        }
    }

    pub(crate) fn app(&self, editor: Box<dyn EditorLauncher>) -> App {
        let settings = Settings {
            poll_interval_ms: 1,
            ..Settings::default()
        };
        App::new(
            settings,
            Logger::disabled(),
            Box::new(self.remote.clone()),
            Box::new(self.prompter.clone()),
            editor,
            Box::new(self.last_used.clone()),
        )
    }

    pub(crate) fn target(path: &str) -> RemoteTarget {
        RemoteTarget {
            conn: ConnectionDescriptor {
                binary: "sshlike".to_string(),
                hostname: "box".to_string(),
                port: None,
            },
            path: path.to_string(),
            hostname: Some("box".to_string()),
        }
    }
}
