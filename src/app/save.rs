use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use crate::app::helpers::{absolute_parent, auto_rename, resolve_destination};
use crate::app::{App, RemoteTarget};
use crate::error::{RemoteFileError, TransferOp};
use crate::model::{ConflictChoice, base_name};
use crate::ssh::{Input, Invocation, Output, copy_command};

impl App {
    pub(crate) fn save_remote_file(&mut self, target: &RemoteTarget) -> Result<(), RemoteFileError> {
        self.prompter
            .announce(&format!("Saving {} from {}", target.path, target.label()));
        let Some(dest) = self.choose_destination(&base_name(&target.path))? else {
            self.logger.log_line("Save cancelled");
            return Ok(());
        };

        if let Some(parent) = dest.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let invocation = Invocation {
            argv: copy_command(&target.conn, &target.path),
            stdin: Input::Inherit,
            stdout: Output::File(dest.clone()),
            stderr: Output::Inherit,
        };
        self.logger
            .log_line(&format!("{} > {}", invocation.display(), dest.display()));
        if self.runner.run(&invocation)? {
            self.logger.log_line(&format!("Saved {}", dest.display()));
            return Ok(());
        }
        if self.settings.remove_partial_on_failure {
            let _ = fs::remove_file(&dest);
        }
        Err(RemoteFileError::transfer(TransferOp::Copy, &target.path))
    }

    /// Prompt until the user settles on a destination. `None` means the
    /// save was abandoned.
    fn choose_destination(&mut self, file_name: &str) -> Result<Option<PathBuf>, RemoteFileError> {
        loop {
            let last_dir = self.last_used.load().unwrap_or_else(std::env::temp_dir);
            let default = last_dir.join(file_name);
            let cwd = std::env::current_dir().context("current dir")?;
            let Some(answer) = self.prompter.ask_destination(&default, &cwd)? else {
                return Ok(None);
            };

            let dest = if answer.trim().is_empty() {
                default
            } else {
                let dest = resolve_destination(&answer, file_name);
                self.last_used.store(&absolute_parent(&dest)?)?;
                dest
            };
            if !dest.exists() {
                return Ok(Some(dest));
            }
            match self.prompter.ask_conflict(&dest)? {
                ConflictChoice::Overwrite => return Ok(Some(dest)),
                ConflictChoice::Abort => return Ok(None),
                ConflictChoice::NewName => continue,
                ConflictChoice::AutoRename => return Ok(Some(auto_rename(&dest))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TestHarness;
    use crate::launcher::ScriptedEditor;
    use crate::storage::{LastUsedStore, MemoryLastUsed};

    fn answer(harness: &TestHarness, destination: Option<&str>) {
        harness
            .prompter
            .script
            .borrow_mut()
            .destinations
            .push_back(destination.map(String::from));
    }

    fn choose(harness: &TestHarness, choice: ConflictChoice) {
        harness
            .prompter
            .script
            .borrow_mut()
            .conflicts
            .push_back(choice);
    }

    fn app(harness: &TestHarness) -> App {
        harness.app(Box::new(ScriptedEditor::new(vec![])))
    }

    #[test]
    fn blank_answer_saves_to_default_without_touching_marker() {
        let dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(dir.path()));
        harness.remote.set_file("/etc/hosts", b"remote hosts");
        answer(&harness, Some(""));
        app(&harness)
            .save_remote_file(&TestHarness::target("/etc/hosts"))
            .unwrap();
        assert_eq!(fs::read(dir.path().join("hosts")).unwrap(), b"remote hosts");
        assert!(harness.prompter.script.borrow().conflict_prompts.is_empty());
        assert_eq!(harness.last_used.writes(), 0);
        assert_eq!(
            harness.prompter.script.borrow().destination_defaults,
            vec![dir.path().join("hosts")]
        );
    }

    #[test]
    fn overwrite_replaces_existing_file_and_updates_marker() {
        let marker_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(marker_dir.path()));
        harness.remote.set_file("/etc/hosts", b"new contents");
        let dest = dest_dir.path().join("copy.txt");
        fs::write(&dest, b"old contents").unwrap();
        answer(&harness, Some(&dest.to_string_lossy()));
        choose(&harness, ConflictChoice::Overwrite);
        app(&harness)
            .save_remote_file(&TestHarness::target("/etc/hosts"))
            .unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new contents");
        assert_eq!(harness.last_used.load(), Some(dest_dir.path().to_path_buf()));
        assert_eq!(harness.prompter.script.borrow().conflict_prompts, vec![dest]);
    }

    #[test]
    fn abort_leaves_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(dir.path()));
        harness.remote.set_file("/etc/hosts", b"new contents");
        fs::write(dir.path().join("hosts"), b"keep me").unwrap();
        answer(&harness, Some(""));
        choose(&harness, ConflictChoice::Abort);
        app(&harness)
            .save_remote_file(&TestHarness::target("/etc/hosts"))
            .unwrap();
        assert_eq!(fs::read(dir.path().join("hosts")).unwrap(), b"keep me");
        assert!(harness.remote.calls().is_empty());
    }

    #[test]
    fn auto_rename_picks_first_free_number() {
        let dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(dir.path()));
        harness.remote.set_file("/srv/a.txt", b"fresh");
        fs::write(dir.path().join("a.txt"), b"old").unwrap();
        answer(&harness, Some(""));
        choose(&harness, ConflictChoice::AutoRename);
        app(&harness)
            .save_remote_file(&TestHarness::target("/srv/a.txt"))
            .unwrap();
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"old");
        assert_eq!(fs::read(dir.path().join("a-1.txt")).unwrap(), b"fresh");
    }

    #[test]
    fn new_name_asks_again() {
        let dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(dir.path()));
        harness.remote.set_file("/etc/hosts", b"remote");
        fs::write(dir.path().join("hosts"), b"old").unwrap();
        let second = dir.path().join("sub").join("hosts.bak");
        answer(&harness, Some(""));
        choose(&harness, ConflictChoice::NewName);
        answer(&harness, Some(&second.to_string_lossy()));
        app(&harness)
            .save_remote_file(&TestHarness::target("/etc/hosts"))
            .unwrap();
        assert_eq!(fs::read(&second).unwrap(), b"remote");
        assert_eq!(harness.prompter.script.borrow().destination_defaults.len(), 2);
        assert_eq!(harness.last_used.load(), Some(dir.path().join("sub")));
    }

    #[test]
    fn typed_directory_gets_remote_name() {
        let marker_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(marker_dir.path()));
        harness.remote.set_file("/etc/hosts", b"remote");
        answer(&harness, Some(&dest_dir.path().to_string_lossy()));
        app(&harness)
            .save_remote_file(&TestHarness::target("/etc/hosts"))
            .unwrap();
        assert_eq!(fs::read(dest_dir.path().join("hosts")).unwrap(), b"remote");
        assert_eq!(harness.last_used.load(), Some(dest_dir.path().to_path_buf()));
    }

    #[test]
    fn cancelled_prompt_copies_nothing() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        answer(&harness, None);
        app(&harness)
            .save_remote_file(&TestHarness::target("/etc/hosts"))
            .unwrap();
        assert!(harness.remote.calls().is_empty());
    }

    #[test]
    fn failed_copy_keeps_partial_file_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(dir.path()));
        answer(&harness, Some(""));
        let err = app(&harness)
            .save_remote_file(&TestHarness::target("/missing.txt"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to copy /missing.txt");
        assert!(dir.path().join("missing.txt").exists());
    }

    #[test]
    fn failed_copy_can_remove_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let harness = TestHarness::new(MemoryLastUsed::with_dir(dir.path()));
        answer(&harness, Some(""));
        let mut app = app(&harness);
        app.settings.remove_partial_on_failure = true;
        assert!(app
            .save_remote_file(&TestHarness::target("/missing.txt"))
            .is_err());
        assert!(!dir.path().join("missing.txt").exists());
    }
}
