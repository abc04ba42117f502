use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use crate::app::logging::Logger;
use crate::app::{App, Prompter, RemoteTarget};
use crate::error::{RemoteFileError, TransferOp};
use crate::launcher::EditorLauncher;
use crate::session::ControlSession;

impl App {
    pub(crate) fn edit_remote_file(&mut self, target: &RemoteTarget) -> Result<(), RemoteFileError> {
        self.prompter
            .announce(&format!("Editing {} from {}", target.path, target.label()));
        let poll_interval = self.poll_interval();
        let session = ControlSession::open(
            self.runner.as_ref(),
            &self.logger,
            &target.conn,
            &target.path,
            &std::env::temp_dir(),
        )?;
        self.logger.log_line(&format!(
            "Control connection to {} ready, staging {}",
            target.conn.hostname,
            session.stage_path().display()
        ));
        let outcome = sync_while_editing(
            &session,
            self.editor.as_ref(),
            self.prompter.as_mut(),
            &self.logger,
            poll_interval,
            &target.path,
        );
        session.close();
        outcome
    }
}

/// Download, run the editor, push every save back while the connection
/// is alive, then do one final visible upload.
fn sync_while_editing(
    session: &ControlSession<'_>,
    editor: &dyn EditorLauncher,
    prompter: &mut dyn Prompter,
    logger: &Logger,
    poll_interval: Duration,
    remote_path: &str,
) -> Result<(), RemoteFileError> {
    if !session.download()? {
        return Err(RemoteFileError::transfer(TransferOp::Download, remote_path));
    }
    let stage = session.stage_path();
    let mut last_modified = modified_time(stage)?;
    let mut process = editor.launch(stage)?;

    while !process.has_exited()? {
        std::thread::sleep(poll_interval);
        let Ok(modified) = modified_time(stage) else {
            continue;
        };
        if modified <= last_modified {
            continue;
        }
        last_modified = modified;
        if session.is_alive() {
            match session.upload(true, prompter) {
                Ok(true) => logger.log_line(&format!("Synced {remote_path}")),
                Ok(false) => logger.log_line(&format!("Background sync of {remote_path} failed")),
                Err(err) => logger.log_line(&format!("Background sync of {remote_path} failed: {err:#}")),
            }
        }
    }

    if !session.is_alive() {
        return Err(RemoteFileError::ConnectionLost {
            path: remote_path.to_string(),
        });
    }
    if !session.upload(false, prompter)? {
        return Err(RemoteFileError::transfer(TransferOp::Upload, remote_path));
    }
    logger.log_line(&format!("Uploaded {remote_path}"));
    Ok(())
}

fn modified_time(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("read modification time of {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TestHarness;
    use crate::launcher::{EditorStep, ScriptedEditor};
    use crate::ssh::Output;
    use crate::storage::MemoryLastUsed;
    use std::fs::File;
    use std::io::Write;

    fn save_step(content: &'static [u8], bump_secs: u64) -> EditorStep {
        Box::new(move |path: &Path| {
            let mut file = File::create(path).unwrap();
            file.write_all(content).unwrap();
            file.set_modified(SystemTime::now() + Duration::from_secs(bump_secs))
                .unwrap();
        })
    }

    fn idle_step() -> EditorStep {
        Box::new(|_path: &Path| {})
    }

    fn teardown_count(harness: &TestHarness) -> usize {
        harness
            .remote
            .calls()
            .iter()
            .filter(|argv| argv.contains(&"exit".to_string()))
            .count()
    }

    #[test]
    fn edits_are_synced_and_finally_uploaded() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        harness.remote.set_file("/etc/motd", b"hello");
        let editor = ScriptedEditor::new(vec![
            idle_step(),
            save_step(b"hello world", 10),
            idle_step(),
            save_step(b"goodbye", 20),
        ]);
        let mut app = harness.app(Box::new(editor));
        app.edit_remote_file(&TestHarness::target("/etc/motd"))
            .unwrap();
        assert_eq!(harness.remote.file("/etc/motd").unwrap(), b"goodbye");
        // two background syncs plus the final upload
        assert_eq!(harness.remote.write_count(), 3);
        assert_eq!(teardown_count(&harness), 1);
    }

    #[test]
    fn only_the_final_upload_is_announced() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        harness.remote.set_file("/etc/motd", b"hello");
        let editor = ScriptedEditor::new(vec![save_step(b"hello again", 10), idle_step()]);
        let mut app = harness.app(Box::new(editor));
        app.edit_remote_file(&TestHarness::target("/etc/motd"))
            .unwrap();
        assert_eq!(harness.remote.write_count(), 2);
        let uploads: Vec<_> = harness
            .remote
            .invocations()
            .into_iter()
            .filter(|invocation| invocation.argv.iter().any(|arg| arg == ">"))
            .collect();
        assert_eq!(uploads[0].stdout, Output::Null);
        assert_eq!(uploads[1].stdout, Output::Inherit);
        let announcements = harness.prompter.script.borrow().announcements.clone();
        // the "Editing ..." notice, then the final upload's command line
        assert_eq!(announcements.len(), 2);
        assert_eq!(announcements[1], uploads[1].display());
    }

    #[test]
    fn unchanged_file_is_only_uploaded_once() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        harness.remote.set_file("/etc/motd", b"hello");
        let editor = ScriptedEditor::new(vec![idle_step(), idle_step()]);
        let mut app = harness.app(Box::new(editor));
        app.edit_remote_file(&TestHarness::target("/etc/motd"))
            .unwrap();
        assert_eq!(harness.remote.write_count(), 1);
    }

    #[test]
    fn failed_download_never_launches_editor() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        let launched = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = launched.clone();
        let mark_launched: EditorStep = Box::new(move |_path: &Path| flag.set(true));
        let editor = ScriptedEditor::new(vec![mark_launched]);
        let mut app = harness.app(Box::new(editor));
        let err = app
            .edit_remote_file(&TestHarness::target("/missing"))
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteFileError::Transfer {
                op: TransferOp::Download,
                ..
            }
        ));
        assert!(!launched.get());
        assert_eq!(harness.remote.write_count(), 0);
        assert_eq!(teardown_count(&harness), 1);
    }

    #[test]
    fn dead_connection_skips_final_upload() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        harness.remote.set_file("/etc/motd", b"hello");
        // open's health check, then the background sync, then dead
        harness.remote.script_liveness(&[true, true], false);
        let editor = ScriptedEditor::new(vec![save_step(b"edited", 10), idle_step()]);
        let mut app = harness.app(Box::new(editor));
        let err = app
            .edit_remote_file(&TestHarness::target("/etc/motd"))
            .unwrap_err();
        assert!(matches!(err, RemoteFileError::ConnectionLost { .. }));
        assert_eq!(harness.remote.write_count(), 1);
        assert_eq!(harness.remote.file("/etc/motd").unwrap(), b"edited");
    }

    #[test]
    fn background_sync_waits_for_live_connection() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        harness.remote.set_file("/etc/motd", b"hello");
        harness.remote.script_liveness(&[true, false], true);
        let editor = ScriptedEditor::new(vec![save_step(b"edited", 10)]);
        let mut app = harness.app(Box::new(editor));
        app.edit_remote_file(&TestHarness::target("/etc/motd"))
            .unwrap();
        // the background sync was skipped, only the final upload ran
        assert_eq!(harness.remote.write_count(), 1);
        assert_eq!(harness.remote.file("/etc/motd").unwrap(), b"edited");
    }

    #[test]
    fn rejected_final_upload_is_a_transfer_error() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        harness.remote.set_file("/etc/motd", b"hello");
        harness.remote.reject_writes();
        let mut app = harness.app(Box::new(ScriptedEditor::new(vec![])));
        let err = app
            .edit_remote_file(&TestHarness::target("/etc/motd"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to upload /etc/motd");
    }

    #[test]
    fn connection_failure_is_reported_by_dispatcher() {
        let harness = TestHarness::new(MemoryLastUsed::default());
        harness.remote.refuse_connection();
        let mut app = harness.app(Box::new(ScriptedEditor::new(vec![])));
        let result = app
            .handle_action(crate::model::Action::Edit, &TestHarness::target("/etc/motd"))
            .unwrap();
        assert!(result.is_none());
        let errors = harness.prompter.script.borrow().errors.clone();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Failed to connect to box"));
    }
}
