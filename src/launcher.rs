use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};

use crate::model::Settings;

const FALLBACK_EDITOR: &str = "vi";

/// Handle to a running editor that the edit loop polls.
pub(crate) trait EditorProcess {
    fn has_exited(&mut self) -> Result<bool>;
}

pub(crate) trait EditorLauncher {
    fn launch(&self, path: &Path) -> Result<Box<dyn EditorProcess>>;
}

pub(crate) struct CommandEditor {
    command: Vec<String>,
}

impl CommandEditor {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            command: editor_command(settings.editor.as_deref()),
        }
    }
}

impl EditorLauncher for CommandEditor {
    fn launch(&self, path: &Path) -> Result<Box<dyn EditorProcess>> {
        let (program, args) = self.command.split_first().context("empty editor command")?;
        let child = Command::new(program)
            .args(args)
            .arg(path)
            .spawn()
            .with_context(|| format!("launch editor {program}"))?;
        Ok(Box::new(ChildEditor { child }))
    }
}

struct ChildEditor {
    child: Child,
}

impl EditorProcess for ChildEditor {
    fn has_exited(&mut self) -> Result<bool> {
        let status = self.child.try_wait().context("poll editor")?;
        Ok(status.is_some())
    }
}

pub(crate) fn editor_command(configured: Option<&[String]>) -> Vec<String> {
    if let Some(command) = configured.filter(|command| !command.is_empty()) {
        return command.to_vec();
    }
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(value) = std::env::var(var) {
            let parts: Vec<String> = value.split_whitespace().map(String::from).collect();
            if !parts.is_empty() {
                return parts;
            }
        }
    }
    vec![FALLBACK_EDITOR.to_string()]
}

pub(crate) fn open_command(configured: Option<&[String]>) -> Vec<String> {
    if let Some(command) = configured.filter(|command| !command.is_empty()) {
        return command.to_vec();
    }
    if cfg!(target_os = "macos") {
        vec!["open".to_string()]
    } else if cfg!(windows) {
        ["cmd", "/C", "start", ""].map(String::from).to_vec()
    } else {
        vec!["xdg-open".to_string()]
    }
}

/// Hand `path` to the platform opener without waiting for it.
pub(crate) fn open_with(settings: &Settings, path: &Path) -> Result<()> {
    let command = open_command(settings.open_command.as_deref());
    let (program, args) = command.split_first().context("empty open command")?;
    Command::new(program)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("run {program}"))?;
    Ok(())
}

#[cfg(test)]
pub(crate) type EditorStep = Box<dyn FnMut(&Path)>;

/// Editor stand-in that runs one scripted step per poll and exits once
/// the script is exhausted.
#[cfg(test)]
pub(crate) struct ScriptedEditor {
    steps: std::cell::RefCell<Option<Vec<EditorStep>>>,
}

#[cfg(test)]
impl ScriptedEditor {
    pub(crate) fn new(steps: Vec<EditorStep>) -> Self {
        Self {
            steps: std::cell::RefCell::new(Some(steps)),
        }
    }
}

#[cfg(test)]
impl EditorLauncher for ScriptedEditor {
    fn launch(&self, path: &Path) -> Result<Box<dyn EditorProcess>> {
        let steps = self.steps.borrow_mut().take().unwrap_or_default();
        Ok(Box::new(ScriptedProcess {
            path: path.to_path_buf(),
            steps: steps.into_iter().collect(),
        }))
    }
}

#[cfg(test)]
struct ScriptedProcess {
    path: std::path::PathBuf,
    steps: std::collections::VecDeque<EditorStep>,
}

#[cfg(test)]
impl EditorProcess for ScriptedProcess {
    fn has_exited(&mut self) -> Result<bool> {
        match self.steps.pop_front() {
            Some(mut step) => {
                step(&self.path);
                Ok(false)
            }
            None => Ok(true),
        }
    }
}
