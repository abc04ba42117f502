use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};

use crate::model::ConnectionDescriptor;

static SESSION_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Null,
    Inherit,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Output {
    Null,
    Inherit,
    /// Created or truncated before the command starts.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub(crate) argv: Vec<String>,
    pub(crate) stdin: Input,
    pub(crate) stdout: Output,
    pub(crate) stderr: Output,
}

impl Invocation {
    pub(crate) fn quiet(argv: Vec<String>) -> Self {
        Self {
            argv,
            stdin: Input::Null,
            stdout: Output::Null,
            stderr: Output::Null,
        }
    }

    pub(crate) fn display(&self) -> String {
        self.argv
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs one external command to completion. `Ok(true)` means it exited
/// zero; `Err` is reserved for commands that could not be started at all.
pub(crate) trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<bool>;
}

#[derive(Debug, Default)]
pub(crate) struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<bool> {
        let (program, args) = invocation
            .argv
            .split_first()
            .context("empty command line")?;
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(input_stdio(&invocation.stdin)?)
            .stdout(output_stdio(&invocation.stdout)?)
            .stderr(output_stdio(&invocation.stderr)?);
        let status = command
            .status()
            .with_context(|| format!("run {program}"))?;
        Ok(status.success())
    }
}

fn input_stdio(input: &Input) -> Result<Stdio> {
    Ok(match input {
        Input::Null => Stdio::null(),
        Input::Inherit => Stdio::inherit(),
        Input::File(path) => {
            let file = File::open(path)
                .with_context(|| format!("open {} for reading", path.display()))?;
            Stdio::from(file)
        }
    })
}

fn output_stdio(output: &Output) -> Result<Stdio> {
    Ok(match output {
        Output::Null => Stdio::null(),
        Output::Inherit => Stdio::inherit(),
        Output::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("open {} for writing", path.display()))?;
            Stdio::from(file)
        }
    })
}

/// One-shot "stream the remote file to stdout" command line.
pub(crate) fn copy_command(conn: &ConnectionDescriptor, remote_path: &str) -> Vec<String> {
    let mut cmd = vec![conn.binary.clone()];
    if let Some(port) = explicit_port(conn) {
        cmd.push("-p".to_string());
        cmd.push(port.to_string());
    }
    cmd.push(conn.hostname.clone());
    cmd.push("cat".to_string());
    cmd.push(shell_quote(remote_path));
    cmd
}

/// Port 0 means "use the ssh default", same as no port.
fn explicit_port(conn: &ConnectionDescriptor) -> Option<u16> {
    conn.port.filter(|port| *port != 0)
}

pub(crate) fn next_socket_id() -> String {
    let count = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{count}", std::process::id())
}

/// Command lines sharing one multiplexed control connection.
#[derive(Debug, Clone)]
pub(crate) struct ControlArgs {
    prefix: Vec<String>,
    batch_prefix: Vec<String>,
    hostname: String,
}

impl ControlArgs {
    pub(crate) fn new(conn: &ConnectionDescriptor, socket_id: &str) -> Self {
        let mut prefix = vec![
            conn.binary.clone(),
            "-o".to_string(),
            format!("ControlPath=~/.ssh/remote-file-master-{socket_id}-%r@%h:%p"),
            "-o".to_string(),
            "TCPKeepAlive=yes".to_string(),
            "-o".to_string(),
            "ControlPersist=yes".to_string(),
        ];
        if let Some(port) = explicit_port(conn) {
            prefix.push("-p".to_string());
            prefix.push(port.to_string());
        }
        let mut batch_prefix = prefix.clone();
        batch_prefix.push("-o".to_string());
        batch_prefix.push("BatchMode=yes".to_string());
        Self {
            prefix,
            batch_prefix,
            hostname: conn.hostname.clone(),
        }
    }

    pub(crate) fn establish(&self) -> Vec<String> {
        let mut cmd = self.prefix.clone();
        cmd.extend(["-o", "ControlMaster=auto", "-fN"].map(String::from));
        cmd.push(self.hostname.clone());
        cmd
    }

    /// `op` is a control command understood by `-O`, e.g. `check` or `exit`.
    pub(crate) fn control(&self, op: &str) -> Vec<String> {
        let mut cmd = self.batch_prefix.clone();
        cmd.push("-O".to_string());
        cmd.push(op.to_string());
        cmd.push(self.hostname.clone());
        cmd
    }

    pub(crate) fn read(&self, remote_path: &str) -> Vec<String> {
        let mut cmd = self.batch_prefix.clone();
        cmd.push(self.hostname.clone());
        cmd.push("cat".to_string());
        cmd.push(shell_quote(remote_path));
        cmd
    }

    pub(crate) fn write(&self, remote_path: &str, interactive: bool) -> Vec<String> {
        let mut cmd = if interactive {
            self.prefix.clone()
        } else {
            self.batch_prefix.clone()
        };
        cmd.push(self.hostname.clone());
        cmd.push("cat".to_string());
        cmd.push(">".to_string());
        cmd.push(shell_quote(remote_path));
        cmd
    }
}

/// Quote `value` for a POSIX shell, leaving it alone when nothing in it
/// is special.
pub(crate) fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
pub(crate) fn shell_unquote(value: &str) -> String {
    match value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        Some(inner) => inner.replace("'\\''", "'"),
        None => value.to_string(),
    }
}

/// Expand `~`, `~/...`, `$VAR` and `${VAR}`. Unknown variables are kept
/// verbatim.
pub(crate) fn expand_user_path(path: &str) -> PathBuf {
    let path = expand_vars_with(path, |name| std::env::var(name).ok());
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn expand_vars_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::Mutex;

/// In-memory stand-in for an ssh-like binary. It understands the command
/// shapes built above and keeps remote files in a map.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FakeRemote {
    files: Mutex<HashMap<String, Vec<u8>>>,
    alive: Mutex<VecDeque<bool>>,
    alive_default: Mutex<bool>,
    refuse_connection: Mutex<bool>,
    reject_writes: Mutex<bool>,
    invocations: Mutex<Vec<Invocation>>,
}

#[cfg(test)]
impl FakeRemote {
    pub(crate) fn new() -> Self {
        let remote = Self::default();
        *remote.alive_default.lock().unwrap() = true;
        remote
    }

    pub(crate) fn set_file(&self, path: &str, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());
    }

    pub(crate) fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Answers for the next liveness probes, consumed in order; once used
    /// up the probe answers `then`.
    pub(crate) fn script_liveness(&self, answers: &[bool], then: bool) {
        *self.alive.lock().unwrap() = answers.iter().copied().collect();
        *self.alive_default.lock().unwrap() = then;
    }

    pub(crate) fn refuse_connection(&self) {
        *self.refuse_connection.lock().unwrap() = true;
    }

    pub(crate) fn reject_writes(&self) {
        *self.reject_writes.lock().unwrap() = true;
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.invocations()
            .into_iter()
            .map(|invocation| invocation.argv)
            .collect()
    }

    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|argv| argv.iter().any(|arg| arg == ">"))
            .count()
    }

    fn next_alive(&self) -> bool {
        if *self.refuse_connection.lock().unwrap() {
            return false;
        }
        match self.alive.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => *self.alive_default.lock().unwrap(),
        }
    }
}

#[cfg(test)]
impl CommandRunner for FakeRemote {
    fn run(&self, invocation: &Invocation) -> Result<bool> {
        let argv = &invocation.argv;
        self.invocations.lock().unwrap().push(invocation.clone());
        if let Output::File(path) = &invocation.stdout {
            File::create(path).context("create fake stdout")?;
        }
        if let Some(pos) = argv.iter().position(|arg| arg == "-O") {
            return Ok(match argv.get(pos + 1).map(String::as_str) {
                Some("check") => self.next_alive(),
                _ => true,
            });
        }
        if argv.iter().any(|arg| arg == "-fN") {
            return Ok(!*self.refuse_connection.lock().unwrap());
        }
        let Some(pos) = argv.iter().position(|arg| arg == "cat") else {
            return Ok(false);
        };
        if argv.get(pos + 1).map(String::as_str) == Some(">") {
            if *self.reject_writes.lock().unwrap() {
                return Ok(false);
            }
            let Some(target) = argv.get(pos + 2) else {
                return Ok(false);
            };
            let content = match &invocation.stdin {
                Input::File(path) => std::fs::read(path).context("read fake stdin")?,
                _ => Vec::new(),
            };
            self.set_file(&shell_unquote(target), &content);
            return Ok(true);
        }
        let Some(source) = argv.get(pos + 1) else {
            return Ok(false);
        };
        let Some(content) = self.file(&shell_unquote(source)) else {
            return Ok(false);
        };
        if let Output::File(path) = &invocation.stdout {
            std::fs::write(path, content).context("write fake stdout")?;
        }
        Ok(true)
    }
}
