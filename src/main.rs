use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

mod app;
mod error;
mod launcher;
mod model;
mod session;
mod ssh;
mod storage;
mod ui;

use app::constants::UNHANDLED_FAILURE_MESSAGE;
use app::{App, RemoteTarget};
use model::{ConnectionDescriptor, Mode};
use ui::TerminalPrompter;

/// Edit, open or save a file living on a remote machine.
#[derive(Debug, Parser)]
#[command(name = "remote-file", version, disable_help_flag = true)]
struct Cli {
    /// `ask` shows the action menu, `edit` goes straight to editing.
    #[arg(short, long, value_enum, default_value_t = Mode::Ask)]
    mode: Mode,

    /// Path of the file on the remote machine.
    #[arg(short, long, default_value = "")]
    path: String,

    /// Host name shown in the menus.
    #[arg(short = 'h', long)]
    hostname: Option<String>,

    /// JSON describing how to reach the host, e.g. `["ssh", "box", 2222]`.
    #[arg(long)]
    ssh_connection_data: String,

    /// Settings file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut app = App::load(cli.config.clone(), Box::new(TerminalPrompter))?;
    if let Err(err) = run(&mut app, cli) {
        app.logger.log_line(&format!("{err:?}"));
        eprintln!("{err:?}");
        app.prompter().show_error(UNHANDLED_FAILURE_MESSAGE).ok();
        std::process::exit(1);
    }
    Ok(())
}

fn run(app: &mut App, cli: Cli) -> Result<()> {
    let conn = match ConnectionDescriptor::from_json(&cli.ssh_connection_data) {
        Ok(conn) => conn,
        Err(err) => {
            let message = format!("{err:#}");
            app.logger.log_line(&message);
            app.prompter().show_error(&message)?;
            return Ok(());
        }
    };
    let target = RemoteTarget {
        conn,
        path: cli.path,
        hostname: cli.hostname,
    };
    let Some(local) = app.run(cli.mode, &target)? else {
        return Ok(());
    };
    if let Err(err) = launcher::open_with(&app.settings, &local) {
        let message = format!("{err:#}");
        app.logger.log_line(&message);
        app.prompter().show_error(&message)?;
    }
    Ok(())
}
