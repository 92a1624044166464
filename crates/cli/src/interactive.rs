use crate::report::{print_diagnostics, print_operations, print_pending, print_report, print_status};
use crate::steps::{parse_steps, split_line};
use anyhow::{bail, Context, Result};
use namnbyte_core::{Command, Confirm, OutputFormat, Reply, Session};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

const HELP: &str = "\
enter steps to transform pending names, e.g. `snake --replace IMG photo`
  list     show pending renames
  enable <folder> [-r] / disable <folder> [-r]
           include or exclude a folder (`all` means the whole tree)
  toggle <file>        include or exclude one file
  edit <file> [name]   set one pending name, or drop it
  status   show counters
  undo     revert the last transform
  apply    rename files on disk
  ops      list operations
  exit     leave without applying (also `quit`)";

/// What one input line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Blank,
    Help,
    Ops,
    Command(Command),
}

fn parse_line(line: &str) -> Result<Line> {
    let tokens = split_line(line)?;
    if tokens.is_empty() {
        return Ok(Line::Blank);
    }
    if let Some(command) = parse_state_command(&tokens)? {
        return Ok(Line::Command(command));
    }
    if tokens.len() == 1 {
        let keyword = tokens[0].to_ascii_lowercase();
        let command = match keyword.as_str() {
            "help" | "?" => return Ok(Line::Help),
            "ops" => return Ok(Line::Ops),
            "undo" => Some(Command::Undo),
            "apply" => Some(Command::Apply),
            "status" => Some(Command::Status),
            "list" | "ls" => Some(Command::List),
            "exit" | "quit" | "q" => Some(Command::Exit),
            _ => None,
        };
        if let Some(command) = command {
            return Ok(Line::Command(command));
        }
    }
    Ok(Line::Command(Command::Transform(parse_steps(&tokens))))
}

/// `enable`/`disable`/`toggle`/`edit` lines. `None` for anything else.
fn parse_state_command(tokens: &[String]) -> Result<Option<Command>> {
    let keyword = tokens[0].to_ascii_lowercase();
    let args = &tokens[1..];
    let command = match keyword.as_str() {
        "enable" | "disable" => {
            let enabled = keyword == "enable";
            let recursive = args.iter().any(|a| a == "-r" || a == "--recursive");
            let targets: Vec<&String> = args
                .iter()
                .filter(|a| *a != "-r" && *a != "--recursive")
                .collect();
            let [folder] = targets.as_slice() else {
                bail!("usage: {keyword} <folder> [-r]");
            };
            if folder.eq_ignore_ascii_case("all") {
                Command::SetFolderEnabled {
                    folder: PathBuf::from("."),
                    enabled,
                    recursive: true,
                }
            } else {
                Command::SetFolderEnabled {
                    folder: PathBuf::from(folder.as_str()),
                    enabled,
                    recursive,
                }
            }
        }
        "toggle" => match args {
            [file] => Command::ToggleFile(PathBuf::from(file)),
            _ => bail!("usage: toggle <file>"),
        },
        "edit" => match args {
            [file] => Command::Edit {
                file: PathBuf::from(file),
                name: None,
            },
            [file, name] => Command::Edit {
                file: PathBuf::from(file),
                name: Some(name.clone()),
            },
            _ => bail!("usage: edit <file> [name]"),
        },
        _ => return Ok(None),
    };
    Ok(Some(command))
}

/// Line source for the session that also answers confirmation prompts.
pub struct Prompt<R> {
    input: R,
}

impl<R: BufRead> Prompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// `None` at end of input.
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush().context("failed to flush stdout")?;
        let mut buf = String::new();
        let read = self
            .input
            .read_line(&mut buf)
            .context("failed to read from stdin")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\n', '\r']).to_string()))
    }
}

impl<R: BufRead> Confirm for Prompt<R> {
    fn confirm(&mut self, from: &Path, to: &Path) -> bool {
        let question = format!("rename {} -> {}? [y/N] ", from.display(), to.display());
        match self.next_line(&question) {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

/// Reads commands until `exit` or end of input.
pub fn run_session<R: BufRead>(
    session: &mut Session<'_>,
    prompt: &mut Prompt<R>,
    format: OutputFormat,
) -> Result<()> {
    println!("{HELP}");
    loop {
        let Some(raw) = prompt.next_line("namnbyte> ")? else {
            session.execute(Command::Exit, prompt)?;
            return Ok(());
        };
        let line = match parse_line(&raw) {
            Ok(line) => line,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        let command = match line {
            Line::Blank => continue,
            Line::Help => {
                println!("{HELP}");
                continue;
            }
            Line::Ops => {
                print_operations();
                continue;
            }
            Line::Command(command) => command,
        };

        let reply = session.execute(command, prompt)?;
        if !print_reply(&reply, format)? {
            return Ok(());
        }
    }
}

/// Prints one reply. Returns `false` once the session is over.
pub fn print_reply(reply: &Reply, format: OutputFormat) -> Result<bool> {
    match reply {
        Reply::Staged {
            result,
            diagnostics,
        } => {
            print_diagnostics(diagnostics);
            println!("{} name(s) changed", result.changed);
        }
        Reply::Enabled(summary) => println!(
            "enabled: folders={}/{} files={}/{}",
            summary.enabled_folders_count,
            summary.folders_count,
            summary.enabled_files_count,
            summary.files_count
        ),
        Reply::Toggled { applied: false, .. } => {
            println!("folder is disabled; enable the folder first")
        }
        Reply::Toggled { enabled, .. } => {
            println!("{}", if *enabled { "enabled" } else { "disabled" })
        }
        Reply::Edited(true) => println!("pending name updated"),
        Reply::Edited(false) => println!("pending name unchanged"),
        Reply::NotFound(path) => println!("no such entry: {}", path.display()),
        Reply::Undone(true) => println!("undone"),
        Reply::Undone(false) => println!("nothing to undo"),
        Reply::Applied(report) => print_report(report, format)?,
        Reply::Status(status) => print_status(status),
        Reply::Pending(rows) => print_pending(rows),
        Reply::Exit => return Ok(false),
    }
    Ok(true)
}
