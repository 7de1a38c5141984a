//! The interactive terminal loop: tokenizes stdin lines into commands and
//! drives [`crate::commands`] against one [`NmSession`] for the process's
//! lifetime, mirroring the original terminal client's `interactive_mode`.

use std::io::{self, BufRead, Write};

use crate::commands::{self, WriteSession};
use crate::nm_session::NmSession;

/// Prints the command summary shown by the `help` command and at startup.
pub fn print_help() {
    println!(
        "\
Commands:
  ls                              list files visible to you
  view <file>                     print a file's full content
  create <file>                   create an empty file, owned by you
  delete <file>                   delete a file you own
  info <file>                     size/word/char/owner report
  read <file>                     fetch content via a direct SS connection
  stream <file>                   play a file back word by word
  write <file> <sentence#>        open a WRITE session on one sentence
  exec <file> <program…>          run program with the file's content on stdin
  undo <file>                     revert the file's last committed edit
  addaccess <file> <user> <R|W>   grant a user read or write access (owner only)
  remaccess <file> <user>         revoke a user's access (owner only)
  reqaccess <file> <R|W>          request access from the file's owner
  listrequests <file>             list pending requests (owner only)
  approve <file> <user>           approve a pending request (owner only)
  deny <file> <user>              deny a pending request (owner only)
  checkpoint <file> <tag>         snapshot a file under a named tag
  viewcheckpoint <file> <tag>     print a checkpoint's content
  revert <file> <tag>             restore a file to a checkpoint
  listcheckpoints <file>          list a file's checkpoints
  help                            show this text
  quit                            disconnect and exit
"
    );
}

/// Runs the read-eval-print loop against `nm` until the user quits or stdin
/// closes, then sends `QUIT` and returns.
pub fn interactive_mode(mut nm: NmSession) {
    print_help();
    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&name) = tokens.first() else { continue };
        if name.eq_ignore_ascii_case("quit") || name.eq_ignore_ascii_case("exit") {
            break;
        }
        dispatch(&mut nm, name, &tokens[1..]);
    }
    nm.quit();
}

fn dispatch(nm: &mut NmSession, name: &str, args: &[&str]) {
    let result = match name.to_ascii_lowercase().as_str() {
        "help" => {
            print_help();
            return;
        }
        "ls" | "list" => commands::list_files(nm).map(|files| files.join("\n")),
        "view" => with_filename(args, |f| commands::view_file(nm, f)),
        "create" => with_filename(args, |f| commands::create_file(nm, f)),
        "delete" => with_filename(args, |f| commands::delete_file(nm, f)),
        "info" => with_filename(args, |f| commands::file_info(nm, f)),
        "undo" => with_filename(args, |f| commands::undo_file(nm, f)),
        "read" => with_filename(args, |f| commands::read_file(nm, f)),
        "stream" => stream(nm, args),
        "write" => write_session(nm, args),
        "exec" => exec(nm, args),
        "addaccess" => add_access(nm, args),
        "remaccess" => rem_access(nm, args),
        "reqaccess" => req_access(nm, args),
        "listrequests" => with_filename(args, |f| commands::list_requests(nm, f)),
        "approve" => process_request(nm, args, true),
        "deny" => process_request(nm, args, false),
        "checkpoint" => two_args(args, "checkpoint <file> <tag>", |f, t| commands::checkpoint(nm, f, t)),
        "viewcheckpoint" => two_args(args, "viewcheckpoint <file> <tag>", |f, t| commands::view_checkpoint(nm, f, t)),
        "revert" => two_args(args, "revert <file> <tag>", |f, t| commands::revert_checkpoint(nm, f, t)),
        "listcheckpoints" => with_filename(args, |f| commands::list_checkpoints(nm, f)),
        other => Err(usage_error(format!("unknown command '{other}', type 'help' for a list"))),
    };
    match result {
        Ok(body) if body.is_empty() => println!("ok"),
        Ok(body) => println!("{body}"),
        Err(err) => println!("error: {err}"),
    }
}

fn with_filename(args: &[&str], op: impl FnOnce(&str) -> Result<String, crate::ClientError>) -> Result<String, crate::ClientError> {
    match args.first() {
        Some(&filename) => op(filename),
        None => Err(usage_error("expected a filename")),
    }
}

fn two_args(
    args: &[&str],
    usage: &str,
    op: impl FnOnce(&str, &str) -> Result<String, crate::ClientError>,
) -> Result<String, crate::ClientError> {
    match (args.first(), args.get(1)) {
        (Some(&a), Some(&b)) => op(a, b),
        _ => Err(usage_error(usage)),
    }
}

fn usage_error(detail: impl Into<String>) -> crate::ClientError {
    common::DocError::invalid_operation(detail).into()
}

fn exec(nm: &mut NmSession, args: &[&str]) -> Result<String, crate::ClientError> {
    let (Some(&filename), program) = (args.first(), args.get(1..).unwrap_or_default()) else {
        return Err(usage_error("exec <file> <program…>"));
    };
    if program.is_empty() {
        return Err(usage_error("exec <file> <program…>"));
    }
    commands::exec_file(nm, filename, &program.join(" "))
}

fn stream(nm: &mut NmSession, args: &[&str]) -> Result<String, crate::ClientError> {
    let Some(&filename) = args.first() else {
        return Err(usage_error("stream <file>"));
    };
    commands::stream_file(nm, filename, |word| println!("{word}"))?;
    Ok(String::new())
}

fn write_session(nm: &mut NmSession, args: &[&str]) -> Result<String, crate::ClientError> {
    let (Some(&filename), Some(&sentence)) = (args.first(), args.get(1)) else {
        return Err(usage_error("write <file> <sentence#>"));
    };
    let sentence: usize = sentence
        .parse()
        .map_err(|_| usage_error("sentence# must be a non-negative integer"))?;
    let mut session = WriteSession::open(nm, filename, sentence)?;
    println!("locked '{filename}' sentence {sentence}. Enter '<word_index> <content>', 'commit', or 'unlock'.");

    let stdin = io::stdin();
    loop {
        print!("write> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("commit") {
            match session.commit() {
                Ok(()) => println!("committed"),
                Err(err) => println!("error: {err}"),
            }
            continue;
        }
        if line.eq_ignore_ascii_case("unlock") {
            break;
        }
        let mut tokens = line.splitn(2, ' ');
        let Some(word_index) = tokens.next().and_then(|t| t.parse::<usize>().ok()) else {
            println!("expected '<word_index> <content>', 'commit', or 'unlock'");
            continue;
        };
        let content = tokens.next().unwrap_or_default();
        if let Err(err) = session.insert(word_index, content) {
            println!("error: {err}");
        }
    }
    session.unlock()?;
    Ok(String::new())
}

fn add_access(nm: &mut NmSession, args: &[&str]) -> Result<String, crate::ClientError> {
    let (Some(&filename), Some(&user), Some(access_type)) = (args.first(), args.get(1), args.get(2)) else {
        return Err(usage_error("addaccess <file> <user> <R|W>"));
    };
    let access_type = access_type.chars().next().ok_or_else(|| usage_error("access type must be R or W"))?;
    commands::add_access(nm, filename, user, access_type)
}

fn rem_access(nm: &mut NmSession, args: &[&str]) -> Result<String, crate::ClientError> {
    two_args(args, "remaccess <file> <user>", |f, u| commands::remove_access(nm, f, u))
}

fn req_access(nm: &mut NmSession, args: &[&str]) -> Result<String, crate::ClientError> {
    let (Some(&filename), Some(access_type)) = (args.first(), args.get(1)) else {
        return Err(usage_error("reqaccess <file> <R|W>"));
    };
    let access_type = access_type.chars().next().ok_or_else(|| usage_error("access type must be R or W"))?;
    commands::request_access(nm, filename, access_type)
}

fn process_request(nm: &mut NmSession, args: &[&str], approve: bool) -> Result<String, crate::ClientError> {
    let usage = if approve { "approve <file> <user>" } else { "deny <file> <user>" };
    two_args(args, usage, |f, u| commands::process_request(nm, f, u, approve))
}
