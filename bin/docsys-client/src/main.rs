//! `docsys-client`: the interactive terminal client binary.
//!
//! Thin wrapper over [`client::NmSession`] and [`client::repl`]: parses
//! `<username> [nm_host] [nm_port]`, registers with the name server, then
//! hands the session to the read-eval-print loop until the user quits.

use std::process::ExitCode;

use clap::Parser;
use client::repl;
use client::NmSession;

/// Command-line arguments for the interactive client.
#[derive(Parser, Debug)]
#[command(name = "docsys-client", about = "Doc-system interactive client", version)]
struct Args {
    /// Username to register with the name server as.
    username: String,

    /// Host the name server is listening on.
    #[arg(default_value = "127.0.0.1")]
    nm_host: String,

    /// Port the name server accepts registration on.
    #[arg(default_value_t = 8001)]
    nm_port: u16,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let session = match NmSession::connect(&args.username, &args.nm_host, args.nm_port) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("docsys-client: failed to connect to {}:{}: {err}", args.nm_host, args.nm_port);
            return ExitCode::FAILURE;
        }
    };

    println!("connected to {}:{} as '{}'", args.nm_host, args.nm_port, args.username);
    repl::interactive_mode(session);
    ExitCode::SUCCESS
}
