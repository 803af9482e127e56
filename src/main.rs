use std::io::{self, Read};
use std::{env, process};

use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RMIPSC_LOG";

fn usage(program: &str) -> ! {
  eprintln!("usage: {program} <source>");
  eprintln!("       {program} -          read the source from stdin");
  eprintln!("set {LOG_ENV}=debug to trace the compiler stages");
  process::exit(1);
}

fn main() {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_target(false)
    .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
    .init();

  let args: Vec<String> = env::args().collect();
  let program = args.first().map(String::as_str).unwrap_or("rmipsc");
  if args.len() != 2 || matches!(args[1].as_str(), "-h" | "--help") {
    usage(program);
  }

  let source = if args[1] == "-" {
    let mut source = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut source) {
      eprintln!("{program}: failed to read stdin: {err}");
      process::exit(1);
    }
    source
  } else {
    args[1].clone()
  };
  debug!(bytes = source.len(), "read source");

  match rmipsc::generate_assembly(&source) {
    Ok(asm) => print!("{asm}"),
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
