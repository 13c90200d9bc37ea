use std::path::PathBuf;

enum Action {
    Exit,
    Run,
    List,
}

fn main() {
    let (action, opts) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    let result = match action {
        Action::Exit => return,
        Action::Run => sorts_tui::run(opts),
        Action::List => sorts_tui::list(opts),
    };
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(
    args: impl Iterator<Item = String>,
) -> Result<(Action, sorts_tui::RunOptions), String> {
    let mut opts = sorts_tui::RunOptions::default();
    let mut action = Action::Run;
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Sorts-TUI {}", sorts_tui::VERSION);
                action = Action::Exit;
            }
            "--help" | "-h" => {
                println!(
                    "Sorts-TUI - Browse short video challenges from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --list               Print the challenge feed and exit\n  --config <path>      Read configuration from <path>"
                );
                action = Action::Exit;
            }
            "--list" => {
                if !matches!(action, Action::Exit) {
                    action = Action::List;
                }
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                opts.config_file = Some(PathBuf::from(path));
            }
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok((action, opts))
}
