use rview::app::RunOptions;

enum Cli {
    Exit,
    Run(RunOptions),
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Cli::Exit) => return,
        Ok(Cli::Run(options)) => options,
        Err(message) => {
            eprintln!("error: {message}\n\n{}", usage());
            std::process::exit(2);
        }
    };

    let _log_guard = match rview::logging::init(None) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("warning: logging disabled: {err:?}");
            None
        }
    };

    if let Err(err) = rview::run(options) {
        tracing::error!(error = ?err, "exiting");
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn usage() -> String {
    format!(
        "RView {} - Browse Reddit from the terminal.\n\nUsage: rview [OPTIONS]\n\n  --source, -s NAME    Start in r/NAME instead of the configured default\n  --config, -c PATH    Read settings from PATH instead of the default file\n  --offline            Use built-in sample posts, no network\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message",
        rview::VERSION
    )
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut options = RunOptions::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("RView {}", rview::VERSION);
                return Ok(Cli::Exit);
            }
            "--help" | "-h" => {
                println!("{}", usage());
                return Ok(Cli::Exit);
            }
            "--offline" => options.offline = true,
            "--source" | "-s" => {
                let name = args
                    .next()
                    .ok_or_else(|| format!("{arg} requires a subreddit name"))?;
                options.source = Some(name);
            }
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("{arg} requires a file path"))?;
                options.config_file = Some(path.into());
            }
            other => {
                if let Some(name) = other.strip_prefix("--source=") {
                    options.source = Some(name.to_string());
                } else if let Some(path) = other.strip_prefix("--config=") {
                    options.config_file = Some(path.into());
                } else {
                    return Err(format!("unrecognized argument '{other}'"));
                }
            }
        }
    }
    Ok(Cli::Run(options))
}
