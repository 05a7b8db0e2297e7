mod file_log;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use netcorecheck_shared::exit::error_exit_code;
use netcorecheck_shared::{
    HostfxrLoader, LogSink, NullLog, Probe, Result, RollForward, RuntimeQuery, codes, exit_code,
};
use tracing_subscriber::EnvFilter;

use file_log::FileLog;

#[derive(Parser, Debug)]
#[command(name = "netcorecheck", version)]
#[command(about = "Checks whether a .NET runtime satisfying a framework reference is installed")]
#[command(after_help = "\
If runtimeconfigfile is specified then runtimename, runtimeversion and rollforwardpolicy shouldn't be.

Examples:
  netcorecheck --runtimename Microsoft.AspNetCore.App --runtimeversion 3.1.0
  netcorecheck -n Microsoft.WindowsDesktop.App -v 5.0.1 -r LatestMajor
  netcorecheck -c c:\\Foo\\Bar.runtimeconfig.json -l c:\\Foo\\Bar.log")]
struct Cli {
    /// Runtime name (e.g., "Microsoft.AspNetCore.App")
    #[arg(short = 'n', long = "runtimename", value_name = "NAME")]
    runtime_name: Option<String>,

    /// Runtime version in format x.y.z (e.g., "1.2.3")
    #[arg(short = 'v', long = "runtimeversion", value_name = "VERSION")]
    runtime_version: Option<String>,

    /// Roll forward policy (e.g., "LatestMajor")
    #[arg(short = 'r', long = "rollforwardpolicy", value_name = "POLICY")]
    roll_forward: Option<RollForward>,

    /// Path to an existing runtime config file
    #[arg(
        short = 'c',
        long = "runtimeconfigfile",
        value_name = "PATH",
        conflicts_with_all = ["runtime_name", "runtime_version", "roll_forward"]
    )]
    runtime_config_file: Option<PathBuf>,

    /// Path to log file
    #[arg(short = 'l', long = "logfile", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

/// Every option name `Cli` accepts, lowercased.
const OPTION_NAMES: &[&str] = &[
    "-n",
    "--runtimename",
    "-v",
    "--runtimeversion",
    "-r",
    "--rollforwardpolicy",
    "-c",
    "--runtimeconfigfile",
    "-l",
    "--logfile",
];

/// Lowercase option names so `--RuntimeName` and `-N` parse like
/// `--runtimename` and `-n`. Option values are passed through untouched.
fn normalize_option_names<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut value_next = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || std::mem::take(&mut value_next) {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let (name, value) = match text.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (text, None),
            };
            let name = name.to_ascii_lowercase();
            if !OPTION_NAMES.contains(&name.as_str()) {
                return arg;
            }
            match value {
                Some(value) => format!("{}={}", name, value).into(),
                None => {
                    value_next = true;
                    name.into()
                }
            }
        })
        .collect()
}

impl Cli {
    fn query(&self) -> Result<RuntimeQuery> {
        RuntimeQuery::from_parts(
            self.runtime_config_file.clone(),
            self.runtime_name.clone(),
            self.runtime_version.clone(),
            self.roll_forward,
        )
    }
}

fn main() {
    init_tracing();

    let cli = match Cli::try_parse_from(normalize_option_names(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(parse_error_exit_code(e.kind()));
        }
    };

    std::process::exit(run(&cli));
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_error_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => codes::SUCCESS,
        _ => codes::INVALID_ARGS,
    }
}

fn run(cli: &Cli) -> i32 {
    let query = match cli.query() {
        Ok(query) => query,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, Cli::command().render_help());
            return error_exit_code(&e);
        }
    };

    let file_log = cli.log_file.as_deref().and_then(|path| {
        FileLog::open(path)
            .inspect_err(|e| {
                tracing::warn!("Failed to open log file '{}': {}", path.display(), e)
            })
            .ok()
    });
    let sink: &dyn LogSink = match &file_log {
        Some(log) => log,
        None => &NullLog,
    };

    let loader = HostfxrLoader::from_env();
    let outcome = Probe::new(&loader, sink).run(&query);
    exit_code(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        let args = std::iter::once("netcorecheck")
            .chain(args.iter().copied())
            .map(OsString::from);
        Cli::try_parse_from(normalize_option_names(args))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_framework_arguments() {
        let cli = parse(&[
            "-n",
            "Microsoft.WindowsDesktop.App",
            "-v",
            "5.0.1",
            "-r",
            "latestmajor",
            "-l",
            "check.log",
        ])
        .unwrap();

        assert_eq!(
            cli.query().unwrap(),
            RuntimeQuery::Synthesized {
                framework_name: "Microsoft.WindowsDesktop.App".into(),
                framework_version: "5.0.1".into(),
                roll_forward: Some(RollForward::LatestMajor),
            }
        );
        assert_eq!(cli.log_file, Some(PathBuf::from("check.log")));
    }

    #[test]
    fn test_long_argument_names() {
        let cli = parse(&[
            "--runtimeconfigfile",
            "Bar.runtimeconfig.json",
            "--logfile",
            "Bar.log",
        ])
        .unwrap();
        assert_eq!(
            cli.query().unwrap(),
            RuntimeQuery::ExistingDescriptor {
                path: PathBuf::from("Bar.runtimeconfig.json")
            }
        );
    }

    #[test]
    fn test_config_file_conflicts_with_framework() {
        let err =
            parse(&["-c", "Bar.runtimeconfig.json", "-n", "Microsoft.NETCore.App"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        assert_eq!(parse_error_exit_code(err.kind()), codes::INVALID_ARGS);
    }

    #[test]
    fn test_incomplete_framework_is_invalid() {
        let cli = parse(&["-n", "Microsoft.NETCore.App"]).unwrap();
        let err = cli.query().unwrap_err();
        assert_eq!(error_exit_code(&err), codes::INVALID_ARGS);
        assert_eq!(run(&cli), codes::INVALID_ARGS);
    }

    #[test]
    fn test_unknown_arguments_are_invalid() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert_eq!(parse_error_exit_code(err.kind()), codes::INVALID_ARGS);

        let err = parse(&["-n", "Microsoft.NETCore.App", "-v", "6.0.0", "-r", "Sideways"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(parse_error_exit_code(err.kind()), codes::INVALID_ARGS);
    }

    #[test]
    fn test_option_names_ignore_case() {
        let cli = parse(&[
            "--RuntimeName",
            "Microsoft.AspNetCore.App",
            "-V",
            "3.1.0",
            "--RollForwardPolicy=LatestMajor",
            "--LOGFILE",
            "Check.LOG",
        ])
        .unwrap();

        assert_eq!(
            cli.query().unwrap(),
            RuntimeQuery::Synthesized {
                framework_name: "Microsoft.AspNetCore.App".into(),
                framework_version: "3.1.0".into(),
                roll_forward: Some(RollForward::LatestMajor),
            }
        );
        assert_eq!(cli.log_file, Some(PathBuf::from("Check.LOG")));
    }

    #[test]
    fn test_option_values_keep_their_case() {
        let args = ["netcorecheck", "-L", "--RuntimeName", "-N", "Foo"].map(OsString::from);
        assert_eq!(
            normalize_option_names(args),
            ["netcorecheck", "-l", "--RuntimeName", "-n", "Foo"].map(OsString::from)
        );
    }

    #[test]
    fn test_help_exits_cleanly() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(parse_error_exit_code(err.kind()), codes::SUCCESS);
    }
}
