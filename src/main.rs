use clap::{
    crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches,
    Command,
};
use colored::Colorize;
use sassify::{BatchReport, Config, FileDescriptor, Outcome, SandboxLimits};
use std::path::PathBuf;

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("build")
                .about("Renders every file declared in a config file")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("path to the config file")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value(Config::DEFAULT_FILE_NAME),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Renders a single source module to a stylesheet")
                .arg(
                    Arg::new("source")
                        .help("module whose export is rendered")
                        .value_parser(clap::value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("dest")
                        .help("stylesheet to write")
                        .value_parser(clap::value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("template")
                        .short('t')
                        .long("template")
                        .help("template used instead of the bundled one")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("map-name")
                        .short('m')
                        .long("map-name")
                        .help("group name for a module with a single export"),
                )
                .arg(
                    Arg::new("no-create-dirs")
                        .long("no-create-dirs")
                        .help("fail instead of creating missing parent directories")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    init_logger(matches.get_flag("verbose"));

    let report = match matches.subcommand() {
        Some(("build", args)) => handle_build(args)?,
        Some(("render", args)) => handle_render(args),
        _ => unreachable!(),
    };

    summarize(report)
}

fn init_logger(is_verbose: bool) {
    let level = if is_verbose { "debug" } else { "warn" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn handle_build(args: &ArgMatches) -> miette::Result<BatchReport> {
    let config = args
        .get_one::<PathBuf>("config")
        .expect("config has a default");

    Ok(sassify::build(config)?)
}

fn handle_render(args: &ArgMatches) -> BatchReport {
    let source = args.get_one::<PathBuf>("source").expect("source required");
    let dest = args.get_one::<PathBuf>("dest").expect("dest required");

    let mut file = FileDescriptor::new(source, dest);

    if let Some(template) = args.get_one::<PathBuf>("template") {
        file = file.with_template(template);
    }
    if let Some(map_name) = args.get_one::<String>("map-name") {
        file = file.with_map_name(map_name);
    }
    if args.get_flag("no-create-dirs") {
        file = file.without_directory_creation();
    }

    sassify::process_all(&[file], &SandboxLimits::default())
}

fn summarize(report: BatchReport) -> miette::Result<()> {
    let total = report.files.len();
    let mut failed = 0;

    for file_report in report.files {
        let source = file_report.file.source.display();

        match file_report.result {
            Ok(Outcome::Written(dest)) => {
                println!("{} {} -> {}", "write".green(), source, dest.display());
            }
            Ok(Outcome::Skipped) => {
                println!("{} {} (nothing exported)", "skip".yellow(), source);
            }
            Err(error) => {
                failed += 1;
                println!("{} {}", "error".red(), source);
                eprintln!("{:?}", miette::Report::new(error));
            }
        }
    }

    if failed > 0 {
        return Err(miette::miette!("{failed} of {total} file(s) failed"));
    }

    Ok(())
}
