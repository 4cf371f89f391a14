use anyhow::Result;
use clap::Parser;
use eai_assess::cli::{self, Cli, Commands, RunArgs};
use eai_assess::config::{self, CONFIG_FILE_NAME, LoadedConfig};
use eai_assess::engine::report::{self, AssessmentView, JsonBatchReport};
use eai_assess::engine::standards::Profile;
use eai_assess::{engine, ingest};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Assess(args) => run_assess(args),
        Commands::Batch(args) => run_batch(args),
        Commands::Standards(args) => run_standards(args),
        Commands::Init(args) => {
            if args.config.is_some() {
                eprintln!(
                    "warning: --config is ignored by `eai init`; writing ./{CONFIG_FILE_NAME}"
                );
            }

            let path = std::env::current_dir()?.join(CONFIG_FILE_NAME);
            config::write_default_config(&path)?;
            println!("created {}", path.display());
            Ok(0)
        }
    }
}

fn load(args: &RunArgs) -> Result<(LoadedConfig, Profile)> {
    let cwd = std::env::current_dir()?;
    let loaded = config::load_config(args.config.as_deref(), &cwd)?;
    let profile = loaded.config.build_profile(args.profile)?;
    Ok((loaded, profile))
}

fn run_assess(args: cli::AssessArgs) -> Result<i32> {
    let (loaded, profile) = load(&args.run)?;
    let measurements = ingest::read_measurement_set(&args.input)?;
    let assessment = engine::assess(&profile, &measurements);

    if args.run.json || loaded.config.general.json {
        let view = AssessmentView::from(&assessment);
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        report::print_human(&assessment);
    }

    Ok(finish(report::evaluate_exit([&assessment], &loaded.config)))
}

fn run_batch(args: cli::BatchArgs) -> Result<i32> {
    let (loaded, profile) = load(&args.run)?;
    let records = ingest::read_records(&args.input)?;
    let batch = engine::assess_batch(&profile, &records);

    if args.run.json || loaded.config.general.json {
        let json_report = JsonBatchReport::from(&batch);
        println!("{}", serde_json::to_string_pretty(&json_report)?);
    } else {
        report::print_batch_human(&batch);
    }

    Ok(finish(report::evaluate_exit(
        batch.assessments(),
        &loaded.config,
    )))
}

fn run_standards(args: RunArgs) -> Result<i32> {
    let (loaded, profile) = load(&args)?;

    if args.json || loaded.config.general.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        report::print_standards(&profile);
    }

    Ok(0)
}

fn finish(exit: report::ExitStatus) -> i32 {
    if exit.ok {
        0
    } else {
        eprintln!("exit: FAILED ({})", exit.reason_line());
        1
    }
}
