use clap::{Arg, Command};
use env_logger::{Builder, Env};
use nyc_geojoin::{registry, run_pipeline, Pipeline, PipelineConfig};
use std::path::PathBuf;

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .num_args(1)
        .help("Output file (.csv, or .geojson for GeoJSON); overrides the configured path")
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = Command::new("NYC GeoJoin")
        .version("0.1.0")
        .about("Enriches NYC Open Data street-infrastructure layers with nearest-neighbour joins")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .num_args(1)
                .global(true)
                .help("TOML pipeline configuration (optional, NYC defaults are built in)"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("curb")
                .about("Join curbs to nearby loading zones, parking meters and truck routes")
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("signals")
                .about("Merge pedestrian signals, street signs and traffic signals")
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("speed-humps")
                .about("Add longitude/latitude columns to the speed humps dataset")
                .arg(output_arg()),
        )
        .subcommand(Command::new("datasets").about("List the source datasets"))
        .subcommand(Command::new("show-config").about("Print the effective configuration"))
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => match PipelineConfig::load_from(&PathBuf::from(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };

    let (which, sub) = match matches.subcommand() {
        Some(("curb", sub)) => (Pipeline::Curb, sub),
        Some(("signals", sub)) => (Pipeline::Signals, sub),
        Some(("speed-humps", sub)) => (Pipeline::SpeedHumps, sub),
        Some(("datasets", _)) => {
            for dataset in registry::all() {
                println!("{:<30} {:<10} {}", dataset.key, dataset.dataset_id, dataset.display_name);
                println!("{:<30} {}", "", dataset.csv_url);
            }
            return;
        }
        Some(("show-config", _)) => {
            match config.to_toml() {
                Ok(text) => print!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
            return;
        }
        _ => unreachable!("clap requires a subcommand"),
    };

    if let Some(output) = sub.get_one::<String>("output").map(PathBuf::from) {
        match which {
            Pipeline::Curb => config.curb.output = output,
            Pipeline::Signals => config.signals.output = output,
            Pipeline::SpeedHumps => config.speed_humps.output = output,
        }
    }

    match run_pipeline(which, &config) {
        Ok(report) => println!(
            "Processing completed successfully: {} rows written to {}",
            report.rows_written,
            report.output.display()
        ),
        Err(e) => {
            eprintln!("Error processing files: {}", e);
            if matches!(e, nyc_geojoin::GeoJoinError::Projection(_)) {
                eprintln!(
                    "Please check the CRS of every input; \
                     joins need a projected CRS such as EPSG:2263."
                );
            }
            std::process::exit(1);
        }
    }
}
