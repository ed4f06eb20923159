//! Replays a CSV transaction stream through the mining engines for a range
//! of sliding-window sizes and writes per-window timing files.

use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use closestream::{dataset, measure, EngineKind};

struct Options {
    dataset: PathBuf,
    name: String,
    format: String,
    engines: Vec<EngineKind>,
    windows: Vec<usize>,
    out_dir: PathBuf,
}

fn usage() -> ! {
    eprintln!(
        "usage: experiments <dataset.csv> [options]\n\
         \n\
         options:\n\
           --format <transactions|poker|mushroom>   dataset layout (default: transactions)\n\
           --engine <diu|mfci|stream-fci|all>       engine to measure (default: all)\n\
           --windows <n,n,...>                      window sizes (default: 250,500,1000,2500)\n\
           --out <dir>                              result directory (default: results)"
    );
    process::exit(2);
}

fn parse_options() -> Options {
    let mut args = std::env::args().skip(1);
    let Some(dataset) = args.next() else { usage() };
    if dataset.starts_with("--") {
        usage();
    }
    let dataset = PathBuf::from(dataset);
    let name = dataset
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());

    let mut options = Options {
        dataset,
        name,
        format: "transactions".to_string(),
        engines: EngineKind::ALL.to_vec(),
        windows: vec![250, 500, 1000, 2500],
        out_dir: PathBuf::from("results"),
    };

    while let Some(flag) = args.next() {
        let Some(value) = args.next() else { usage() };
        match flag.as_str() {
            "--format" => options.format = value,
            "--engine" => {
                options.engines = if value == "all" {
                    EngineKind::ALL.to_vec()
                } else {
                    match EngineKind::from_str(&value) {
                        Ok(kind) => vec![kind],
                        Err(err) => {
                            eprintln!("{err}");
                            usage();
                        }
                    }
                };
            }
            "--windows" => {
                options.windows = value
                    .split(',')
                    .map(|w| w.trim().parse())
                    .collect::<Result<_, _>>()
                    .unwrap_or_else(|_| usage());
            }
            "--out" => options.out_dir = PathBuf::from(value),
            _ => usage(),
        }
    }
    options
}

fn main() {
    let options = parse_options();

    let tdb = match options.format.as_str() {
        "transactions" => dataset::load_transactions(&options.dataset),
        "poker" => dataset::load_poker(&options.dataset, 100_000),
        "mushroom" => dataset::load_mushroom(&options.dataset),
        other => {
            eprintln!("unknown dataset format '{other}'");
            usage();
        }
    };
    let tdb = match tdb {
        Ok(tdb) => tdb,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    };
    println!(
        "loaded {} transactions from {}",
        tdb.len(),
        options.dataset.display()
    );

    for kind in &options.engines {
        let name = format!("{}_{}", kind.name(), options.name);
        println!("measuring {} over windows {:?}", kind.name(), options.windows);
        if let Err(err) =
            measure::run_experiments(*kind, &name, &tdb, &options.windows, &options.out_dir)
        {
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
    println!("results written to {}", options.out_dir.display());
}
