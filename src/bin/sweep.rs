//! Pairwise EMD Sweep Binary
//!
//! Loads a JSON event collection, computes the earth mover's distance
//! across every pair, and reports summary statistics.
//!
//! Options: --r, --beta, --norm, --center, --storage, --threads, --tag,
//! --save, --correlation, --halves

use anyhow::Context;
use clap::Parser;
use colored::*;
use earthmover::emd::Config;
use earthmover::emd::Correlation;
use earthmover::emd::Extra;
use earthmover::emd::OnError;
use earthmover::emd::Pairwise;
use earthmover::emd::Storage;
use earthmover::emd::EMD;
use earthmover::events::Center;
use earthmover::events::Euclidean;
use earthmover::events::Event;
use earthmover::events::Externals;
use earthmover::events::Particle;
use earthmover::events::Source;
use earthmover::log;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// path to a json file holding an array of events, each an array of
    /// {"weight": w, "coords": [x, y]} particles
    events: String,
    /// maximum number of events to read
    #[arg(long, default_value_t = 1000)]
    limit: usize,
    /// maximum ground distance, paid by unmatched weight
    #[arg(long, default_value_t = 1.)]
    r: f64,
    /// exponent applied to every ground distance
    #[arg(long, default_value_t = 1.)]
    beta: f64,
    /// divide each emd by the larger total weight
    #[arg(long)]
    norm: bool,
    /// let unmatched weight move for free instead of paying r
    #[arg(long)]
    free: bool,
    /// recenter every event on its weighted centroid before sweeping
    #[arg(long)]
    center: bool,
    /// pivot cap per solve
    #[arg(long, default_value_t = 100_000)]
    iters: usize,
    /// worker count, zero for one per logical cpu
    #[arg(long, default_value_t = 0)]
    threads: usize,
    /// result layout: full, full-symmetric, flattened, external
    #[arg(long, default_value = "flattened")]
    storage: String,
    /// tag failing pairs and finish instead of aborting on the first
    #[arg(long)]
    tag: bool,
    /// write the computed emds to this file
    #[arg(long)]
    save: Option<String>,
    /// stream into a correlation dimension estimator with log-spaced
    /// bins given as lo:hi:n; requires external storage
    #[arg(long)]
    correlation: Option<String>,
    /// split the collection in half and sweep across the halves, then
    /// chain the stored emds into one collection-level distance;
    /// requires full storage
    #[arg(long)]
    halves: bool,
}

/// File-backed event source, the usual adapter around a dataset on
/// disk. Whole file parsed up front; the sequential contract replays
/// it so drivers never know where events came from.
struct Dataset {
    events: Vec<Vec<Particle<2>>>,
    cursor: usize,
}

impl Dataset {
    fn open(path: &str, limit: usize) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path).with_context(|| format!("open events at {}", path))?;
        let mut events: Vec<Vec<Particle<2>>> =
            serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("parse events at {}", path))?;
        events.truncate(limit);
        Ok(Self { events, cursor: 0 })
    }
}

impl Source<2> for Dataset {
    fn reset(&mut self) {
        self.cursor = 0;
    }
    fn next(&mut self) -> bool {
        self.cursor += 1;
        self.cursor <= self.events.len()
    }
    fn particles(&self) -> Vec<Particle<2>> {
        self.events[self.cursor - 1].clone()
    }
    fn accepted(&self) -> usize {
        self.cursor.min(self.events.len())
    }
}

fn storage(name: &str) -> anyhow::Result<Storage> {
    match name {
        "full" => Ok(Storage::Full),
        "full-symmetric" => Ok(Storage::FullSymmetric),
        "flattened" => Ok(Storage::FlattenedSymmetric),
        "external" => Ok(Storage::External),
        other => anyhow::bail!("unknown storage layout: {}", other),
    }
}

fn correlation(bins: &str) -> anyhow::Result<Correlation> {
    match bins.split(':').collect::<Vec<_>>().as_slice() {
        [lo, hi, n] => Ok(Correlation::new(
            n.parse().context("correlation bin count")?,
            lo.parse().context("correlation lower bound")?,
            hi.parse().context("correlation upper bound")?,
        )),
        _ => anyhow::bail!("expected correlation bins as lo:hi:n, got {}", bins),
    }
}

fn main() -> anyhow::Result<()> {
    log();
    let args = Args::parse();
    let config = Config {
        r: args.r,
        beta: args.beta,
        norm: args.norm,
        extra: match args.free {
            true => Extra::Free,
            false => Extra::Cutoff,
        },
        n_iter_max: args.iters,
        ..Config::default()
    };
    let layout = storage(&args.storage)?;
    let mut events = {
        let ref mut source = Dataset::open(&args.events, args.limit)?;
        Event::gather(source)
    };
    log::info!("{:<32}{:<32}", "loaded events", events.len());

    let mut driver = Pairwise::from((Euclidean, config))
        .storage(layout)
        .threads(args.threads);
    if args.center {
        driver = driver.preprocess(Center);
    }
    if args.tag {
        driver = driver.on_error(OnError::Tag);
    }
    let estimator = match args.correlation.as_deref() {
        None => None,
        Some(bins) => {
            let estimator = Arc::new(correlation(bins)?);
            driver = driver.handler(Arc::clone(&estimator));
            Some(estimator)
        }
    };

    match args.halves {
        false => driver.compute(events)?,
        true => {
            let rhs = events.split_off(events.len() / 2);
            driver.compute_cross(events, rhs)?;
        }
    }
    print!("{}", driver);

    println!("{}", "summary".cyan().bold());
    println!("  pairs: {}", driver.pairs());
    match driver.failures() {
        0 => println!("  failed: {}", "none".green()),
        n => println!("  failed: {}", n.to_string().red()),
    }
    if layout != Storage::External {
        println!("  min emd: {}", format!("{:.6}", driver.min()).green());
        println!("  max emd: {}", format!("{:.6}", driver.max()).yellow());
    }
    if let Some(estimator) = estimator {
        println!("{}", "correlation dimension".cyan().bold());
        for (scale, slope) in estimator.dims() {
            println!("  {:>12.4}  {:8.4}", scale, slope);
        }
    }
    if let Some(path) = args.save.as_deref() {
        driver.save(path);
    }

    // with the cross emds stored dense, the two halves become weighted
    // point sets themselves and the sweep chains into one distance
    // between the halves as datasets
    if args.halves && layout == Storage::Full {
        let externals = Externals::dense(driver.neva(), driver.nevb(), driver.emds().to_vec())?;
        let config = Config {
            norm: true,
            timing: true,
            n_iter_max: args.iters,
            ..Config::default()
        };
        let ref mut emd = EMD::<_, 0>::from((externals, config));
        let lhs = vec![1.; driver.neva()];
        let rhs = vec![1.; driver.nevb()];
        let value = emd.compute_weighted(&lhs, &rhs)?;
        println!("{}", "dataset distance".cyan().bold());
        println!("  emd: {}", format!("{:.6}", value).magenta());
        println!("  solved in: {:?}", emd.duration());
    }
    Ok(())
}
