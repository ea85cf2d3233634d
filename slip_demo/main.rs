use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use slip_cells::{
    Avsl, AvslAudit, AvslStats, Datum, ErrorPolicy, ListHandle, Options, OptionsBuilder, Reader,
    SlipResult, DEFAULT_GROWTH_DELTA, DEFAULT_INITIAL_CELLS,
};

/// Raw command line arguments.
#[derive(Parser)]
#[command(about = "Build a sample SLIP structure and dump it")]
pub struct Args {
    /// Cells carved out when the arena is created
    #[arg(long, default_value_t = DEFAULT_INITIAL_CELLS)]
    pub initial_cells: usize,

    /// Cells added each time the arena runs dry
    #[arg(long, default_value_t = DEFAULT_GROWTH_DELTA)]
    pub growth_delta: usize,

    /// Levels of nesting in the sample structure
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Popping an empty list returns its header instead of an error
    #[arg(long, default_value_t = false)]
    pub sentinel: bool,

    /// Print the report as JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Serialize)]
struct Report {
    options: Options,
    leaves: Vec<String>,
    equal_after_copy: bool,
    stats: AvslStats,
    audit: AvslAudit,
}

pub fn print_error_message_and_exit(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

/// A list of `depth` nested levels, each holding its level number and a label, with the
/// innermost level pointing back at the outermost one.
fn build_sample(avsl: &mut Avsl, depth: usize) -> SlipResult<ListHandle> {
    let root = avsl.new_list()?;
    avsl.put(root, "name", "sample")?;
    avsl.put(root, "depth", depth as u64)?;

    let mut level = root;
    for n in 0..depth {
        avsl.enqueue(level, n as i64)?;
        avsl.enqueue(level, format!("level {n}"))?;

        let nested = avsl.new_list()?;
        avsl.enqueue(level, nested)?;
        // The sublist cell now holds the only reference we need
        avsl.delete_list(nested)?;
        level = nested;
    }

    avsl.enqueue(level, 'z')?;
    avsl.enqueue(level, root)?;
    Ok(root)
}

fn read_leaves(avsl: &mut Avsl, list: ListHandle) -> SlipResult<Vec<String>> {
    let mut reader = Reader::new(avsl, list)?;
    let mut leaves = Vec::new();
    while let Some(leaf) = reader.next_leaf(avsl)? {
        let text = match avsl.datum(leaf)? {
            Some(Datum::Str(text)) => text.clone(),
            Some(datum) => format!("{datum:?}"),
            None => continue,
        };
        leaves.push(text);
    }
    reader.close(avsl)?;
    Ok(leaves)
}

fn run(args: &Args) -> SlipResult<()> {
    let options = OptionsBuilder::new()
        .initial_cells(args.initial_cells)
        .growth_delta(args.growth_delta)
        .build();

    let mut avsl = Avsl::new(options);
    if args.sentinel {
        avsl.set_error_policy(ErrorPolicy::Sentinel);
    }

    let root = build_sample(&mut avsl, args.depth)?;
    tracing::info!(depth = args.depth, root = ?root, "built sample structure");
    let dump = avsl.dump_list(root)?;
    let leaves = read_leaves(&mut avsl, root)?;

    let copy = avsl.copy_list(root)?;
    let equal_after_copy = avsl.is_equal(root, copy)?;
    avsl.delete_list(copy)?;

    let report = Report {
        options,
        leaves,
        equal_after_copy,
        stats: avsl.stats(),
        audit: avsl.verify()?,
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => print_error_message_and_exit(&err.to_string()),
        }
    } else {
        print!("{dump}");
        println!("leaves: {}", report.leaves.join(", "));
        println!("copy is equal: {}", report.equal_after_copy);
        println!(
            "cells: {} total, {} available, {} live in {} lists, {} increments",
            report.stats.total,
            report.stats.available,
            report.audit.live,
            report.audit.lists,
            report.stats.allocation_increments
        );
    }

    // The root still holds itself through the innermost level
    avsl.delete_list(root)?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        print_error_message_and_exit(&err.to_string());
    }
}
