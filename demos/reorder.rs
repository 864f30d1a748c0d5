use clap::{Parser, ValueEnum};

use bdd_engine::bdd::Bdd;
use bdd_engine::config::BddConfig;
use bdd_engine::reference::Ref;
use bdd_engine::reorder::ReorderMethod;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Method {
    Win2,
    Win2ite,
    Win3,
    Win3ite,
    Sift,
    Siftite,
}

impl From<Method> for ReorderMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Win2 => ReorderMethod::Win2,
            Method::Win2ite => ReorderMethod::Win2Ite,
            Method::Win3 => ReorderMethod::Win3,
            Method::Win3ite => ReorderMethod::Win3Ite,
            Method::Sift => ReorderMethod::Sift,
            Method::Siftite => ReorderMethod::SiftIte,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Variable reordering on x1&y1 | ... | xn&yn")]
struct Cli {
    /// Number of pairs.
    #[arg(value_name = "INT", default_value = "10")]
    n: u32,

    /// Reordering heuristic.
    #[arg(long, value_enum, default_value = "sift")]
    method: Method,

    /// Reorder automatically while building instead of once at the end.
    #[arg(long)]
    auto: bool,

    /// Initial node capacity.
    #[arg(long, value_name = "INT", default_value = "1024")]
    capacity: usize,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let mut bdd = Bdd::with_config(BddConfig::default().with_node_capacity(args.capacity))?;
    let n = args.n;
    bdd.set_var_num(2 * n)?;
    let method = ReorderMethod::from(args.method);
    if args.auto {
        bdd.set_auto_reorder(method, None);
    }

    // x_i is variable i, y_i is variable n + i: the worst order for this function.
    let mut f = Ref::ZERO;
    for i in 0..n {
        let x = bdd.ith_var(i)?;
        let y = bdd.ith_var(n + i)?;
        let t = bdd.apply_and(x, y)?;
        let g = bdd.apply_or(f, t)?;
        bdd.protect(g)?;
        if f != Ref::ZERO {
            bdd.release(f);
        }
        f = g;
    }
    println!("built f: {} nodes, order = {:?}", bdd.node_count(f)?, order(&bdd));

    if !args.auto {
        let stats = bdd.reorder(method)?;
        println!(
            "{}: {} -> {} nodes ({:.1}% reduction), {} swaps",
            method,
            stats.initial_size,
            stats.final_size,
            stats.reduction_percent(),
            stats.swaps
        );
    }

    println!("after reordering: {} nodes, order = {:?}", bdd.node_count(f)?, order(&bdd));
    println!("sat_count = {}", bdd.sat_count_exact(f)?);
    println!("stats = {:?}", bdd.stats());

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}

fn order(bdd: &Bdd) -> Vec<u32> {
    bdd.current_order().into_iter().map(u32::from).collect()
}
