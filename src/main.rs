use callcache::CacheRegistry;
use clap::Parser;
use itertools::Itertools;
use log::info;

mod cli;
mod logging;

fn fib(registry: &CacheRegistry, n: u64) -> u128 {
    if n < 2 {
        return n as u128;
    }
    registry.invoke(|k| fib(registry, k), n - 1) + registry.invoke(|k| fib(registry, k), n - 2)
}

fn binomial(registry: &CacheRegistry, n: u64, k: u64) -> u128 {
    if k == 0 || k == n {
        return 1;
    }
    let recurse = |n: u64, k: u64| binomial(registry, n, k);
    registry.invoke_many(recurse, (n - 1, k - 1)) + registry.invoke_many(recurse, (n - 1, k))
}

fn main() {
    let args = cli::Args::parse();
    logging::setup_logger(args.verbosity, args.log_output.as_deref());
    args.validate();

    let registry = CacheRegistry::new();

    println!("fib({}) = {}", args.n, fib(&registry, args.n));
    info!("after fib: {}", registry.stats());

    if let Some(k) = args.choose {
        println!("C({}, {}) = {}", args.n, k, binomial(&registry, args.n, k));
        info!("after binomial: {}", registry.stats());
    }

    if args.row {
        let row = (0..=args.n).map(|k| binomial(&registry, args.n, k)).join(" ");
        println!("row {}: {}", args.n, row);
    }

    let stats = registry.stats();
    println!(
        "{} values computed, {} answered from cache, {} entries in {} cache instances",
        stats.computations(),
        stats.hits,
        registry.len(),
        registry.instance_count()
    );
}
