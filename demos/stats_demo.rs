use chain_hash::ChainedHashTable;
use chain_hash::hashing::BucketHasher;
use chain_hash::hashing::DefaultHashed;
use clap::Parser;
use clap::ValueEnum;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scheme {
    Summation,
    Foldhash,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "initial_capacity", default_value_t = 5)]
    initial_capacity: usize,

    #[arg(short = 'n', long = "num_keys", default_value_t = 1000)]
    num_keys: usize,

    #[arg(short = 's', long = "scheme", value_enum, default_value_t = Scheme::Summation)]
    scheme: Scheme,

    /// Print every bucket's chain after filling the table.
    #[arg(long = "dump")]
    dump: bool,
}

fn report<H: BucketHasher<String>>(args: &Args, hasher: H) {
    let mut table = match ChainedHashTable::with_capacity_and_hasher(args.initial_capacity, hasher)
    {
        Ok(table) => table,
        Err(err) => {
            eprintln!("cannot create table: {err}");
            std::process::exit(1);
        }
    };

    println!(
        "Filling table ({} buckets, {:?}) with {} string keys...",
        table.capacity(),
        args.scheme,
        args.num_keys
    );

    let mut growths = 0;
    for i in 0..args.num_keys {
        let capacity = table.capacity();
        table.insert(format!("key_{i}"), i);
        if table.capacity() != capacity {
            growths += 1;
        }
    }

    println!(
        "Inserted {} keys, grew {} times to {} buckets",
        table.len(),
        growths,
        table.capacity()
    );
    println!("Final load factor: {:.2}%", table.load_factor() * 100.0);

    if args.dump {
        print!("{}", table.format_contents());
    }

    println!("=== Chain Length Histogram ===");
    for (length, buckets) in table.chain_histogram().iter().enumerate() {
        println!("{length:>3} | {buckets}");
    }
    table.debug_stats().print();

    let probe = "key_0".to_string();
    println!(
        "Chain length at {probe:?}: {}",
        table.chain_length_at(&probe)
    );
}

fn main() {
    let args = Args::parse();

    match args.scheme {
        Scheme::Summation => report(&args, chain_hash::Summation),
        Scheme::Foldhash => report(&args, DefaultHashed::default()),
    }
}
