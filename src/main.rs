use anyhow::Result;
use clap::{App, load_yaml};
use env_logger::Builder;
use jemallocator::Jemalloc;
use log::info;
use log::LevelFilter::*;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use egress_audit::agent::{self, Agent, CAPACITY};
use egress_audit::args::{names, opts};
use egress_audit::collect::shutdown;
use egress_audit::registry::Registry;

#[global_allocator]
static ALLOC: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    let yaml = load_yaml!("args.yml");
    let ver  = env!("CARGO_PKG_VERSION");
    let args = App::from_yaml(&yaml).version(ver).get_matches();

    let (module, level) = match args.occurrences_of("verbose") {
        0 => (Some(module_path!()), Info),
        1 => (Some(module_path!()), Debug),
        2 => (Some(module_path!()), Trace),
        _ => (None,                 Trace),
    };
    Builder::from_default_env().filter(module, level).init();

    let registry = Registry::default();

    if args.is_present("list") {
        list(&registry);
        return Ok(());
    }

    let config = agent::Config {
        inputs:   names(&args, "input"),
        outputs:  names(&args, "output"),
        inopts:   opts(&args, "inopt")?,
        outopts:  opts(&args, "outopt")?,
        capacity: CAPACITY,
    };

    info!("initializing egress-audit {}", ver);

    let agent = Agent::new(&registry, config)?;

    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    let (trigger, shutdown) = shutdown();

    let running = agent.start(shutdown)?;

    if let Some(signal) = signals.forever().next() {
        info!("received signal {}", signal);
    }

    running.stop(trigger)
}

fn list(registry: &Registry) {
    print("inputs",  registry.sources());
    print("outputs", registry.sinks());
}

fn print(title: &str, plugins: Vec<(&str, &str)>) {
    println!("{}:", title);
    for (name, description) in plugins {
        println!("\n  {}", name);
        for line in description.lines() {
            println!("      {}", line);
        }
    }
    println!();
}
