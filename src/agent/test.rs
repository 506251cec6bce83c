use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use crate::args::Opt;
use crate::capture::Source;
use crate::collect::{shutdown, Connection, Consumer, Producer, Shutdown};
use crate::output::Sink;
use crate::process::Process;
use crate::registry::Registry;
use super::{Agent, Config, CAPACITY};

#[derive(Clone, Default)]
struct Counts {
    cleanups: Arc<AtomicUsize>,
}

struct Burst {
    count:  u16,
    fail:   bool,
    panic:  bool,
    counts: Counts,
}

struct Collect {
    seen:   Arc<Mutex<Vec<u16>>>,
    reject: bool,
    panic:  bool,
    counts: Counts,
}

impl Source for Burst {
    fn description(&self) -> &str {
        "sends a burst of connections"
    }

    fn process(&mut self, shutdown: &Shutdown, queue: Producer) -> Result<()> {
        if self.fail {
            return Err(anyhow!("subscription failed"));
        }

        if self.panic {
            panic!("burst source crashed");
        }

        for port in 1..=self.count {
            let dst: SocketAddr = format!("10.0.0.1:{}", port).parse()?;
            let conn = Connection::new("burst", dst, Process::unknown());
            queue.send(Arc::new(conn), shutdown)?;
        }

        shutdown.wait(Duration::from_secs(30));

        Ok(())
    }

    fn cleanup(&mut self) {
        self.counts.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "count" => self.count = value.parse()?,
            "fail"  => self.fail  = value.parse()?,
            "panic" => self.panic = value.parse()?,
            _       => return Err(anyhow!("unknown option {}", key)),
        }
        Ok(())
    }
}

impl Sink for Collect {
    fn description(&self) -> &str {
        "collects destination ports"
    }

    fn process(&mut self, shutdown: &Shutdown, queue: Consumer) -> Result<()> {
        while let Ok(conn) = queue.recv(shutdown) {
            if self.panic {
                panic!("collect sink crashed on port {}", conn.port);
            }
            self.seen.lock().push(conn.port);
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        self.counts.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "reject" => self.reject = value.parse()?,
            "panic"  => self.panic  = value.parse()?,
            _        => return Err(anyhow!("unknown option {}", key)),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self.reject {
            true  => Err(anyhow!("rejected")),
            false => Ok(()),
        }
    }
}

struct Fixture {
    registry: Registry,
    counts:   Counts,
    seen:     Vec<Arc<Mutex<Vec<u16>>>>,
}

fn fixture() -> Fixture {
    let counts = Counts::default();
    let seen   = vec![Arc::new(Mutex::new(Vec::new())), Arc::new(Mutex::new(Vec::new()))];

    let mut registry = Registry::new();

    let c = counts.clone();
    registry.register_source("burst", "burst", move || {
        Box::new(Burst { count: 0, fail: false, panic: false, counts: c.clone() })
    });

    for (name, seen) in ["a", "b"].iter().zip(seen.iter()) {
        let c    = counts.clone();
        let seen = seen.clone();
        registry.register_sink(name, name, move || {
            Box::new(Collect { seen: seen.clone(), reject: false, panic: false, counts: c.clone() })
        });
    }

    Fixture { registry, counts, seen }
}

fn opt(s: &str) -> Opt {
    s.parse().unwrap()
}

fn config(inputs: &[&str], outputs: &[&str], inopts: &[&str], outopts: &[&str]) -> Config {
    Config {
        inputs:   inputs.iter().map(|s| s.to_string()).collect(),
        outputs:  outputs.iter().map(|s| s.to_string()).collect(),
        inopts:   inopts.iter().map(|s| opt(s)).collect(),
        outopts:  outopts.iter().map(|s| opt(s)).collect(),
        capacity: CAPACITY,
    }
}

fn wait_for(seen: &Mutex<Vec<u16>>, n: usize) {
    let start = Instant::now();
    while seen.lock().len() < n && start.elapsed() < Duration::from_secs(10) {
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn fanout_to_every_sink() -> Result<()> {
    let fx  = fixture();
    let cfg = config(&["burst"], &["a", "b"], &["burst:count:100"], &[]);

    let (trigger, shutdown) = shutdown();
    let running = Agent::new(&fx.registry, cfg)?.start(shutdown)?;

    wait_for(&fx.seen[0], 100);
    wait_for(&fx.seen[1], 100);

    let start = Instant::now();
    running.stop(trigger)?;
    assert!(start.elapsed() < Duration::from_secs(5));

    let want = (1..=100).collect::<Vec<u16>>();
    assert_eq!(want, *fx.seen[0].lock());
    assert_eq!(want, *fx.seen[1].lock());
    assert_eq!(3, fx.counts.cleanups.load(Ordering::SeqCst));

    Ok(())
}

#[test]
fn stop_under_backpressure() -> Result<()> {
    let fx  = fixture();
    let mut cfg = config(&["burst"], &["a"], &["burst:count:1000"], &[]);
    cfg.capacity = 1;

    let (trigger, shutdown) = shutdown();
    let running = Agent::new(&fx.registry, cfg)?.start(shutdown)?;

    wait_for(&fx.seen[0], 1);

    let start = Instant::now();
    running.stop(trigger)?;
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(2, fx.counts.cleanups.load(Ordering::SeqCst));

    Ok(())
}

#[test]
fn failed_source_keeps_running() -> Result<()> {
    let fx  = fixture();
    let cfg = config(&["burst"], &["a"], &["burst:fail:true"], &[]);

    let (trigger, shutdown) = shutdown();
    let running = Agent::new(&fx.registry, cfg)?.start(shutdown)?;

    thread::sleep(Duration::from_millis(50));
    running.stop(trigger)?;

    assert!(fx.seen[0].lock().is_empty());
    assert_eq!(2, fx.counts.cleanups.load(Ordering::SeqCst));

    Ok(())
}

#[test]
fn panicked_sink_cleaned_up() -> Result<()> {
    let fx  = fixture();
    let cfg = config(&["burst"], &["a", "b"], &["burst:count:5"], &["a:panic:true"]);

    let (trigger, shutdown) = shutdown();
    let running = Agent::new(&fx.registry, cfg)?.start(shutdown)?;

    wait_for(&fx.seen[1], 5);
    running.stop(trigger)?;

    assert!(fx.seen[0].lock().is_empty());
    assert_eq!(vec![1, 2, 3, 4, 5], *fx.seen[1].lock());
    assert_eq!(3, fx.counts.cleanups.load(Ordering::SeqCst));

    Ok(())
}

#[test]
fn panicked_source_cleaned_up() -> Result<()> {
    let fx  = fixture();
    let cfg = config(&["burst"], &["a"], &["burst:panic:true"], &[]);

    let (trigger, shutdown) = shutdown();
    let running = Agent::new(&fx.registry, cfg)?.start(shutdown)?;

    thread::sleep(Duration::from_millis(50));
    running.stop(trigger)?;

    assert!(fx.seen[0].lock().is_empty());
    assert_eq!(2, fx.counts.cleanups.load(Ordering::SeqCst));

    Ok(())
}

#[test]
fn duplicate_selection() -> Result<()> {
    let fx  = fixture();
    let cfg = config(&["burst", "burst"], &["a", "a"], &["burst:count:3"], &[]);

    let (trigger, shutdown) = shutdown();
    let running = Agent::new(&fx.registry, cfg)?.start(shutdown)?;

    wait_for(&fx.seen[0], 3);
    running.stop(trigger)?;

    assert_eq!(vec![1, 2, 3], *fx.seen[0].lock());
    assert_eq!(2, fx.counts.cleanups.load(Ordering::SeqCst));

    Ok(())
}

#[test]
fn invalid_config() {
    let fx = fixture();

    let invalid = [
        config(&[],        &["a"], &[],            &[]),
        config(&["burst"], &[],    &[],            &[]),
        config(&["nope"],  &["a"], &[],            &[]),
        config(&["burst"], &["c"], &[],            &[]),
        config(&["burst"], &["a"], &["burst:x:1"], &[]),
        config(&["burst"], &["a"], &[],            &["b:reject:false"]),
        config(&["burst"], &["a"], &[],            &["a:reject:true"]),
        config(&["burst"], &["a"], &["a:count:1"], &[]),
    ];

    for cfg in invalid.iter() {
        assert!(Agent::new(&fx.registry, cfg.clone()).is_err(), "accepted {:?}", cfg);
    }

    assert_eq!(0, fx.counts.cleanups.load(Ordering::SeqCst));
}
