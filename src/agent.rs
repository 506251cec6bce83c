use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use crate::args::Opt;
use crate::capture::Source;
use crate::collect::{bounded, Closed, Consumer, Producer, Shutdown, Trigger};
use crate::output::Sink;
use crate::registry::Registry;

pub const CAPACITY: usize = 20;

#[derive(Clone, Debug)]
pub struct Config {
    pub inputs:   Vec<String>,
    pub outputs:  Vec<String>,
    pub inopts:   Vec<Opt>,
    pub outopts:  Vec<Opt>,
    pub capacity: usize,
}

pub struct Agent {
    sources:  Vec<(String, Box<dyn Source>)>,
    sinks:    Vec<(String, Box<dyn Sink>)>,
    capacity: usize,
}

pub struct Running {
    sources: Vec<JoinHandle<(String, Box<dyn Source>)>>,
    sinks:   Vec<JoinHandle<(String, Box<dyn Sink>)>>,
    fanout:  JoinHandle<()>,
}

impl Agent {
    pub fn new(registry: &Registry, cfg: Config) -> Result<Self> {
        if cfg.inputs.is_empty() {
            return Err(anyhow!("no input selected"));
        }

        if cfg.outputs.is_empty() {
            return Err(anyhow!("no output selected"));
        }

        let mut sources = select(&cfg.inputs, "input", |name| registry.source(name))?;
        let mut sinks   = select(&cfg.outputs, "output", |name| registry.sink(name))?;

        for opt in &cfg.inopts {
            let source = find(&mut sources, &opt.plugin, "input")?;
            source.set_option(&opt.key, &opt.value).with_context(|| {
                format!("input {} option {}", opt.plugin, opt.key)
            })?;
        }

        for opt in &cfg.outopts {
            let sink = find(&mut sinks, &opt.plugin, "output")?;
            sink.set_option(&opt.key, &opt.value).with_context(|| {
                format!("output {} option {}", opt.plugin, opt.key)
            })?;
        }

        for (name, source) in &sources {
            source.validate().with_context(|| format!("input {}", name))?;
        }

        for (name, sink) in &sinks {
            sink.validate().with_context(|| format!("output {}", name))?;
        }

        Ok(Self {
            sources:  sources,
            sinks:    sinks,
            capacity: cfg.capacity.max(1),
        })
    }

    pub fn start(self, shutdown: Shutdown) -> Result<Running> {
        let (tx, rx) = bounded(self.capacity);

        let mut outs  = Vec::with_capacity(self.sinks.len());
        let mut sinks = Vec::with_capacity(self.sinks.len());

        for (name, sink) in self.sinks {
            let (out, queue) = bounded(self.capacity);
            let shutdown     = shutdown.clone();

            outs.push((name.clone(), out));
            sinks.push(thread::Builder::new().name(format!("output-{}", name)).spawn(move || {
                work("output", name, sink, |sink| sink.process(&shutdown, queue))
            })?);
        }

        let fanout = {
            let shutdown = shutdown.clone();
            thread::Builder::new().name("fanout".to_owned()).spawn(move || {
                fanout(&shutdown, rx, outs)
            })?
        };

        let mut sources = Vec::with_capacity(self.sources.len());

        for (name, source) in self.sources {
            let queue    = tx.clone();
            let shutdown = shutdown.clone();

            sources.push(thread::Builder::new().name(format!("input-{}", name)).spawn(move || {
                work("input", name, source, |source| source.process(&shutdown, queue))
            })?);
        }

        Ok(Running { sources, sinks, fanout })
    }
}

impl Running {
    pub fn stop(self, trigger: Trigger) -> Result<()> {
        info!("shutting down");

        trigger.raise();

        let sources = join(self.sources, "input");

        if self.fanout.join().is_err() {
            warn!("fanout worker panicked");
        }

        let sinks = join(self.sinks, "output");

        for (name, mut source) in sources {
            debug!("cleaning up input {}", name);
            source.cleanup();
        }

        for (name, mut sink) in sinks {
            debug!("cleaning up output {}", name);
            sink.cleanup();
        }

        Ok(())
    }
}

// The plugin is handed back even if process panics, so cleanup still runs.
fn work<P, F>(kind: &str, name: String, mut plugin: P, process: F) -> (String, P)
where
    F: FnOnce(&mut P) -> Result<()>,
{
    info!("starting {} {}", name, kind);
    match panic::catch_unwind(AssertUnwindSafe(|| process(&mut plugin))) {
        Ok(Ok(())) => debug!("{} {} finished", kind, name),
        Ok(Err(e)) => warn!("{} {} stopped: {:?}", kind, name, e),
        Err(_)     => error!("{} {} panicked", kind, name),
    }
    (name, plugin)
}

fn fanout(shutdown: &Shutdown, queue: Consumer, mut outs: Vec<(String, Producer)>) {
    loop {
        let conn = match queue.recv(shutdown) {
            Ok(conn)                  => conn,
            Err(Closed::Cancelled)    => return,
            Err(Closed::Disconnected) => {
                debug!("all inputs finished");
                return;
            }
        };

        let mut index = 0;
        while index < outs.len() {
            match outs[index].1.send(conn.clone(), shutdown) {
                Ok(())                    => index += 1,
                Err(Closed::Cancelled)    => return,
                Err(Closed::Disconnected) => {
                    let (name, _) = outs.remove(index);
                    warn!("output {} no longer accepts connections", name);
                }
            }
        }
    }
}

fn select<T, F>(names: &[String], kind: &str, factory: F) -> Result<Vec<(String, T)>>
where
    F: Fn(&str) -> Option<T>,
{
    let mut seen     = HashSet::new();
    let mut selected = Vec::with_capacity(names.len());

    for name in names {
        if !seen.insert(name.as_str()) {
            warn!("{} {} selected more than once", kind, name);
            continue;
        }

        match factory(name) {
            Some(plugin) => selected.push((name.clone(), plugin)),
            None         => return Err(anyhow!("unknown {} '{}'", kind, name)),
        }
    }

    Ok(selected)
}

fn find<'a, T>(plugins: &'a mut [(String, T)], name: &str, kind: &str) -> Result<&'a mut T> {
    plugins.iter_mut().find(|(n, _)| n == name).map(|(_, p)| p).ok_or_else(|| {
        anyhow!("option given for {} '{}' which is not selected", kind, name)
    })
}

fn join<T>(handles: Vec<JoinHandle<(String, T)>>, kind: &str) -> Vec<(String, T)> {
    handles.into_iter().filter_map(|handle| {
        match handle.join() {
            Ok(plugin) => Some(plugin),
            Err(_)     => {
                warn!("{} worker panicked", kind);
                None
            }
        }
    }).collect()
}

#[cfg(test)]
mod test;
