use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use crate::collect::{Closed, Connection, Consumer, Shutdown, Target, Version};
use super::Sink;

pub const NAME: &str = "iptables";

const DESCRIPTION: &str = "\
iptables handler
Generates iptables rules allowing the connections seen by the inputs.
Rules are printed when the program exits.

Options:
    iptables:verbosity:<LVL>    comments added to rules (0, 1 or 2)
        0: only the iptables command
        1: adds the process name and user that made the connection
        2: like 1, plus the command line and the parent process
    iptables:policy:<first|last>    attribution kept for a repeated destination
    iptables:file:<path>    write rules to a file instead of stdout";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Policy {
    First,
    Last,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    Idle,
    Accumulating,
    Rendering,
    Done,
}

pub struct IPTables {
    verbosity: u8,
    policy:    Policy,
    file:      Option<PathBuf>,
    rules:     Mutex<Rules>,
}

struct Rules {
    state:   State,
    entries: BTreeMap<Target, Arc<Connection>>,
}

impl IPTables {
    pub fn new() -> Self {
        Self {
            verbosity: 0,
            policy:    Policy::First,
            file:      None,
            rules:     Mutex::new(Rules {
                state:   State::Idle,
                entries: BTreeMap::new(),
            }),
        }
    }

    #[cfg(test)]
    pub(super) fn state(&self) -> State {
        self.rules.lock().state
    }

    pub fn record(&self, conn: Arc<Connection>) {
        let mut rules = self.rules.lock();

        match rules.state {
            State::Idle         => rules.state = State::Accumulating,
            State::Accumulating => (),
            _                   => return,
        }

        let target = conn.target();
        match self.policy {
            Policy::First => {
                rules.entries.entry(target).or_insert(conn);
            }
            Policy::Last  => {
                rules.entries.insert(target, conn);
            }
        }
    }

    pub fn render(&self) -> Vec<String> {
        let rules = self.rules.lock();
        rules.entries.values().map(|conn| {
            rule(conn, self.verbosity)
        }).collect()
    }

    fn write(&self, rules: &[String]) -> Result<()> {
        let mut out: Box<dyn Write> = match &self.file {
            Some(path) => {
                let file = File::create(path).with_context(|| {
                    format!("unable to create {}", path.display())
                })?;
                Box::new(file)
            }
            None       => Box::new(io::stdout()),
        };

        for rule in rules {
            writeln!(out, "{}", rule)?;
        }

        Ok(out.flush()?)
    }
}

impl Sink for IPTables {
    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn process(&mut self, shutdown: &Shutdown, queue: Consumer) -> Result<()> {
        loop {
            match queue.recv(shutdown) {
                Ok(conn)                  => self.record(conn),
                Err(Closed::Cancelled)    => break,
                Err(Closed::Disconnected) => break,
            }
        }
        debug!("iptables collected {} rules", self.rules.lock().entries.len());
        Ok(())
    }

    fn cleanup(&mut self) {
        {
            let mut rules = self.rules.lock();
            match rules.state {
                State::Done | State::Rendering => return,
                _                              => rules.state = State::Rendering,
            }
        }

        let rules = self.render();
        match self.write(&rules) {
            Ok(()) => info!("wrote {} iptables rules", rules.len()),
            Err(e) => warn!("unable to write iptables rules: {:?}", e),
        }

        self.rules.lock().state = State::Done;
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "verbosity" | "verbose" => self.verbosity = verbosity(value)?,
            "policy"                => self.policy    = value.parse()?,
            "file"                  => self.file      = Some(PathBuf::from(value)),
            _                       => return Err(anyhow!("option '{}' unknown for iptables output", key)),
        }
        Ok(())
    }
}

impl Default for IPTables {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Policy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Policy::First),
            "last"  => Ok(Policy::Last),
            _       => Err(anyhow!("invalid policy '{}', expected first or last", s)),
        }
    }
}

fn verbosity(value: &str) -> Result<u8> {
    let n = value.parse::<u8>().with_context(|| {
        format!("invalid verbosity '{}'", value)
    })?;

    match n {
        0..=2 => Ok(n),
        n     => Err(anyhow!("wrong verbosity {}, must be between 0 and 2", n)),
    }
}

fn rule(conn: &Connection, verbosity: u8) -> String {
    let proc = &conn.proc;
    let cmd  = match conn.version {
        Version::V4 => "iptables",
        Version::V6 => "ip6tables",
    };

    let rule = format!(
        "{} -I OUTPUT -d {} -p tcp -m tcp --dport {} -j ACCEPT -m comment --comment \"{}\"",
        cmd, conn.dst, conn.port, quote(&proc.name),
    );

    let origin = &conn.origin;
    match verbosity {
        0 => rule,
        1 => format!(
            "# [{}] Line generated for {} running as {}\n{}",
            origin, proc.name, proc.user, rule,
        ),
        _ => format!(
            "# [{}] Line generated for {} running as {} with command \"{}\"\n\
             # [{}] Parent of this process was {} running as {}\n{}",
            origin, proc.name, proc.user, proc.cmdline,
            origin, proc.parent.name, proc.parent.user, rule,
        ),
    }
}

fn quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
