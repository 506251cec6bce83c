use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use loki_api::{Auth, Client, Entry, Push, Stream};
use regex::Regex;
use tokio::runtime::{Builder, Runtime};
use crate::collect::{Closed, Connection, Consumer, Shutdown, Target};
use crate::os::hostname;
use super::Sink;

pub const NAME: &str = "loki";

const DESCRIPTION: &str = "\
loki handler
Sends a log entry to a Loki server for every connection seen by the inputs.
This is typically used in monitoring mode, once allow rules are in place.

Options:
    loki:url:<url>      Loki URL to ship logs to
    loki:user:<str>     username for basic auth
    loki:pass:<str>     password for basic auth
    loki:orgid:<id>     X-Scope-OrgID header added to requests (tenant)
    loki:labels:<key>=<value>[,<key>=<value>...]    additional stream labels
    loki:dedup:<bool>   ship each destination only once
    loki:timeout:<secs> request timeout (default 10)

Example:
    egress-audit -i nflog -o loki -O loki:url:http://localhost:3100";

const LABEL:   &str     = "^[a-zA-Z_][a-zA-Z0-9_]*$";
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Loki {
    url:     Option<String>,
    user:    Option<String>,
    pass:    Option<String>,
    orgid:   Option<String>,
    labels:  BTreeMap<String, String>,
    dedup:   bool,
    timeout: Duration,
    seen:    HashSet<Target>,
}

struct Shipper {
    client: Client,
    rt:     Runtime,
    labels: BTreeMap<String, String>,
}

impl Loki {
    pub fn new() -> Self {
        Self {
            url:     None,
            user:    None,
            pass:    None,
            orgid:   None,
            labels:  BTreeMap::new(),
            dedup:   false,
            timeout: TIMEOUT,
            seen:    HashSet::new(),
        }
    }

    fn client(&self) -> Result<Client> {
        let url  = self.url.as_deref().ok_or_else(|| anyhow!("loki output requires loki:url:<url>"))?;
        let auth = self.user.as_ref().map(|user| Auth {
            user: user.clone(),
            pass: self.pass.clone().unwrap_or_default(),
        });

        let client = Client::new(url, auth, self.orgid.as_deref())?;
        Ok(client.timeout(self.timeout))
    }

    fn shipper(&self) -> Result<Shipper> {
        let client = self.client()?;
        let rt     = Builder::new_current_thread().enable_all().build()?;

        let mut labels = self.labels.clone();
        labels.insert("host".to_owned(), host());

        Ok(Shipper { client, rt, labels })
    }

    fn fresh(&mut self, conn: &Connection) -> bool {
        !self.dedup || self.seen.insert(conn.target())
    }
}

impl Shipper {
    fn ship(&self, conn: &Connection) -> Result<()> {
        let line = serde_json::to_string(conn)?;
        let push = Push {
            streams: vec![Stream {
                stream: self.labels.clone(),
                values: vec![Entry(now(), line)],
            }],
        };

        match self.rt.block_on(self.client.push(&push)) {
            Ok(()) => Ok(()),
            Err(e) => {
                let body = serde_json::to_string(&push)?;
                Err(anyhow!("{}, request body was {}", e, body))
            }
        }
    }
}

impl Sink for Loki {
    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn process(&mut self, shutdown: &Shutdown, queue: Consumer) -> Result<()> {
        let shipper = self.shipper()?;

        info!("shipping connections to {}", shipper.client.url());

        loop {
            let conn: Arc<Connection> = match queue.recv(shutdown) {
                Ok(conn)                  => conn,
                Err(Closed::Cancelled)    => break,
                Err(Closed::Disconnected) => break,
            };

            if !self.fresh(&conn) {
                debug!("{} already shipped", conn.target());
                continue;
            }

            if let Err(e) = shipper.ship(&conn) {
                warn!("loki push for {} failed: {}", conn.target(), e);
            }
        }

        Ok(())
    }

    fn cleanup(&mut self) {
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "url"     => self.url     = Some(value.to_owned()),
            "user"    => self.user    = Some(value.to_owned()),
            "pass"    => self.pass    = Some(value.to_owned()),
            "orgid"   => self.orgid   = Some(value.to_owned()),
            "labels"  => self.labels.extend(labels(value)?),
            "dedup"   => self.dedup   = value.parse().with_context(|| {
                format!("invalid dedup flag '{}'", value)
            })?,
            "timeout" => self.timeout = Duration::from_secs(value.parse().with_context(|| {
                format!("invalid timeout '{}'", value)
            })?),
            _         => return Err(anyhow!("option '{}' unknown for loki output", key)),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.client().map(|_| ())
    }
}

impl Default for Loki {
    fn default() -> Self {
        Self::new()
    }
}

fn labels(value: &str) -> Result<Vec<(String, String)>> {
    let name = Regex::new(LABEL)?;

    value.split(',').map(|pair| {
        let mut split = pair.splitn(2, '=');
        match (split.next(), split.next()) {
            (Some(k), Some(v)) if name.is_match(k) => Ok((k.to_owned(), v.to_owned())),
            (Some(k), Some(_))                     => Err(anyhow!("invalid label name '{}'", k)),
            _                                      => Err(anyhow!("invalid label '{}', expected key=value", pair)),
        }
    }).collect()
}

fn host() -> String {
    match hostname() {
        Ok(host) => host,
        Err(e)   => {
            warn!("unable to get hostname: {}", e);
            String::new()
        }
    }
}

fn now() -> u64 {
    let now = time::get_time();
    now.sec as u64 * 1_000_000_000 + now.nsec as u64
}
