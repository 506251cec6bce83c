use std::collections::BTreeMap;
use crate::capture::{self, NFLog, Source};
use crate::output::{self, IPTables, Loki, Sink};

pub type SourceFactory = Box<dyn Fn() -> Box<dyn Source> + Send + Sync>;
pub type SinkFactory   = Box<dyn Fn() -> Box<dyn Sink> + Send + Sync>;

struct Plugin<F> {
    description: String,
    factory:     F,
}

pub struct Registry {
    sources: BTreeMap<String, Plugin<SourceFactory>>,
    sinks:   BTreeMap<String, Plugin<SinkFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            sinks:   BTreeMap::new(),
        }
    }

    pub fn register_source<F>(&mut self, name: &str, description: &str, factory: F)
    where
        F: Fn() -> Box<dyn Source> + Send + Sync + 'static,
    {
        self.sources.insert(name.to_owned(), Plugin {
            description: description.to_owned(),
            factory:     Box::new(factory),
        });
    }

    pub fn register_sink<F>(&mut self, name: &str, description: &str, factory: F)
    where
        F: Fn() -> Box<dyn Sink> + Send + Sync + 'static,
    {
        self.sinks.insert(name.to_owned(), Plugin {
            description: description.to_owned(),
            factory:     Box::new(factory),
        });
    }

    pub fn source(&self, name: &str) -> Option<Box<dyn Source>> {
        self.sources.get(name).map(|p| (p.factory)())
    }

    pub fn sink(&self, name: &str) -> Option<Box<dyn Sink>> {
        self.sinks.get(name).map(|p| (p.factory)())
    }

    pub fn sources(&self) -> Vec<(&str, &str)> {
        list(&self.sources)
    }

    pub fn sinks(&self) -> Vec<(&str, &str)> {
        list(&self.sinks)
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::new();

        let nflog = NFLog::new();
        registry.register_source(capture::NFLOG, nflog.description(), || Box::new(NFLog::new()));

        let iptables = IPTables::new();
        registry.register_sink(output::IPTABLES, iptables.description(), || Box::new(IPTables::new()));

        let loki = Loki::new();
        registry.register_sink(output::LOKI, loki.description(), || Box::new(Loki::new()));

        registry
    }
}

fn list<F>(plugins: &BTreeMap<String, Plugin<F>>) -> Vec<(&str, &str)> {
    plugins.iter().map(|(name, p)| {
        (name.as_str(), p.description.as_str())
    }).collect()
}

#[cfg(test)]
mod test {
    use anyhow::{anyhow, Result};
    use crate::collect::{Consumer, Shutdown};
    use crate::output::Sink;
    use super::Registry;

    struct Null(&'static str);

    impl Sink for Null {
        fn description(&self) -> &str {
            self.0
        }

        fn process(&mut self, _shutdown: &Shutdown, _queue: Consumer) -> Result<()> {
            Ok(())
        }

        fn cleanup(&mut self) {
        }

        fn set_option(&mut self, key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("option '{}' unknown", key))
        }
    }

    #[test]
    fn default_plugins() {
        let registry = Registry::default();

        let sources = registry.sources().into_iter().map(|(n, _)| n).collect::<Vec<_>>();
        let sinks   = registry.sinks().into_iter().map(|(n, _)| n).collect::<Vec<_>>();

        assert_eq!(vec!["nflog"],            sources);
        assert_eq!(vec!["iptables", "loki"], sinks);

        assert!(registry.source("nflog").is_some());
        assert!(registry.sink("loki").is_some());
        assert!(registry.source("iptables").is_none());
        assert!(registry.sink("nope").is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = Registry::new();
        registry.register_sink("null", "first", || Box::new(Null("first")));
        registry.register_sink("null", "second", || Box::new(Null("second")));

        assert_eq!(vec![("null", "second")], registry.sinks());
        assert_eq!(Some("second".to_owned()), registry.sink("null").map(|s| s.description().to_owned()));
    }

    #[test]
    fn fresh_instances() -> Result<()> {
        let registry = Registry::default();

        let mut first = registry.sink("iptables").ok_or_else(|| anyhow!("missing"))?;
        first.set_option("verbosity", "2")?;

        let second = registry.sink("iptables").ok_or_else(|| anyhow!("missing"))?;
        assert!(second.validate().is_ok());

        Ok(())
    }
}
