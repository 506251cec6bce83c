use std::str::FromStr;
use anyhow::{anyhow, Result};
use clap::ArgMatches;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Opt {
    pub plugin: String,
    pub key:    String,
    pub value:  String,
}

impl FromStr for Opt {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split = s.splitn(3, ':');
        match (split.next(), split.next(), split.next()) {
            (Some(plugin), Some(key), Some(value)) if !plugin.is_empty() && !key.is_empty() => Ok(Opt {
                plugin: plugin.to_owned(),
                key:    key.to_owned(),
                value:  value.to_owned(),
            }),
            _ => Err(anyhow!("expected <plugin>:<key>:<value>")),
        }
    }
}

pub fn opt<T: FromStr>(arg: Option<&str>) -> Result<Option<T>> {
    Ok(arg.map(|s| T::from_str(s).map_err(|_| {
        let msg  = format!("invalid argument value '{}'", s);
        let kind = clap::ErrorKind::InvalidValue;
        clap::Error::with_description(&msg, kind)
    })).transpose()?)
}

pub fn opts<T: FromStr>(args: &ArgMatches, name: &str) -> Result<Vec<T>> {
    let values = args.values_of(name).into_iter().flatten();
    values.filter_map(|s| opt(Some(s)).transpose()).collect()
}

pub fn names(args: &ArgMatches, name: &str) -> Vec<String> {
    args.values_of(name).into_iter().flatten().map(String::from).collect()
}
