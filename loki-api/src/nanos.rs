// Loki timestamps are unix nanoseconds written as a decimal string.

use std::fmt;
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::ser::Serializer;

pub fn serialize<S: Serializer>(nanos: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(nanos)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_str(Nanos)
}

struct Nanos;

impl<'de> Visitor<'de> for Nanos {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unix nanoseconds as a decimal string")
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<u64, E> {
        s.parse().map_err(|_| E::invalid_value(Unexpected::Str(s), &self))
    }
}
