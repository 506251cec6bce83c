use std::collections::BTreeMap;
use http::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Serialize, Deserialize};
use crate::{Client, Error};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Push {
    pub streams: Vec<Stream>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub stream: BTreeMap<String, String>,
    pub values: Vec<Entry>,
}

// Serialized as `["<unix nanos>", "<line>"]`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Entry(#[serde(with = "crate::nanos")] pub u64, pub String);

impl Client {
    pub async fn push(&self, push: &Push) -> Result<(), Error> {
        let body = serde_json::to_vec(push)?;

        let mut request = self.request(Method::POST, &self.urls.push)?;
        request.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.body_mut().replace(body.into());
        self.send(request).await?;

        Ok(())
    }
}
