use std::time::Duration;
use http::Method;
use log::debug;
use reqwest::{Request, Response};
use reqwest::header::HeaderValue;
use url::Url;
use crate::Error;

pub const TENANT: &str = "X-Scope-OrgID";

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct Auth {
    pub user: String,
    pub pass: String,
}

pub struct Client {
    pub(crate) client: reqwest::Client,
    pub(crate) urls:   Urls,
    pub(crate) auth:   Option<Auth>,
    pub(crate) tenant: Option<HeaderValue>,
    pub(crate) limit:  Duration,
}

impl Client {
    pub fn new(base: &str, auth: Option<Auth>, tenant: Option<&str>) -> Result<Self, Error> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client: client,
            urls:   Urls::new(base)?,
            auth:   auth,
            tenant: tenant.map(HeaderValue::from_str).transpose()?,
            limit:  TIMEOUT,
        })
    }

    pub fn url(&self) -> &Url {
        &self.urls.push
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.limit = limit;
        self
    }

    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        let method   = request.method().clone();
        let response = self.client.execute(request).await?;
        let status   = response.status();

        debug!("{} {}: {}", method, response.url(), status);

        match status {
            _ if status.is_success() => Ok(response),
            _                        => Err(error(response).await),
        }
    }

    pub(crate) fn request(&self, method: Method, url: &Url) -> Result<Request, Error> {
        let mut builder = self.client.request(method, url.clone()).timeout(self.limit);

        if let Some(Auth { user, pass }) = &self.auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        if let Some(tenant) = &self.tenant {
            builder = builder.header(TENANT, tenant.clone());
        }

        Ok(builder.build()?)
    }
}

async fn error(response: Response) -> Error {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => Error::Status(status, body),
        Err(e)   => Error::Status(status, format!("<unreadable body: {}>", e)),
    }
}

#[derive(Clone, Debug)]
pub struct Urls {
    pub push: Url,
}

impl Urls {
    fn new(base: &str) -> Result<Self, Error> {
        let base = base.trim_end_matches('/');
        Ok(Self {
            push: Url::parse(&format!("{}/loki/api/v1/push", base))?,
        })
    }
}
