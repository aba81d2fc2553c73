use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::write::EncoderWriter;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy};
use tracing::warn;

use crate::error::ConfigurationError;

#[derive(Clone, Eq, PartialEq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicAuth {{ username: {}, password: ****** }}", self.username)
    }
}

#[derive(Default, Clone)]
pub struct SchemaRegistryConfig {
    /// One URL per registry replica behind the same logical endpoint.
    pub(crate) urls: Vec<String>,
    pub(crate) authentication: Option<BasicAuth>,
    pub(crate) proxy: Option<String>,
    pub(crate) headers: Option<HashMap<String, String>>,
    /// Context bound at construction time; applied to every subject path.
    pub(crate) context: Option<String>,
}

impl SchemaRegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url<S>(mut self, url: S) -> Self
    where
        S: Into<String>,
    {
        self.urls.push(url.into());
        self
    }

    /// `user:password` as produced by `SCHEMA_REGISTRY_BASIC_AUTH_USER_INFO`.
    pub fn basic_auth_user_info(mut self, user_info: &str) -> Self {
        if self.authentication.is_some() {
            warn!("overwriting existing authentication configuration");
        }

        let (username, password) = match user_info.split_once(':') {
            Some((username, password)) => (username.to_owned(), Some(password.to_owned())),
            None => (user_info.to_owned(), None),
        };

        self.authentication = Some(BasicAuth { username, password });
        self
    }

    pub fn basic_auth<'a, S>(mut self, username: S, password: S) -> Self
    where
        S: Into<Option<&'a String>>,
    {
        if self.authentication.is_some() {
            warn!("overwriting existing authentication configuration");
        }

        let Some(username) = username.into() else {
            warn!("basic auth not applied, provided username is none");
            return self;
        };

        let username = username.to_owned();
        let password = password.into().map(|password| password.to_owned());

        self.authentication = Some(BasicAuth { username, password });
        self
    }

    pub fn proxy<'a, S>(mut self, proxy: S) -> Self
    where
        S: Into<Option<&'a String>>,
    {
        self.proxy = proxy.into().map(|proxy| proxy.to_owned());
        self
    }

    pub fn headers<S, I>(mut self, headers: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, S)>,
    {
        self.headers = Some(
            headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }
}

pub fn basic_auth_header<U, P>(
    username: U,
    password: Option<P>,
) -> Result<(HeaderName, HeaderValue), ConfigurationError>
where
    U: fmt::Display,
    P: fmt::Display,
{
    let mut buf = b"Basic ".to_vec();
    {
        let mut encoder = EncoderWriter::new(&mut buf, &BASE64_STANDARD);

        write!(encoder, "{}:", username)?;
        if let Some(password) = password {
            write!(encoder, "{}", password)?;
        }
    }

    let header_name = header::AUTHORIZATION;
    let mut header_value = HeaderValue::from_bytes(&buf)?;
    header_value.set_sensitive(true);
    Ok((header_name, header_value))
}

pub(crate) fn build_headers(
    headers: &HashMap<String, String>,
) -> Result<HeaderMap, ConfigurationError> {
    let mut header_map = HeaderMap::new();

    for (name, value) in headers {
        let header_name = HeaderName::from_str(name)?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.insert(header_name, header_value);
    }

    Ok(header_map)
}

pub(crate) fn build_proxy(proxy: &String) -> Result<Proxy, ConfigurationError> {
    let proxy = Proxy::all(proxy)?;
    Ok(proxy)
}

pub(crate) fn build_http_client(conf: &SchemaRegistryConfig) -> Result<Client, ConfigurationError> {
    let mut default_headers = HeaderMap::new();

    if let Some(headers) = &conf.headers {
        default_headers = build_headers(headers)?;
    }

    if let Some(auth) = &conf.authentication {
        let (header_name, header_value) =
            basic_auth_header(&auth.username, auth.password.as_ref())?;
        default_headers.insert(header_name, header_value);
    }

    let proxy = conf.proxy.as_ref().map(build_proxy).transpose()?;

    let mut client_builder = Client::builder()
        .default_headers(default_headers)
        .timeout(std::time::Duration::from_secs(30));

    if let Some(proxy) = proxy {
        client_builder = client_builder.proxy(proxy);
    }

    let http_client = client_builder.build().map_err(ConfigurationError::from)?;

    Ok(http_client)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use factori::factori;
    use factori::factori_impl::create;

    use crate::client::config::SchemaRegistryConfig;

    fn headers() -> HashMap<String, String> {
        HashMap::from([("x_app_id".to_owned(), "my-app".to_owned())])
    }

    struct MockEnvOptionalVars {
        pub schema_registry_url: String,
        pub schema_registry_username: Option<String>,
        pub schema_registry_password: Option<String>,
        pub schema_registry_proxy: Option<String>,
        pub schema_registry_headers: HashMap<String, String>,
    }

    factori!(MockEnvOptionalVars, {
        default {
            schema_registry_url = "http://localhost:8081".to_owned(),
            schema_registry_username = None,
            schema_registry_password = None,
            schema_registry_proxy = None,
            schema_registry_headers = HashMap::new(),
        }

        mixin with_username {
            schema_registry_username = Some("sr-username".to_owned()),
        }

        mixin with_password {
            schema_registry_password = Some("sr-password".to_owned()),
        }

        mixin with_proxy {
            schema_registry_proxy = Some("http://localhost:9999".to_owned())
        }

        mixin with_headers {
            schema_registry_headers = headers(),
        }
    });

    #[test]
    fn create_config_with_basic_auth() {
        let app = create!(MockEnvOptionalVars, :with_username, :with_password, :with_proxy, :with_headers);

        let config = SchemaRegistryConfig::new()
            .url(&app.schema_registry_url)
            .basic_auth(
                app.schema_registry_username.as_ref(),
                app.schema_registry_password.as_ref(),
            )
            .proxy(app.schema_registry_proxy.as_ref())
            .headers(&app.schema_registry_headers);

        assert_eq!(config.urls[0], app.schema_registry_url);
        assert!(config.authentication.is_some());
        assert_eq!(config.proxy.unwrap(), app.schema_registry_proxy.unwrap());
        assert_eq!(config.headers.unwrap(), app.schema_registry_headers);
    }

    #[test]
    fn ignore_basic_auth_if_username_is_missing() {
        let app = create!(MockEnvOptionalVars);

        let config = SchemaRegistryConfig::new()
            .url(&app.schema_registry_url)
            .basic_auth(
                app.schema_registry_username.as_ref(),
                app.schema_registry_password.as_ref(),
            );

        assert!(config.authentication.is_none());
    }

    #[test]
    fn parse_user_info_with_password() {
        let config = SchemaRegistryConfig::new().basic_auth_user_info("alice:s3cr3t");

        let auth = config.authentication.unwrap();
        assert_eq!(auth.username, "alice");
        assert_eq!(auth.password.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn parse_user_info_without_password() {
        let config = SchemaRegistryConfig::new().basic_auth_user_info("alice");

        let auth = config.authentication.unwrap();
        assert_eq!(auth.username, "alice");
        assert_eq!(auth.password, None);
    }
}
