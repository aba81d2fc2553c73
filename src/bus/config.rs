use crate::error::BusError;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SaslMechanism {
    Plain,
    ScramSha256,
    ScramSha512,
}

impl SaslMechanism {
    fn as_rdkafka_str(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaslConfig {
    pub mechanism: SaslMechanism,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub skip_verify: bool,
}

/// Configuration for the `_schemas` change-log consumer.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    pub from_beginning: bool,
    pub sasl: Option<SaslConfig>,
    pub tls: TlsConfig,
    /// Upper bound on a single poll, so the consumer loop can observe
    /// cancellation promptly even with no traffic on the topic.
    pub poll_timeout: std::time::Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            brokers: Vec::new(),
            topic: "_schemas".to_string(),
            group_id: "srctl-replicator".to_string(),
            from_beginning: true,
            sasl: None,
            tls: TlsConfig::default(),
            poll_timeout: std::time::Duration::from_millis(500),
        }
    }
}

impl BusConfig {
    pub fn new(brokers: Vec<String>) -> Self {
        Self {
            brokers,
            ..Self::default()
        }
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn from_beginning(mut self, from_beginning: bool) -> Self {
        self.from_beginning = from_beginning;
        self
    }

    pub fn sasl(mut self, sasl: SaslConfig) -> Self {
        self.sasl = Some(sasl);
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub(crate) fn build(&self) -> Result<rdkafka::ClientConfig, BusError> {
        if self.brokers.is_empty() {
            return Err(BusError::Configuration {
                message: "at least one broker is required".to_string(),
            });
        }

        let mut config = rdkafka::ClientConfig::new();
        let brokers = self.brokers.join(",");

        // `from_beginning` governs initial-sync behavior, not the consumer's
        // fallback when no committed offset exists: with no committed offset
        // the earliest currently-available record is always where a
        // replicator must start, or it silently skips history.
        config
            .set("bootstrap.servers", &brokers)
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .set("enable.partition.eof", "false");

        let mut security_protocol = "plaintext";

        if self.tls.enabled {
            security_protocol = "ssl";
            if self.tls.skip_verify {
                config.set("enable.ssl.certificate.verification", "false");
            }
        }

        if let Some(sasl) = &self.sasl {
            security_protocol = if self.tls.enabled {
                "sasl_ssl"
            } else {
                "sasl_plaintext"
            };

            config
                .set("sasl.mechanism", sasl.mechanism.as_rdkafka_str())
                .set("sasl.username", &sasl.user)
                .set("sasl.password", &sasl.password);
        }

        config.set("security.protocol", security_protocol);

        Ok(config)
    }
}
