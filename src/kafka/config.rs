use anyhow::Result;
use intake_config::KafkaConfig;
use rdkafka::config::ClientConfig;
use tracing::info;

/// Builds the `rdkafka` client configuration from `KafkaConfig`.
///
/// Handles bootstrap servers, SSL/TLS and SASL. A disabled config only gets
/// bootstrap servers; the client is never used to send.
pub fn create_client_config(config: &KafkaConfig) -> Result<ClientConfig> {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", &config.brokers);

    if !config.enabled {
        return Ok(client_config);
    }

    client_config.set("security.protocol", "plaintext");

    if config.ssl_enabled {
        info!("Enabling SSL/TLS for Kafka connection");
        client_config.set("security.protocol", "ssl");
    }

    if let (Some(mechanism), Some(username), Some(password)) = (
        &config.sasl_mechanism,
        &config.sasl_username,
        &config.sasl_password,
    ) {
        info!(sasl_mechanism = %mechanism, "Configuring SASL authentication");
        client_config
            .set("sasl.mechanism", mechanism)
            .set("sasl.username", username)
            .set("sasl.password", password);

        let protocol = if config.ssl_enabled {
            "sasl_ssl"
        } else {
            "sasl_plaintext"
        };
        client_config.set("security.protocol", protocol);
    }

    Ok(client_config)
}
