//! Client side of `GET /health`, used by `stream-status --healthcheck`.

use std::net::SocketAddr;

use crate::config::{parse_port, Config};

/// Port the self-probe should dial.
///
/// An explicit, valid `STREAM_STATUS_PORT` value wins; otherwise the port of
/// the loaded config (8081 when no config file is used).
pub fn healthcheck_port(port_env: Option<&str>, config: &Config) -> u16 {
    port_env.and_then(parse_port).unwrap_or(config.server.port)
}

/// `true` when the server at `addr` answers `/health` with a 2xx.
pub async fn check_health(addr: SocketAddr) -> anyhow::Result<bool> {
    let url = format!("http://{addr}/health");
    let resp = reqwest::get(&url).await?;
    Ok(resp.status().is_success())
}

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, sync::Arc};

    use super::*;
    use crate::{config::ServerConfig, monitor::SharedFlag, server::StatusServer};

    #[tokio::test]
    async fn healthy_server_passes() {
        let config = ServerConfig {
            bind_address: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            ..ServerConfig::default()
        };
        let mut handle = StatusServer::bind(&config, Arc::new(SharedFlag::new(false)))
            .await
            .unwrap()
            .start();

        assert!(check_health(handle.local_addr()).await.unwrap());
        handle.stop().await;
    }

    #[test]
    fn healthcheck_port_prefers_env_then_config() {
        let mut config = Config::default();
        assert_eq!(healthcheck_port(None, &config), 8081);

        config.server.port = 9123;
        assert_eq!(healthcheck_port(None, &config), 9123);
        assert_eq!(healthcheck_port(Some("9200"), &config), 9200);
        assert_eq!(healthcheck_port(Some("not-a-port"), &config), 9123);
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        // Port 1 is reserved and never listens, so the connection is refused.
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        assert!(check_health(addr).await.is_err());
    }
}
