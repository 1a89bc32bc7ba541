//! Test helpers
//!
//! Spawns a real gateway on an ephemeral port and provides a WebSocket
//! client for driving the envelope protocol.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use classline_common::config::{
    AppConfig, AppSettings, Environment, JwtConfig, PresenceConfig, ServerConfig, SnowflakeConfig,
};
use classline_core::entities::UserRole;
use classline_gateway::protocol::{ClientEvent, ServerEvent};
use classline_gateway::{build_state, create_app, spawn_typing_sweeper, GatewayState};
use classline_service::{AuthService, AuthSession, RegisterRequest};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a single expected event may take to arrive
const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Gateway instance under test
pub struct TestServer {
    pub addr: SocketAddr,
    state: GatewayState,
    _server: JoinHandle<()>,
    _sweeper: JoinHandle<()>,
}

impl TestServer {
    /// Start a gateway with default timings
    pub async fn start() -> Result<Self> {
        Self::start_with_typing_ttl(5_000).await
    }

    /// Start a gateway with a custom typing expiry window
    pub async fn start_with_typing_ttl(typing_timeout_ms: u64) -> Result<Self> {
        let config = test_config(typing_timeout_ms);
        let state = build_state(config)?;

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let app = create_app(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        let sweeper = spawn_typing_sweeper(state.clone());

        Ok(Self {
            addr,
            state,
            _server: server,
            _sweeper: sweeper,
        })
    }

    /// Register a user directly against the server's service layer
    pub async fn register(&self, email: &str, role: UserRole) -> Result<AuthSession> {
        let display_name = email
            .split('@')
            .next()
            .unwrap_or("user")
            .replace('.', " ");

        AuthService::new(self.state.context())
            .register(RegisterRequest {
                email: email.to_string(),
                display_name,
                password: "TestPass1".to_string(),
                role,
            })
            .await
            .map_err(|e| anyhow::anyhow!("registration failed: {e}"))
    }

    /// Open a WebSocket to this server and consume the `hello` frame
    pub async fn connect(&self) -> Result<GatewayClient> {
        GatewayClient::connect(self.addr).await
    }
}

fn test_config(typing_timeout_ms: u64) -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "classline-test".to_string(),
            env: Environment::Development,
        },
        gateway: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret-key".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604_800,
        },
        presence: PresenceConfig {
            heartbeat_interval_ms: 45_000,
            heartbeat_timeout_ms: 90_000,
            typing_timeout_ms,
        },
        snowflake: SnowflakeConfig { worker_id: 1 },
    }
}

/// WebSocket client speaking the envelope protocol
pub struct GatewayClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl GatewayClient {
    /// Connect and consume the initial `hello`
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let (stream, _) = connect_async(format!("ws://{addr}/ws")).await?;
        let mut client = Self { stream };

        match client.recv().await? {
            ServerEvent::Hello { .. } => Ok(client),
            other => bail!("expected hello, got {other:?}"),
        }
    }

    /// Send one client event
    pub async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        self.stream.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Send a raw text frame (for malformed-envelope tests)
    pub async fn send_raw(&mut self, raw: &str) -> Result<()> {
        self.stream.send(Message::Text(raw.to_string())).await?;
        Ok(())
    }

    /// Receive the next server event
    pub async fn recv(&mut self) -> Result<ServerEvent> {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for a server event")?;

            match frame {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text)
                        .with_context(|| format!("unparseable server event: {text}"));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => bail!("connection closed: {frame:?}"),
                Some(Ok(other)) => bail!("unexpected frame: {other:?}"),
                Some(Err(e)) => bail!("websocket error: {e}"),
                None => bail!("connection ended"),
            }
        }
    }

    /// Receive events until one matches, discarding the rest
    pub async fn recv_until<F>(&mut self, mut pred: F) -> Result<ServerEvent>
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        for _ in 0..32 {
            let event = self.recv().await?;
            if pred(&event) {
                return Ok(event);
            }
        }
        bail!("no matching event within 32 frames")
    }

    /// Authenticate and return the `ready` snapshot
    pub async fn authenticate(&mut self, token: &str) -> Result<ServerEvent> {
        self.send(&ClientEvent::Authenticate {
            token: token.to_string(),
        })
        .await?;

        self.recv_until(|e| matches!(e, ServerEvent::Ready { .. }))
            .await
    }

    /// Wait for the server to close the connection; returns the close code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for close")?;

            match frame {
                Some(Ok(Message::Close(frame))) => {
                    return Ok(frame.map(|f| u16::from(f.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(None),
            }
        }
    }

    /// Close the socket from the client side
    pub async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
