//! TCP listener accepting line-based client connections

use crate::context::{wait_until, ServerContext};
use crate::error::Result;
use crate::session::spawn_session;
use log::{error, info};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// Accepts connections and hands each one to a new session.
pub struct Server {
    listener: TcpListener,
    ctx: ServerContext,
}

impl Server {
    /// Binds to the address from the context's configuration.
    pub async fn bind(ctx: ServerContext) -> Result<Self> {
        let listener = TcpListener::bind(&ctx.config().address).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener, ctx })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Accept loop. Returns once the server is shutting down.
    pub async fn run(self) -> Result<()> {
        let mut shutdown = self.ctx.shutdown_signal();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            error!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let (reader, writer) = stream.into_split();
                        let session = spawn_session(self.ctx.clone(), reader, writer).await;
                        info!("Accepted {} as client {}", addr, session.id());
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                _ = wait_until(&mut shutdown, true) => break,
            }
        }

        info!("Listener stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use shared::NAME_PROMPT;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpStream;

    fn local_config() -> ServerConfig {
        ServerConfig {
            address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_accepted_client_gets_name_prompt() {
        let ctx = ServerContext::new(local_config());
        let server = Server::bind(ctx.clone()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let listener = tokio::spawn(server.run());

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some(NAME_PROMPT));

        ctx.shutdown().await;
        assert!(listener.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let ctx = ServerContext::new(local_config());
        let first = Server::bind(ctx.clone()).await.unwrap();
        let taken = first.local_addr().unwrap();

        let clash = ServerContext::new(ServerConfig {
            address: taken.to_string(),
            ..ServerConfig::default()
        });
        assert!(Server::bind(clash).await.is_err());
    }
}
