use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::http::RouteError;
use common::prelude::FutureTimeout;
use hyper::server::conn::Http;
use hyper::Body;
use routerify::{RequestServiceBuilder, Router};
use tokio::net::TcpSocket;
use tokio::select;

use crate::global::GlobalState;

mod error;
mod ext;
mod guards;
mod jwt;
mod middleware;
mod request_context;
pub mod v1;

pub use error::ApiError;

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    let weak = Arc::downgrade(global);
    Router::builder()
        .data(weak)
        .err_handler_with_info(common::http::error_handler::<ApiError>)
        // The CORS middleware adds the CORS headers to the response
        .middleware(middleware::cors::cors_middleware(global))
        // The auth middleware checks the Authorization header, and if it's
        // valid, attaches the resolved identity to the request context. It
        // does not fail requests without a token; the route guards do.
        .middleware(middleware::auth::auth_middleware(global))
        .scope("/v1", v1::routes(global))
        .build()
        .expect("failed to build router")
}

pub async fn run(global: Arc<GlobalState>) -> anyhow::Result<()> {
    let config = global.config.api.clone();

    tracing::info!("listening on {}", config.bind_address);
    let socket = if config.bind_address.is_ipv6() {
        TcpSocket::new_v6()?
    } else {
        TcpSocket::new_v4()?
    };

    socket.set_reuseaddr(true)?;
    socket.bind(config.bind_address)?;
    let listener = socket.listen(1024)?;

    let tls_acceptor = if let Some(tls) = &config.tls {
        tracing::info!("TLS enabled");
        let cert = tokio::fs::read(&tls.cert)
            .await
            .context("failed to read api ssl cert")?;
        let key = tokio::fs::read(&tls.key)
            .await
            .context("failed to read api ssl private key")?;

        let key = rustls::PrivateKey(
            rustls_pemfile::pkcs8_private_keys(&mut io::BufReader::new(io::Cursor::new(key)))?
                .remove(0),
        );

        let certs = rustls_pemfile::certs(&mut io::BufReader::new(io::Cursor::new(cert)))?
            .into_iter()
            .map(rustls::Certificate)
            .collect();

        Some(Arc::new(tokio_rustls::TlsAcceptor::from(Arc::new(
            rustls::ServerConfig::builder()
                .with_safe_defaults()
                .with_no_client_auth()
                .with_single_cert(certs, key)?,
        ))))
    } else {
        None
    };

    // The router holds a Weak reference to the global state so open
    // keep-alive connections cannot keep the state alive past shutdown.
    let request_service =
        RequestServiceBuilder::new(routes(&global)).expect("failed to build request service");

    loop {
        select! {
            _ = global.shutdown.cancelled() => {
                return Ok(());
            },
            r = listener.accept() => {
                let (socket, addr) = r?;

                let tls_acceptor = tls_acceptor.clone();
                let service = request_service.build(addr);

                tracing::debug!("accepted connection from {}", addr);

                tokio::spawn(async move {
                    if let Some(tls_acceptor) = tls_acceptor {
                        let Ok(Ok(socket)) = tls_acceptor.accept(socket).timeout(Duration::from_secs(5)).await else {
                            return;
                        };
                        tracing::debug!("TLS handshake complete");
                        Http::new().serve_connection(
                            socket,
                            service,
                        ).await.ok();
                    } else {
                        Http::new().serve_connection(
                            socket,
                            service,
                        ).await.ok();
                    }
                });
            },
        }
    }
}
