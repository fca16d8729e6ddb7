//! The plain/TLS socket union the transport is generic over.
//!
//! The teacher dispatches on a `Connection` enum of `TcpStream` vs. a
//! `native_tls`-backed stream inside `client::conn`; this keeps the same
//! shape but switches to `tokio-rustls`, since `rustls` is the modern
//! cross-platform default and needs no system TLS library.

use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use rand::seq::IteratorRandom;
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, TcpStream};

use crate::config::Server;
use crate::error::{Error, Result};

/// Either a bare TCP socket or one wrapped in a TLS session, unified behind
/// one `AsyncRead + AsyncWrite` type so [`crate::connection::transport::Transport`]
/// does not need to be generic over the connection's security mode.
#[pin_project(project = SocketProj)]
pub enum Socket {
    Plain(#[pin] TcpStream),
    #[cfg(feature = "tls")]
    Tls(#[pin] Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Socket {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match self.project() {
            SocketProj::Plain(s) => s.poll_read(cx, buf),
            #[cfg(feature = "tls")]
            SocketProj::Tls(s) => s.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Socket {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        match self.project() {
            SocketProj::Plain(s) => s.poll_write(cx, buf),
            #[cfg(feature = "tls")]
            SocketProj::Tls(s) => s.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.project() {
            SocketProj::Plain(s) => s.poll_flush(cx),
            #[cfg(feature = "tls")]
            SocketProj::Tls(s) => s.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.project() {
            SocketProj::Plain(s) => s.poll_shutdown(cx),
            #[cfg(feature = "tls")]
            SocketProj::Tls(s) => s.poll_shutdown(cx),
        }
    }
}

impl From<TcpStream> for Socket {
    fn from(stream: TcpStream) -> Socket {
        Socket::Plain(stream)
    }
}

#[cfg(feature = "tls")]
impl From<tokio_rustls::client::TlsStream<TcpStream>> for Socket {
    fn from(stream: tokio_rustls::client::TlsStream<TcpStream>) -> Socket {
        Socket::Tls(Box::new(stream))
    }
}

/// Resolves `server`'s address, picks a port out of its configured ranges
/// (spec.md §4.2: "`connect()`... resolves the server's address, picks a
/// port from the configured port set"), dials it, and upgrades to TLS when
/// the server calls for it. Mirrors the teacher's `Connection::new`, which
/// dials a plain `TcpStream` first and only then wraps it for SSL.
pub async fn connect(server: &Server) -> Result<Socket> {
    let port = pick_port(server);
    let addr = resolve(&server.address, port).await?;
    let tcp = TcpStream::connect(addr).await?;
    if server.tls {
        return connect_tls(server, tcp).await;
    }
    Ok(Socket::from(tcp))
}

/// Looks up `host:port`, returning the first address the resolver offers.
/// The teacher's `client::dns` module queues a background resolver thread;
/// this rides `tokio::net::lookup_host`, which already runs the blocking
/// getaddrinfo call on tokio's blocking pool.
async fn resolve(host: &str, port: u16) -> Result<std::net::SocketAddr> {
    let query = format!("{host}:{port}");
    let mut addrs = lookup_host(&query).await.map_err(|e| Error::Resolve(host.to_owned(), e))?;
    addrs
        .next()
        .ok_or_else(|| Error::Resolve(host.to_owned(), std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses returned")))
}

/// Picks one port at random from `server`'s configured ranges (spec.md §3:
/// "port set (list of inclusive ranges)"), so repeated reconnects don't
/// hammer the same port if a range lists several.
fn pick_port(server: &Server) -> u16 {
    let mut rng = rand::thread_rng();
    let ranges: Vec<_> = server.port_ranges().collect();
    match ranges.into_iter().choose(&mut rng) {
        Some(range) => rng.gen_range(range),
        None => 6667,
    }
}

#[cfg(feature = "tls")]
async fn connect_tls(server: &Server, tcp: TcpStream) -> Result<Socket> {
    let domain = <tokio_rustls::rustls::ServerName as std::convert::TryFrom<&str>>::try_from(server.address.as_str())
        .map_err(|_| Error::Tls(format!("not a valid DNS name: {}", server.address)))?;
    let stream = tls_connector().connect(domain, tcp).await.map_err(|e| Error::Tls(e.to_string()))?;
    Ok(Socket::from(stream))
}

#[cfg(not(feature = "tls"))]
async fn connect_tls(_server: &Server, _tcp: TcpStream) -> Result<Socket> {
    Err(Error::Tls("this build was compiled without the `tls` feature".into()))
}

/// Builds a `rustls`-backed connector trusting the Mozilla root set shipped
/// by `webpki-roots`, the same "bundle your own roots, no system store"
/// choice the teacher makes with `native_tls`'s optional root certificate.
#[cfg(feature = "tls")]
fn tls_connector() -> tokio_rustls::TlsConnector {
    let mut roots = tokio_rustls::rustls::RootCertStore::empty();
    roots.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|anchor| {
        tokio_rustls::rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));
    let config = tokio_rustls::rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();
    tokio_rustls::TlsConnector::from(std::sync::Arc::new(config))
}
