//! TCP (+ TLS) line transport to the venue

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use rustls::ClientConfig;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::error::TransportError;
use crate::transport::{Channel, LineReader, LineWriter, TransportConfig};

/// Open a connection as configured and split it into a [`Channel`]
pub async fn connect(config: &TransportConfig) -> Result<Channel, TransportError> {
    let address = config.address();
    debug!("Connecting to {}", address);

    let tcp = timeout(config.connect_timeout(), TcpStream::connect(&address))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::Connection(format!("{}: {}", address, e)))?;
    if let Err(e) = tcp.set_nodelay(true) {
        warn!("Failed to enable TCP_NODELAY: {e:?}");
    }

    if !config.tls {
        info!("Connected to {} (plain)", address);
        return Ok(from_stream(tcp, config));
    }

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(tls_config));
    let domain = rustls::pki_types::ServerName::try_from(config.host.clone())
        .map_err(|e| TransportError::Tls(format!("Invalid DNS name: {e}")))?;

    let stream = timeout(config.connect_timeout(), connector.connect(domain, tcp))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::Tls(e.to_string()))?;

    info!("Connected to {} (tls)", address);
    Ok(from_stream(stream, config))
}

/// Wrap any byte stream as a line channel
pub fn from_stream<S>(stream: S, config: &TransportConfig) -> Channel
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read, write) = tokio::io::split(stream);
    Channel::new(
        Box::new(StreamReader {
            inner: BufReader::with_capacity(config.receive_buffer_bytes, read),
            timeout: config.receive_timeout(),
            buf: String::new(),
        }),
        Box::new(StreamWriter {
            inner: write,
            timeout: config.send_timeout(),
        }),
    )
}

struct StreamReader<S> {
    inner: BufReader<ReadHalf<S>>,
    timeout: Duration,
    buf: String,
}

#[async_trait]
impl<S> LineReader for StreamReader<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        self.buf.clear();
        let read = timeout(self.timeout, self.inner.read_line(&mut self.buf))
            .await
            .map_err(|_| TransportError::Timeout)??;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf.trim_end_matches(['\r', '\n']).to_string()))
    }
}

struct StreamWriter<S> {
    inner: WriteHalf<S>,
    timeout: Duration,
}

impl<S> StreamWriter<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.write_all(b"\r\n").await?;
        self.inner.flush().await
    }
}

#[async_trait]
impl<S> LineWriter for StreamWriter<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let limit = self.timeout;
        timeout(limit, self.send_line(line))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
