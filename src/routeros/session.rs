//! Dialing and authenticating a device session.

use crate::config::{join_host_port, Device};
use crate::error::{ExporterError, Result};
use crate::routeros::client::Client;
use crate::routeros::proto::Reply;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Any byte stream a session can run over.
pub trait ApiStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ApiStream for T {}

/// An authenticated connection to one device, valid for one scrape.
pub struct Session {
    client: Client<Box<dyn ApiStream>>,
    timeout: Duration,
}

impl Session {
    /// Wrap an already authenticated client; every command is bounded by
    /// `timeout`.
    pub fn new(client: Client<Box<dyn ApiStream>>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Run one API command on the device.
    pub async fn run<W: AsRef<str>>(&mut self, words: &[W]) -> Result<Reply> {
        timeout(self.timeout, self.client.run(words))
            .await
            .map_err(|_| {
                ExporterError::protocol_error(format!(
                    "{}: no reply within {:?}",
                    words.first().map(AsRef::as_ref).unwrap_or(""),
                    self.timeout
                ))
            })?
    }

    /// Release the connection.
    pub async fn close(self) -> Result<()> {
        self.client.close().await
    }
}

/// Transport settings shared by every dial of a scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Bound on dial and TLS handshake
    pub timeout: Duration,
    /// Use the TLS API service
    pub use_tls: bool,
    /// Accept any server certificate
    pub insecure_tls: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: crate::DEFAULT_TIMEOUT,
            use_tls: false,
            insecure_tls: false,
        }
    }
}

/// Opens sessions to devices.
#[derive(Clone)]
pub struct Connector {
    options: TransportOptions,
    tls: Option<TlsConnector>,
}

impl Connector {
    /// Build a connector; the TLS client config is prepared once up front.
    pub fn new(options: TransportOptions) -> Result<Self> {
        let tls = if options.use_tls {
            Some(TlsConnector::from(Arc::new(tls_config(options.insecure_tls)?)))
        } else {
            None
        };
        Ok(Self { options, tls })
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Dial the device and log in.
    ///
    /// Dial and TLS handshake are bounded by the configured timeout and fail
    /// with [`ExporterError::Connect`]. A refused or unanswered login fails
    /// with [`ExporterError::Auth`]; the login exchange gets its own timeout.
    pub async fn connect(&self, device: &Device) -> Result<Session> {
        let port = device.port_or_default(self.options.use_tls);
        let address = join_host_port(&device.address, port);

        debug!(device = %device.name, %address, "trying to dial");
        let dial = TcpStream::connect((device.address.as_str(), port));
        let tcp = timeout(self.options.timeout, dial)
            .await
            .map_err(|_| ExporterError::connect_error(&address, "dial timed out"))?
            .map_err(|e| ExporterError::connect_error(&address, e))?;
        // Commands are tiny request/reply pairs; don't wait to coalesce them.
        let _ = tcp.set_nodelay(true);

        let stream: Box<dyn ApiStream> = match &self.tls {
            None => Box::new(tcp),
            Some(connector) => {
                let server_name = ServerName::try_from(device.address.clone())
                    .map_err(|e| ExporterError::connect_error(&address, e))?;
                let tls = timeout(self.options.timeout, connector.connect(server_name, tcp))
                    .await
                    .map_err(|_| ExporterError::connect_error(&address, "TLS handshake timed out"))?
                    .map_err(|e| ExporterError::connect_error(&address, e))?;
                Box::new(tls)
            }
        };
        debug!(device = %device.name, "done dialing");

        let mut client = Client::new(stream);
        timeout(self.options.timeout, client.login(&device.user, &device.password))
            .await
            .map_err(|_| ExporterError::auth_error(format!("/login to {} timed out", address)))??;
        debug!(device = %device.name, "done with login");

        Ok(Session::new(client, self.options.timeout))
    }
}

fn tls_config(insecure: bool) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| ExporterError::config_error(format!("TLS setup failed: {}", e)))?;

    let config = if insecure {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    Ok(config)
}

/// Certificate verifier for `--insecure`: skips chain and name checks but
/// still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
