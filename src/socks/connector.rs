//! SOCKS5 client handshake
//!
//! Drives the codec over a stream that is already connected to the proxy.
//! On success the stream is a transparent tunnel to the target; on any
//! failure the stream is shut down before the error is returned.

use super::codec;
use super::types::{AuthMethod, Credential, TargetAddr};
use crate::error::{Phase, SocksError};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// State of one in-flight handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeSession {
    /// Method picked by the proxy, once known
    pub selected_method: Option<AuthMethod>,
    /// Current phase
    pub phase: Phase,
}

impl HandshakeSession {
    fn new() -> Self {
        HandshakeSession {
            selected_method: None,
            phase: Phase::Greeting,
        }
    }
}

/// SOCKS5 CONNECT client
#[derive(Debug, Clone, Default)]
pub struct SocksConnector {
    credential: Option<Credential>,
    read_timeout: Option<Duration>,
}

impl SocksConnector {
    /// Create a connector, optionally with username/password credentials
    pub fn new(credential: Option<Credential>) -> Self {
        SocksConnector {
            credential,
            read_timeout: None,
        }
    }

    /// Bound every request/reply exchange of the handshake by `timeout`
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Configured credential
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Configured per-exchange timeout
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Run the handshake and return the address the proxy bound
    ///
    /// The stream is borrowed only for the duration of the call. It stays
    /// open on success and is shut down on every error path.
    pub async fn handshake<S>(
        &self,
        stream: &mut S,
        target: &TargetAddr,
    ) -> Result<TargetAddr, SocksError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut session = HandshakeSession::new();

        match self.run(stream, target, &mut session).await {
            Ok(bound) => {
                session.phase = Phase::Established;
                debug!(
                    "SOCKS5 tunnel to {} established (auth: {:?}, bound: {})",
                    target, session.selected_method, bound
                );
                Ok(bound)
            }
            Err(e) => {
                debug!(
                    "SOCKS5 handshake to {} failed while {}: {}",
                    target, session.phase, e
                );
                session.phase = Phase::Failed;
                let _ = stream.shutdown().await;
                Err(e)
            }
        }
    }

    async fn run<S>(
        &self,
        stream: &mut S,
        target: &TargetAddr,
        session: &mut HandshakeSession,
    ) -> Result<TargetAddr, SocksError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Reject an unencodable target before anything hits the wire.
        let request = codec::encode_connect_request(target)?;

        let offered = codec::offered_methods(self.credential.as_ref());
        let greeting = codec::encode_greeting(&offered);
        let reply = self
            .exchange(Phase::Greeting, async {
                stream.write_all(&greeting).await?;
                stream.flush().await?;
                let mut reply = [0u8; 2];
                stream.read_exact(&mut reply).await?;
                Ok::<_, SocksError>(reply)
            })
            .await?;
        let method = codec::decode_greeting_reply(reply, &offered)?;
        session.selected_method = Some(method);

        if method == AuthMethod::Password {
            session.phase = Phase::Authenticating;
            let credential = self
                .credential
                .as_ref()
                .ok_or(SocksError::NoAcceptableAuthMethod(method.to_byte()))?;
            let auth = codec::encode_auth_request(credential);
            let reply = self
                .exchange(Phase::Authenticating, async {
                    stream.write_all(&auth).await?;
                    stream.flush().await?;
                    let mut reply = [0u8; 2];
                    stream.read_exact(&mut reply).await?;
                    Ok::<_, SocksError>(reply)
                })
                .await?;
            codec::decode_auth_reply(reply)?;
        }

        session.phase = Phase::Connecting;
        let reply = self
            .exchange(Phase::Connecting, async {
                stream.write_all(&request).await?;
                stream.flush().await?;
                codec::read_connect_reply(&mut *stream).await
            })
            .await?;

        if !reply.code.is_success() {
            return Err(SocksError::Connect(reply.code));
        }

        Ok(reply.bound)
    }

    async fn exchange<T, F>(&self, phase: Phase, fut: F) -> Result<T, SocksError>
    where
        F: Future<Output = Result<T, SocksError>>,
    {
        match self.read_timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| SocksError::Timeout { phase, after })?,
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplyCode;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use tokio::io::{duplex, DuplexStream};
    use tokio::task::JoinHandle;
    use tokio_test::io::Builder;

    fn onion_target() -> TargetAddr {
        TargetAddr::domain("example7onion.onion", 80)
    }

    fn onion_request() -> Vec<u8> {
        let mut request = vec![0x05, 0x01, 0x00, 0x03, 0x13];
        request.extend_from_slice(b"example7onion.onion");
        request.extend_from_slice(&[0x00, 0x50]);
        request
    }

    /// Proxy side that sends `script` up front and records what the client
    /// writes until the client closes its side.
    fn scripted_proxy(script: Vec<u8>, hang_up: bool) -> (DuplexStream, JoinHandle<Vec<u8>>) {
        let (client, server) = duplex(4096);
        let task = tokio::spawn(async move {
            let (mut rd, mut wr) = tokio::io::split(server);
            wr.write_all(&script).await.unwrap();
            if hang_up {
                wr.shutdown().await.unwrap();
            }
            let mut received = Vec::new();
            rd.read_to_end(&mut received).await.unwrap();
            received
        });
        (client, task)
    }

    async fn assert_closed(task: JoinHandle<Vec<u8>>) -> Vec<u8> {
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("proxy side never saw the stream close")
            .unwrap()
    }

    #[tokio::test]
    async fn test_handshake_no_auth_domain() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x01, 0x00])
            .read(&[0x05, 0x00])
            .write(&onion_request())
            .read(&[0x05, 0x00, 0x00, 0x01, 127, 0, 0, 1, 0x23, 0x82])
            .build();

        let bound = SocksConnector::new(None)
            .handshake(&mut stream, &onion_target())
            .await
            .unwrap();
        assert_eq!(bound, TargetAddr::ipv4(Ipv4Addr::LOCALHOST, 9090));
    }

    #[tokio::test]
    async fn test_handshake_with_password() {
        let mut bound_reply = vec![0x05, 0x00, 0x00, 0x04];
        bound_reply.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        bound_reply.extend_from_slice(&[0x00, 0x01]);

        let mut stream = Builder::new()
            .write(&[0x05, 0x02, 0x00, 0x02])
            .read(&[0x05, 0x02])
            .write(&[0x01, 0x03, b'a', b'b', b'c', 0x03, b'd', b'e', b'f'])
            .read(&[0x01, 0x00])
            .write(&onion_request())
            .read(&bound_reply)
            .build();

        let connector = SocksConnector::new(Some(Credential::new("abc", "def").unwrap()));
        let bound = connector
            .handshake(&mut stream, &onion_target())
            .await
            .unwrap();
        assert_eq!(bound, TargetAddr::ipv6(Ipv6Addr::LOCALHOST, 1));
    }

    #[tokio::test]
    async fn test_handshake_with_password_proxy_skips_auth() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x02, 0x00, 0x02])
            .read(&[0x05, 0x00])
            .write(&onion_request())
            .read(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
            .build();

        let connector = SocksConnector::new(Some(Credential::new("abc", "def").unwrap()));
        assert!(connector
            .handshake(&mut stream, &onion_target())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_handshake_leaves_payload_unread() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x01, 0x00])
            .read(&[0x05, 0x00])
            .write(&onion_request())
            .read(&[0x05, 0x00, 0x00, 0x01, 10, 1, 2, 3, 0x00, 0x50, b'h', b'i'])
            .build();

        SocksConnector::new(None)
            .handshake(&mut stream, &onion_target())
            .await
            .unwrap();

        let mut payload = [0u8; 2];
        stream.read_exact(&mut payload).await.unwrap();
        assert_eq!(&payload, b"hi");
    }

    #[tokio::test]
    async fn test_handshake_wrong_greeting_version_closes() {
        let (mut client, proxy) = scripted_proxy(vec![0x04, 0x00], true);

        let err = SocksConnector::new(None)
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::ProtocolMismatch { actual: 4, .. }));

        let received = assert_closed(proxy).await;
        assert_eq!(received, vec![0x05, 0x01, 0x00]);
    }

    #[tokio::test]
    async fn test_handshake_no_acceptable_method_closes() {
        let (mut client, proxy) = scripted_proxy(vec![0x05, 0xFF], true);

        let err = SocksConnector::new(None)
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::NoAcceptableAuthMethod(0xFF)));
        assert_closed(proxy).await;
    }

    #[tokio::test]
    async fn test_handshake_unoffered_method_closes() {
        let (mut client, proxy) = scripted_proxy(vec![0x05, 0x02], true);

        let err = SocksConnector::new(None)
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::NoAcceptableAuthMethod(0x02)));
        assert_closed(proxy).await;
    }

    #[tokio::test]
    async fn test_handshake_auth_wrong_version_closes() {
        let (mut client, proxy) = scripted_proxy(vec![0x05, 0x02, 0x05, 0x00], true);

        let connector = SocksConnector::new(Some(Credential::new("u", "p").unwrap()));
        let err = connector
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SocksError::AuthenticationRejected {
                version: 5,
                status: 0
            }
        ));
        assert_closed(proxy).await;
    }

    #[tokio::test]
    async fn test_handshake_auth_rejected_closes() {
        let (mut client, proxy) = scripted_proxy(vec![0x05, 0x02, 0x01, 0x01], true);

        let connector = SocksConnector::new(Some(Credential::new("u", "p").unwrap()));
        let err = connector
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SocksError::AuthenticationRejected {
                version: 1,
                status: 1
            }
        ));

        let received = assert_closed(proxy).await;
        assert_eq!(
            received,
            vec![0x05, 0x02, 0x00, 0x02, 0x01, 0x01, b'u', 0x01, b'p']
        );
    }

    #[tokio::test]
    async fn test_handshake_every_failure_code_closes() {
        let codes = [
            (0x01, ReplyCode::GeneralFailure),
            (0x02, ReplyCode::NotAllowed),
            (0x03, ReplyCode::NetworkUnreachable),
            (0x04, ReplyCode::HostUnreachable),
            (0x05, ReplyCode::ConnectionRefused),
            (0x06, ReplyCode::TtlExpired),
            (0x07, ReplyCode::CommandNotSupported),
            (0x08, ReplyCode::AddressTypeNotSupported),
            (0x09, ReplyCode::Unknown(0x09)),
        ];

        for (byte, expected) in codes {
            let script = vec![0x05, 0x00, 0x05, byte, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
            let (mut client, proxy) = scripted_proxy(script, true);

            let err = SocksConnector::new(None)
                .handshake(&mut client, &onion_target())
                .await
                .unwrap_err();
            match err {
                SocksError::Connect(code) => assert_eq!(code, expected),
                other => panic!("unexpected error for {:#04x}: {}", byte, other),
            }

            let received = assert_closed(proxy).await;
            let mut sent = vec![0x05, 0x01, 0x00];
            sent.extend_from_slice(&onion_request());
            assert_eq!(received, sent);
        }
    }

    #[tokio::test]
    async fn test_handshake_truncated_input_closes() {
        let scripts: Vec<Vec<u8>> = vec![
            vec![],
            vec![0x05],
            vec![0x05, 0x00],
            vec![0x05, 0x00, 0x05, 0x00],
            vec![0x05, 0x00, 0x05, 0x00, 0x00, 0x01, 10, 0],
            vec![0x05, 0x00, 0x05, 0x00, 0x00, 0x03, 9, b'a', b'b'],
            vec![0x05, 0x00, 0x05, 0x00, 0x00, 0x04, 0, 0, 0, 0, 0, 0, 0, 0],
        ];

        for script in scripts {
            let (mut client, proxy) = scripted_proxy(script.clone(), true);

            let err = SocksConnector::new(None)
                .handshake(&mut client, &onion_target())
                .await
                .unwrap_err();
            assert!(
                matches!(err, SocksError::ProtocolDesync(_)),
                "script {:?} gave {}",
                script,
                err
            );
            assert_closed(proxy).await;
        }
    }

    #[tokio::test]
    async fn test_handshake_truncated_auth_closes() {
        let (mut client, proxy) = scripted_proxy(vec![0x05, 0x02, 0x01], true);

        let connector = SocksConnector::new(Some(Credential::new("u", "p").unwrap()));
        let err = connector
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::ProtocolDesync(_)));
        assert_closed(proxy).await;
    }

    #[tokio::test]
    async fn test_handshake_read_timeout() {
        let (mut client, proxy) = scripted_proxy(vec![], false);

        let connector = SocksConnector::new(None).with_read_timeout(Duration::from_millis(50));
        let err = connector
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SocksError::Timeout {
                phase: Phase::Greeting,
                ..
            }
        ));
        assert_closed(proxy).await;
    }

    #[tokio::test]
    async fn test_handshake_timeout_in_connect_phase() {
        let (mut client, proxy) = scripted_proxy(vec![0x05, 0x00], false);

        let connector = SocksConnector::new(None).with_read_timeout(Duration::from_millis(50));
        let err = connector
            .handshake(&mut client, &onion_target())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SocksError::Timeout {
                phase: Phase::Connecting,
                ..
            }
        ));
        assert_closed(proxy).await;
    }

    #[tokio::test]
    async fn test_handshake_invalid_target_sends_nothing() {
        let (mut client, proxy) = scripted_proxy(vec![], true);

        let target = TargetAddr::domain("a".repeat(256), 80);
        let err = SocksConnector::new(None)
            .handshake(&mut client, &target)
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::InvalidTarget(_)));

        let received = assert_closed(proxy).await;
        assert!(received.is_empty());
    }
}
