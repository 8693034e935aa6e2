//! Test utilities for socks-peer
//!
//! A scripted SOCKS5 proxy on a loopback listener, used by the integration
//! tests to observe exactly what the client puts on the wire.

#![allow(dead_code)]

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the fake proxy saw from one client
#[derive(Debug, Default)]
pub struct ProxySession {
    /// Raw greeting bytes
    pub greeting: Vec<u8>,
    /// Raw auth request bytes, when the client authenticated
    pub auth: Option<Vec<u8>>,
    /// Raw CONNECT request bytes
    pub request: Vec<u8>,
    /// Payload received after the tunnel came up
    pub payload: Vec<u8>,
    /// The client closed its side
    pub saw_eof: bool,
}

/// How the fake proxy answers
#[derive(Debug, Clone)]
pub struct ProxyScript {
    /// Reply to the greeting
    pub method_reply: Vec<u8>,
    /// Reply to the auth request
    pub auth_reply: Vec<u8>,
    /// Reply to the CONNECT request
    pub connect_reply: Vec<u8>,
}

impl Default for ProxyScript {
    fn default() -> Self {
        ProxyScript {
            method_reply: vec![0x05, 0x00],
            auth_reply: vec![0x01, 0x00],
            connect_reply: vec![0x05, 0x00, 0x00, 0x01, 127, 0, 0, 1, 0x1F, 0x90],
        }
    }
}

impl ProxyScript {
    /// Answer CONNECT with `code`
    pub fn with_reply_code(mut self, code: u8) -> Self {
        self.connect_reply[1] = code;
        self
    }

    /// Select username/password authentication
    pub fn with_password_auth(mut self) -> Self {
        self.method_reply = vec![0x05, 0x02];
        self
    }
}

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a proxy that serves one client with `script`
///
/// After a successful CONNECT it echoes everything back until EOF.
pub async fn spawn_proxy(script: ProxyScript) -> (SocketAddr, JoinHandle<ProxySession>) {
    let (listener, addr) = create_test_listener().await;
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, script).await
    });
    (addr, handle)
}

/// Start a proxy that accepts and never answers
pub async fn spawn_silent_proxy() -> (SocketAddr, JoinHandle<ProxySession>) {
    let (listener, addr) = create_test_listener().await;
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut session = ProxySession::default();
        let mut buf = [0u8; 256];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => session.greeting.extend_from_slice(&buf[..n]),
            }
        }
        session.saw_eof = true;
        session
    });
    (addr, handle)
}

async fn serve(mut stream: TcpStream, script: ProxyScript) -> ProxySession {
    let mut session = ProxySession::default();

    let mut head = [0u8; 2];
    stream.read_exact(&mut head).await.unwrap();
    let mut methods = vec![0u8; head[1] as usize];
    stream.read_exact(&mut methods).await.unwrap();
    session.greeting = [head.to_vec(), methods].concat();
    stream.write_all(&script.method_reply).await.unwrap();

    if script.method_reply.get(1) == Some(&0x02) {
        let mut auth = vec![0u8; 2];
        stream.read_exact(&mut auth).await.unwrap();
        let mut uname = vec![0u8; auth[1] as usize];
        stream.read_exact(&mut uname).await.unwrap();
        let mut plen = [0u8; 1];
        stream.read_exact(&mut plen).await.unwrap();
        let mut passwd = vec![0u8; plen[0] as usize];
        stream.read_exact(&mut passwd).await.unwrap();
        auth.extend_from_slice(&uname);
        auth.extend_from_slice(&plen);
        auth.extend_from_slice(&passwd);
        session.auth = Some(auth);
        stream.write_all(&script.auth_reply).await.unwrap();

        if script.auth_reply.get(1) != Some(&0x00) {
            drain(&mut stream, &mut session).await;
            return session;
        }
    }

    let mut request = vec![0u8; 4];
    stream.read_exact(&mut request).await.unwrap();
    let addr_len = match request[3] {
        0x01 => 4,
        0x04 => 16,
        0x03 => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await.unwrap();
            request.push(len[0]);
            len[0] as usize
        }
        other => panic!("unexpected ATYP {:#04x}", other),
    };
    let mut rest = vec![0u8; addr_len + 2];
    stream.read_exact(&mut rest).await.unwrap();
    request.extend_from_slice(&rest);
    session.request = request;
    stream.write_all(&script.connect_reply).await.unwrap();

    if script.connect_reply.get(1) == Some(&0x00) {
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    session.payload.extend_from_slice(&buf[..n]);
                    if stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
        session.saw_eof = true;
    } else {
        drain(&mut stream, &mut session).await;
    }
    session
}

/// Read until the client closes, keeping whatever it still sends
async fn drain(stream: &mut TcpStream, session: &mut ProxySession) {
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => session.payload.extend_from_slice(&buf[..n]),
        }
    }
    session.saw_eof = true;
}
