use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use turbine_api::TurbineError;

use crate::protocol::{Reply, Request};

/// Upper bound on one frame body.
pub const MAX_FRAME: usize = 64 * 1024 * 1024;

/// Connection shared by the backend and every resource handle it hands out.
pub type SharedConnection = Arc<Mutex<BuildConnection>>;

/// Single TCP session with the build service. Calls are strictly
/// request/reply; there is no pipelining and no reconnect.
///
/// A transport failure or an expired deadline leaves the stream out of step
/// with the service, so the session is closed and every later call fails.
pub struct BuildConnection {
    addr: String,
    stream: TcpStream,
    timeout: Option<Duration>,
    broken: bool,
}

impl BuildConnection {
    pub async fn connect(addr: &str, timeout: Option<Duration>) -> Result<Self, TurbineError> {
        let stream = with_deadline(timeout, TcpStream::connect(addr))
            .await?
            .map_err(|e| TurbineError::Rpc(format!("connect to {addr}: {e}")))?;
        tracing::info!(addr = %addr, "connected to build service");
        Ok(Self {
            addr: addr.to_owned(),
            stream,
            timeout,
            broken: false,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn into_shared(self) -> SharedConnection {
        Arc::new(Mutex::new(self))
    }

    /// Send `request` and wait for its reply.
    pub async fn call<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T, TurbineError> {
        let method = request.method();
        if self.broken {
            return Err(TurbineError::Rpc(format!(
                "{method}: session closed after previous failure"
            )));
        }
        tracing::debug!(addr = %self.addr, method, "rpc call");

        let reply = match with_deadline(self.timeout, self.exchange(request))
            .await
            .and_then(|r| r)
        {
            Ok(reply) => reply,
            Err(e) => {
                self.broken = true;
                tracing::warn!(addr = %self.addr, method, error = %e, "build session closed");
                return Err(e.with_context(method));
            }
        };

        reply.into_result().map_err(|e| e.with_context(method))
    }

    async fn exchange(&mut self, request: &Request) -> Result<Reply, TurbineError> {
        let body = serde_json::to_vec(request)?;
        write_frame(&mut self.stream, &body).await?;
        let body = read_frame(&mut self.stream).await?;
        serde_json::from_slice(&body).map_err(|e| TurbineError::Rpc(format!("malformed reply: {e}")))
    }
}

async fn with_deadline<F: Future>(timeout: Option<Duration>, fut: F) -> Result<F::Output, TurbineError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TurbineError::Rpc(format!("deadline of {limit:?} exceeded"))),
        None => Ok(fut.await),
    }
}

// ════════════════════════════════════════════════════════════════
//  Framing: 4-byte big-endian length, then the body
// ════════════════════════════════════════════════════════════════

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Result<(), TurbineError> {
    if body.len() > MAX_FRAME {
        return Err(TurbineError::Rpc(format!(
            "frame too large: {} bytes (max {MAX_FRAME})",
            body.len()
        )));
    }
    let mut buf = Vec::with_capacity(4 + body.len());
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(body);
    writer.write_all(&buf).await.map_err(rpc_io)?;
    writer.flush().await.map_err(rpc_io)
}

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, TurbineError> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await.map_err(rpc_io)?;
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME {
        return Err(TurbineError::Rpc(format!(
            "frame too large: {len} bytes (max {MAX_FRAME})"
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(rpc_io)?;
    Ok(body)
}

fn rpc_io(e: std::io::Error) -> TurbineError {
    TurbineError::Rpc(format!("transport: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_round_trip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, br#"{"status":"ok"}"#).await.unwrap();
        let body = read_frame(&mut b).await.unwrap();
        assert_eq!(body, br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn oversized_header_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&u32::MAX.to_be_bytes()).await.unwrap();
        let err = read_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, TurbineError::Rpc(msg) if msg.contains("too large")));
    }

    #[tokio::test]
    async fn truncated_frame_is_transport_error() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&10u32.to_be_bytes()).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);
        let err = read_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, TurbineError::Rpc(msg) if msg.starts_with("transport")));
    }

    /// Service that answers the first request only after `delay`, echoing
    /// the requested collection onto `stream-for-<collection>`.
    async fn slow_first_reply(delay: Duration) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut first = true;
            while let Ok(body) = read_frame(&mut socket).await {
                let request: Request = serde_json::from_slice(&body).unwrap();
                let Request::ReadCollection { collection, .. } = request else {
                    break;
                };
                if first {
                    tokio::time::sleep(delay).await;
                    first = false;
                }
                let reply = Reply::ok(turbine_api::Collection {
                    name: collection.clone(),
                    stream: format!("stream-for-{collection}"),
                    records: Vec::new(),
                })
                .unwrap();
                let body = serde_json::to_vec(&reply).unwrap();
                if write_frame(&mut socket, &body).await.is_err() {
                    break;
                }
            }
        });
        addr
    }

    fn read(collection: &str) -> Request {
        Request::ReadCollection {
            resource: "pg".into(),
            collection: collection.into(),
            configs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn expired_deadline_closes_the_session() {
        let addr = slow_first_reply(Duration::from_millis(400)).await;
        let mut conn = BuildConnection::connect(&addr, Some(Duration::from_millis(150)))
            .await
            .unwrap();

        let err = conn
            .call::<turbine_api::Collection>(&read("slow"))
            .await
            .unwrap_err();
        assert!(matches!(&err, TurbineError::Rpc(msg) if msg.contains("deadline")), "{err}");
        assert!(conn.is_broken());

        // Give the late reply time to arrive; it must never be handed out.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let err = conn
            .call::<turbine_api::Collection>(&read("fast"))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, TurbineError::Rpc(msg) if msg.contains("session closed")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn service_error_keeps_the_session() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            while let Ok(_body) = read_frame(&mut socket).await {
                let body = serde_json::to_vec(&Reply::error("unknown resource")).unwrap();
                if write_frame(&mut socket, &body).await.is_err() {
                    break;
                }
            }
        });

        let mut conn = BuildConnection::connect(&addr, None).await.unwrap();
        for _ in 0..2 {
            let err = conn.call::<()>(&read("users")).await.unwrap_err();
            assert!(matches!(&err, TurbineError::Rpc(msg) if msg.contains("unknown resource")));
        }
        assert!(!conn.is_broken());
    }

    #[tokio::test]
    async fn connect_failure_is_rpc_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = BuildConnection::connect(&addr, Some(Duration::from_secs(5)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TurbineError::Rpc(_)));
    }
}
