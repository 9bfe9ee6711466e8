//! UDP sender for OSC bundles

use crate::error::TransportError;
use crate::wire::osc::encode_bundle;
use crate::writer::TransportSink;
use rosc::OscMessage;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Sends each flush as a single bundle to one target
pub struct OscClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscClient {
    /// Bind an ephemeral local port for sending to `target`
    pub async fn bind(target: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        info!("OSC output -> {}", target);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send without awaiting; a full socket buffer surfaces as an I/O error
    /// and the writer drops the bundle like any other failed flush.
    pub fn send_bundle(&self, messages: &[OscMessage]) -> Result<(), TransportError> {
        if messages.is_empty() {
            return Ok(());
        }
        let bytes = encode_bundle(messages)?;
        let sent = self.socket.try_send_to(&bytes, self.target)?;
        debug!("OSC bundle: {} messages, {} bytes", messages.len(), sent);
        Ok(())
    }
}

impl TransportSink<OscMessage> for OscClient {
    fn transmit(&self, frames: &[OscMessage]) -> Result<(), TransportError> {
        self.send_bundle(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::osc::decode_packet;
    use rosc::OscType;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bundle_reaches_target() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = OscClient::bind(receiver.local_addr().unwrap())
            .await
            .unwrap();

        let messages = vec![
            OscMessage {
                addr: "/play".into(),
                args: vec![OscType::Int(1)],
            },
            OscMessage {
                addr: "/tempo".into(),
                args: vec![OscType::Float(128.0)],
            },
        ];
        client.send_bundle(&messages).unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decode_packet(&buf[..len]).unwrap(), messages);
    }

    #[tokio::test]
    async fn test_empty_flush_sends_nothing() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = OscClient::bind(receiver.local_addr().unwrap())
            .await
            .unwrap();
        client.transmit(&[]).unwrap();

        let mut buf = [0u8; 64];
        let received =
            tokio::time::timeout(Duration::from_millis(100), receiver.recv_from(&mut buf)).await;
        assert!(received.is_err(), "no datagram for an empty flush");
    }
}
