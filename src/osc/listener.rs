//! Inbound OSC: host model updates

use crate::model::ModelUpdate;
use crate::wire::osc::decode_packet;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const OSC_BUF_SIZE: usize = 65_536;

/// Bind `addr` and forward decoded model updates on `tx`.
///
/// The task ends when the receiving side of `tx` is dropped.
pub async fn spawn_listener(
    addr: SocketAddr,
    tx: mpsc::Sender<ModelUpdate>,
) -> Result<JoinHandle<()>> {
    let socket = UdpSocket::bind(addr)
        .await
        .with_context(|| format!("Failed to bind OSC listener on {}", addr))?;
    info!("OSC input listening on {}", addr);

    Ok(tokio::spawn(async move {
        let mut buf = vec![0u8; OSC_BUF_SIZE];
        loop {
            let (size, from) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    error!("Error receiving from OSC socket: {}", e);
                    continue;
                }
            };

            let messages = match decode_packet(&buf[..size]) {
                Ok(messages) => messages,
                Err(e) => {
                    warn!("Undecodable OSC packet from {}: {}", from, e);
                    continue;
                }
            };

            for message in messages {
                match ModelUpdate::from_osc(&message) {
                    Ok(update) => {
                        if tx.send(update).await.is_err() {
                            debug!("Model channel closed, OSC listener stopping");
                            return;
                        }
                    }
                    Err(e) => warn!("Ignoring OSC message: {}", e),
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::osc::encode_bundle;
    use rosc::{OscMessage, OscType};
    use std::time::Duration;

    #[tokio::test]
    async fn test_updates_are_forwarded() {
        let probe = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_listener(addr, tx).await.unwrap();

        let bytes = encode_bundle(&[
            OscMessage {
                addr: "/nothing/here".into(),
                args: vec![],
            },
            OscMessage {
                addr: "/pad/40/color".into(),
                args: vec![OscType::Int(5)],
            },
        ])
        .unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&bytes, addr).await.unwrap();

        let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update, ModelUpdate::PadColor { note: 40, color: 5 });
        handle.abort();
    }
}
