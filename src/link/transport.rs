//! # Link Transport
//!
//! Datagram intake for the wind sensor link. Each UDP datagram stands for one
//! radio transmission; its exact length is preserved so length checks in the
//! decoder see what the sender actually sent.
//!
//! Link channels 1..13 map onto consecutive UDP ports starting at the
//! configured base port, so two sensors on different channels never mix.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::receiver::{LinkReceiver, ReceiveOutcome};
pub use crate::calibration::settings::{CHANNEL_MAX, CHANNEL_MIN};
use crate::error::{AnemoError, Result};

/// Largest datagram read in one go; anything longer is truncated and then
/// rejected on length.
pub const MAX_DATAGRAM: usize = 64;

/// UDP port used for a channel
///
/// # Examples
///
/// ```
/// use anemo_rx::link::transport::port_for_channel;
///
/// assert_eq!(port_for_channel(47000, 1), 47000);
/// assert_eq!(port_for_channel(47000, 13), 47012);
/// ```
pub fn port_for_channel(base_port: u16, channel: u8) -> u16 {
    let channel = channel.clamp(CHANNEL_MIN, CHANNEL_MAX);
    base_port.saturating_add((channel - CHANNEL_MIN) as u16)
}

/// UDP socket bound to the port of the current link channel
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    bind_ip: IpAddr,
    base_port: u16,
    channel: u8,
}

impl UdpTransport {
    /// Bind the socket for `channel`
    ///
    /// # Errors
    ///
    /// Returns `Link` error if the port cannot be bound
    pub async fn bind(bind_ip: IpAddr, base_port: u16, channel: u8) -> Result<Self> {
        let socket = Self::bind_socket(bind_ip, base_port, channel).await?;
        info!(
            "Link listening on {} (channel {})",
            socket.local_addr()?,
            channel
        );

        Ok(Self {
            socket,
            bind_ip,
            base_port,
            channel,
        })
    }

    async fn bind_socket(bind_ip: IpAddr, base_port: u16, channel: u8) -> Result<UdpSocket> {
        let addr = SocketAddr::new(bind_ip, port_for_channel(base_port, channel));
        UdpSocket::bind(addr)
            .await
            .map_err(|e| AnemoError::Link(format!("Failed to bind {}: {}", addr, e)))
    }

    /// Move to another channel
    ///
    /// The new socket is bound before the old one is dropped, so a failed
    /// retune leaves the current channel in service.
    pub async fn retune(&mut self, channel: u8) -> Result<()> {
        if channel == self.channel {
            return Ok(());
        }

        let socket = Self::bind_socket(self.bind_ip, self.base_port, channel).await?;
        info!(
            "Link retuned from channel {} to {} ({})",
            self.channel,
            channel,
            socket.local_addr()?
        );
        self.socket = socket;
        self.channel = channel;
        Ok(())
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next datagram, returning its length
    pub async fn recv(&self, buf: &mut [u8; MAX_DATAGRAM]) -> Result<usize> {
        let (len, from) = self
            .socket
            .recv_from(buf)
            .await
            .map_err(|e| AnemoError::Link(format!("Receive failed: {}", e)))?;
        debug!("Datagram of {} bytes from {}", len, from);
        Ok(len)
    }
}

/// Receive loop: feeds every datagram to the receiver and follows channel
/// changes published by the UI
///
/// Returns when the channel sender is dropped.
pub async fn run_link(
    mut transport: UdpTransport,
    mut receiver: LinkReceiver,
    mut channel_rx: watch::Receiver<u8>,
) {
    let mut buf = [0u8; MAX_DATAGRAM];

    loop {
        tokio::select! {
            received = transport.recv(&mut buf) => {
                match received {
                    Ok(len) => {
                        if let ReceiveOutcome::Accepted { lost, seq } =
                            receiver.on_receive(&buf[..len], Instant::now())
                        {
                            if lost > 0 {
                                debug!("Frame {} arrived after {} missing", seq, lost);
                            }
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }

            changed = channel_rx.changed() => {
                if changed.is_err() {
                    info!("Link receive loop stopping");
                    break;
                }
                let channel = *channel_rx.borrow_and_update();
                if let Err(e) = transport.retune(channel).await {
                    warn!("Keeping channel {}: {}", transport.channel(), e);
                }
            }
        }
    }
}
