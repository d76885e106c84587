//! # Anemo Sim
//!
//! Stands in for the masthead sensor: sends synthetic wind frames over UDP so
//! the receiver can be exercised without hardware.
//!
//! The wind direction sweeps slowly around the compass and the speed swings
//! between calm and a moderate breeze.
//!
//! ```bash
//! anemo-sim --channel 3
//! anemo-sim --host 192.168.4.20 --drop-every 7 --corrupt-every 25
//! ```

use anyhow::{bail, Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::time::{interval, Duration};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use anemo_rx::config::Config;
use anemo_rx::link::transport::{port_for_channel, CHANNEL_MAX, CHANNEL_MIN};
use anemo_rx::wind::encoder::encode_reading;
use anemo_rx::wind::protocol::STATUS_DIRECTION_VALID;

const USAGE: &str = "usage: anemo-sim [--host IP] [--base-port PORT] [--channel N] \
[--rate HZ] [--drop-every N] [--corrupt-every N]";

/// Centidegrees the direction advances per frame
const SWEEP_CDEG_PER_FRAME: u32 = 150;

#[derive(Debug)]
struct Options {
    host: IpAddr,
    base_port: u16,
    channel: u8,
    rate_hz: u32,
    drop_every: Option<u32>,
    corrupt_every: Option<u32>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: Config::default().link.base_port,
            channel: CHANNEL_MIN,
            rate_hz: 10,
            drop_every: None,
            corrupt_every: None,
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();

    while let Some(flag) = args.next() {
        if flag == "-h" || flag == "--help" {
            println!("{}", USAGE);
            std::process::exit(0);
        }

        let value = args
            .next()
            .with_context(|| format!("{} needs a value\n{}", flag, USAGE))?;

        match flag.as_str() {
            "--host" => options.host = value.parse().context("--host")?,
            "--base-port" => options.base_port = value.parse().context("--base-port")?,
            "--channel" => options.channel = value.parse().context("--channel")?,
            "--rate" => options.rate_hz = value.parse().context("--rate")?,
            "--drop-every" => options.drop_every = Some(value.parse().context("--drop-every")?),
            "--corrupt-every" => {
                options.corrupt_every = Some(value.parse().context("--corrupt-every")?)
            }
            _ => bail!("unknown option {}\n{}", flag, USAGE),
        }
    }

    if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&options.channel) {
        bail!("channel must be {}..={}", CHANNEL_MIN, CHANNEL_MAX);
    }
    if options.rate_hz == 0 || options.rate_hz > 1000 {
        bail!("rate must be 1..=1000 Hz");
    }
    if options.drop_every == Some(0) || options.corrupt_every == Some(0) {
        bail!("--drop-every and --corrupt-every take a positive count");
    }

    Ok(options)
}

/// Synthetic readings for sequence number `seq`
///
/// Returns `(angle_cdeg, pps_centi, rpm_centi)`.
fn reading(seq: u32) -> (u16, u16, u16) {
    let angle_cdeg = (seq.wrapping_mul(SWEEP_CDEG_PER_FRAME) % 36_000) as u16;

    // Triangle wave over 200 frames: 0..=20.00 pulses per second
    let phase = seq % 200;
    let ramp = if phase < 100 { phase } else { 200 - phase };
    let pps_centi = (ramp * 20) as u16;
    let rpm_centi = pps_centi.saturating_mul(3);

    (angle_cdeg, pps_centi, rpm_centi)
}

fn every(n: Option<u32>, seq: u32) -> bool {
    n.map(|n| seq % n == 0).unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = parse_args(std::env::args().skip(1))?;
    let target = SocketAddr::new(options.host, port_for_channel(options.base_port, options.channel));

    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .context("binding sender socket")?;
    info!(
        "Sending to {} (channel {}) at {} Hz",
        target, options.channel, options.rate_hz
    );

    let started = Instant::now();
    let mut ticker = interval(Duration::from_secs(1) / options.rate_hz);
    let mut seq: u32 = 0;
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                seq = seq.wrapping_add(1);
                if every(options.drop_every, seq) {
                    debug!("Skipping seq {}", seq);
                    continue;
                }

                let (angle_cdeg, pps_centi, rpm_centi) = reading(seq);
                let timestamp_ms = started.elapsed().as_millis() as u32;
                let mut frame = encode_reading(
                    seq,
                    timestamp_ms,
                    angle_cdeg,
                    pps_centi,
                    rpm_centi,
                    STATUS_DIRECTION_VALID,
                );

                if every(options.corrupt_every, seq) {
                    debug!("Corrupting seq {}", seq);
                    frame[10] ^= 0xFF;
                }

                socket.send_to(&frame, target).await.context("sending frame")?;
                sent += 1;
                if sent % 100 == 0 {
                    info!("{} frames sent", sent);
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Stopping after {} frames", sent);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_defaults() {
        let options = parse_args(args(&[])).unwrap();
        assert_eq!(options.channel, 1);
        assert_eq!(options.rate_hz, 10);
        assert_eq!(options.drop_every, None);
    }

    #[test]
    fn test_parse_options() {
        let options = parse_args(args(&["--channel", "5", "--drop-every", "3", "--host", "10.0.0.2"])).unwrap();
        assert_eq!(options.channel, 5);
        assert_eq!(options.drop_every, Some(3));
        assert_eq!(options.host, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn test_rejects_bad_options() {
        assert!(parse_args(args(&["--channel", "14"])).is_err());
        assert!(parse_args(args(&["--drop-every", "0"])).is_err());
        assert!(parse_args(args(&["--channel"])).is_err());
        assert!(parse_args(args(&["--bogus", "1"])).is_err());
    }

    #[test]
    fn test_reading_stays_in_range() {
        for seq in 0..1000 {
            let (angle, pps, rpm) = reading(seq);
            assert!(angle < 36_000);
            assert!(pps <= 2000);
            assert_eq!(rpm, pps * 3);
        }
    }
}
