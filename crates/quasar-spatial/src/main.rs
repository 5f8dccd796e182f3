//! Stream 3D scene components over a lossy datagram link.
//!
//! `tx` extracts every mesh from a glTF/GLB or OBJ scene, compresses it and
//! sends one frame per component. `rx` listens for frames and writes each
//! reconstructed mesh as an OBJ file. `pack` and `inspect` work on frames
//! stored on disk.

mod export;
mod scene;

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use quasar_codec::{CompressionFlags, HaarTransform, Passthrough, parse_frame};
use quasar_link::{
    ReceiveConfig, Receiver, Shutdown, TransmitConfig, Transmitter, TransportConfig, UdpTransport,
};
use tracing::Level;

use crate::export::{FrameDir, ObjExporter};

/// Spatial compression for bandwidth-constrained telemetry links
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Log per-frame detail, including discarded datagrams
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a scene and send one frame per component
    Tx {
        /// Scene file (.gltf, .glb or .obj)
        #[clap(short, long)]
        model: PathBuf,

        /// Receiver address
        #[clap(long)]
        ip: IpAddr,

        /// Receiver port
        #[clap(short, long)]
        port: u16,

        #[clap(flatten)]
        encode: EncodeSettings,

        /// Send the index payload without DEFLATE
        #[clap(long)]
        raw_indices: bool,
    },

    /// Receive frames until interrupted, writing each mesh as OBJ
    Rx {
        /// Port to listen on
        #[clap(short, long)]
        port: u16,

        /// Directory for `component_<id>.obj` files
        #[clap(short, long, default_value = ".")]
        out: PathBuf,

        /// Local address to bind
        #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,
    },

    /// Encode a scene into `frame_<id>.qsr` files without sending
    Pack {
        /// Scene file (.gltf, .glb or .obj)
        #[clap(short, long)]
        model: PathBuf,

        /// Output directory
        #[clap(short, long)]
        out: PathBuf,

        #[clap(flatten)]
        encode: EncodeSettings,
    },

    /// Print the header of a stored frame as JSON
    Inspect {
        /// Frame file
        frame: PathBuf,
    },
}

#[derive(Parser)]
struct EncodeSettings {
    /// Wavelet coefficients below this magnitude are zeroed
    #[clap(short, long, default_value_t = 0.01)]
    threshold: f32,

    /// Do not emit frames for components without geometry
    #[clap(long)]
    skip_empty: bool,
}

impl EncodeSettings {
    fn config(&self) -> TransmitConfig {
        TransmitConfig {
            skip_empty: self.skip_empty,
            ..TransmitConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    match args.cmd {
        Command::Tx {
            model,
            ip,
            port,
            encode,
            raw_indices,
        } => {
            let components = scene::extract_components(&model)
                .with_context(|| format!("Failed to read scene {}", model.display()))?;
            let destination = SocketAddr::new(ip, port);
            let transport = UdpTransport::sender_for(destination, TransportConfig::default())
                .context("Failed to open sending socket")?;

            let sent = if raw_indices {
                Transmitter::with_codecs(
                    transport,
                    Passthrough,
                    HaarTransform::default(),
                    encode.config(),
                )
                .run(&components, encode.threshold, destination)?
            } else {
                Transmitter::new(transport, encode.config()).run(
                    &components,
                    encode.threshold,
                    destination,
                )?
            };
            if sent == 0 {
                bail!("no frames were sent");
            }
        }

        Command::Rx { port, out, bind } => {
            let addr = SocketAddr::new(bind, port);
            let transport = UdpTransport::bind(addr, TransportConfig::default())
                .with_context(|| format!("Failed to bind {addr}"))?;
            let mut exporter = ObjExporter::new(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;

            let shutdown = Shutdown::new();
            tokio::spawn({
                let shutdown = shutdown.clone();
                async move {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl-C: {e}");
                        return;
                    }
                    tracing::info!("Interrupted, stopping receiver");
                    shutdown.request();
                }
            });

            tracing::info!("Listening on {addr}, writing meshes to {}", out.display());
            let stats = tokio::task::spawn_blocking(move || {
                Receiver::new(transport, ReceiveConfig::default()).run(&mut exporter, &shutdown)
            })
            .await?;
            if stats.export_failures > 0 {
                bail!("{} meshes could not be written", stats.export_failures);
            }
        }

        Command::Pack { model, out, encode } => {
            let components = scene::extract_components(&model)
                .with_context(|| format!("Failed to read scene {}", model.display()))?;
            let sink = FrameDir::new(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            let destination = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

            let packed = Transmitter::new(sink, encode.config()).run(
                &components,
                encode.threshold,
                destination,
            )?;
            tracing::info!("Packed {packed} frames into {}", out.display());
        }

        Command::Inspect { frame } => {
            let bytes =
                fs::read(&frame).with_context(|| format!("Failed to read {}", frame.display()))?;
            let view = parse_frame(&bytes)
                .with_context(|| format!("{} is not a valid frame", frame.display()))?;
            let header = view.header;

            let summary = serde_json::json!({
                "file_type": header.file_type,
                "compression": {
                    "entropy": header.compression.contains(CompressionFlags::ENTROPY),
                    "wavelet": header.compression.contains(CompressionFlags::WAVELET),
                },
                "original_size": header.original_size,
                "scale": header.scale,
                "target_id": header.target_id,
                "vertex_count": header.vertex_count,
                "vertex_bytes": view.vertex_bytes.len(),
                "index_bytes": view.index_bytes.len(),
                "frame_bytes": bytes.len(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
