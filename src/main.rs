//! csilvm: a CSI plugin exposing an LVM2 volume group as block/filesystem volumes.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tonic::transport::Server;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use csilvm::csi;
use csilvm::device::{CliDeviceTools, DeviceTools};
use csilvm::interceptors::TelemetryLayer;
use csilvm::lvm::{Lvm2Backend, LvmBackend};
use csilvm::{LvmCsiServer, ServerConfigBuilder};

#[derive(Parser, Debug)]
#[command(name = "csilvm")]
#[command(about = "CSI plugin exposing an LVM2 volume group as block/filesystem volumes")]
struct Args {
    /// CSI endpoint, either `unix:///path/to/socket` or `tcp://host:port`
    #[arg(long, env = "CSI_ENDPOINT", default_value = "unix:///var/run/csilvm/csi.sock")]
    csi_endpoint: String,

    /// Name of the managed volume group
    #[arg(long, env = "CSILVM_VG_NAME")]
    vg_name: String,

    /// Block devices that must constitute the volume group, comma-separated
    #[arg(long, env = "CSILVM_PV_NAMES", value_delimiter = ',')]
    pv_names: Vec<String>,

    /// Default logical volume size, in bytes, applied when a request omits a capacity range
    #[arg(long, env = "CSILVM_DEFAULT_VOLUME_SIZE", default_value_t = u64::MAX)]
    default_volume_size_bytes: u64,

    /// Filesystem types to support, comma-separated; the first is the default
    #[arg(long, env = "CSILVM_SUPPORTED_FILESYSTEMS", value_delimiter = ',', default_value = "ext4,xfs")]
    supported_filesystems: Vec<String>,

    /// LVM tags applied to the volume group and every logical volume it creates
    #[arg(long, env = "CSILVM_TAGS", value_delimiter = ',')]
    tags: Vec<String>,

    /// Run in destructive "remove volume group" mode
    #[arg(long, env = "CSILVM_REMOVE_VOLUME_GROUP", default_value_t = false)]
    remove_volume_group: bool,

    /// Address the Prometheus metrics exporter listens on
    #[arg(long, env = "CSILVM_METRICS_ADDR", default_value = "0.0.0.0:9090")]
    metrics_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

enum Endpoint {
    Unix(std::path::PathBuf),
    Tcp(SocketAddr),
}

fn parse_endpoint(raw: &str) -> Result<Endpoint, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(path) = raw.strip_prefix("unix://") {
        Ok(Endpoint::Unix(std::path::PathBuf::from(path)))
    } else if let Some(addr) = raw.strip_prefix("tcp://") {
        Ok(Endpoint::Tcp(addr.parse()?))
    } else {
        Err(format!("unrecognized csi endpoint scheme: {raw}").into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config_builder = ServerConfigBuilder::new()
        .vg_name(args.vg_name.clone())
        .pv_names(args.pv_names.clone())
        .default_volume_size(args.default_volume_size_bytes)
        .removing_volume_group(args.remove_volume_group);

    for tag in &args.tags {
        config_builder = config_builder.tag(tag.clone());
    }
    for (i, fs) in args.supported_filesystems.iter().enumerate() {
        config_builder = config_builder.supported_filesystem(fs.clone(), fs.clone());
        if i == 0 {
            config_builder = config_builder.supported_filesystem("", fs.clone());
        }
    }

    let config = config_builder.build()?;

    info!(
        vg_name = %config.vg_name,
        pv_names = ?config.pv_names,
        removing_volume_group = config.removing_volume_group,
        endpoint = %args.csi_endpoint,
        "starting csilvm"
    );

    let backend: Arc<dyn LvmBackend> = Arc::new(Lvm2Backend);
    let device_tools: Arc<dyn DeviceTools> = Arc::new(CliDeviceTools);
    let server = Arc::new(LvmCsiServer::new(config, backend, device_tools));

    csilvm::metrics::init_metrics(args.metrics_addr)?;
    let uptime_reporter = csilvm::uptime::UptimeReporter::spawn();

    let identity_svc = csi::identity_server::IdentityServer::new(csilvm::identity::IdentityService);
    let controller_svc =
        csi::controller_server::ControllerServer::new(csilvm::controller::ControllerService::new(server.clone()));
    let node_svc = csi::node_server::NodeServer::new(csilvm::node::NodeService::new(server.clone()));

    let router = Server::builder()
        .layer(TelemetryLayer)
        .add_service(identity_svc)
        .add_service(controller_svc)
        .add_service(node_svc);

    match parse_endpoint(&args.csi_endpoint)? {
        Endpoint::Tcp(addr) => {
            router.serve_with_shutdown(addr, shutdown_signal()).await?;
        }
        Endpoint::Unix(path) => {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            let listener = tokio::net::UnixListener::bind(&path)?;
            let incoming = tokio_stream::wrappers::UnixListenerStream::new(listener);
            router
                .serve_with_incoming_shutdown(incoming, shutdown_signal())
                .await?;
        }
    }

    uptime_reporter.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
