//! imbed CLI
//!
//! Packs directories into archives, lists and extracts them, and serves them
//! over HTTP.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use imbed_rs::{
    archive, copy_to, tls, AssetBody, AssetServer, CompressionMethod, Config, FileSystem, Packer,
};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "imbed")]
#[command(about = "Pack, inspect, extract and serve static asset archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a directory into an archive
    Pack {
        /// Directory to pack
        source: PathBuf,

        /// Archive to write
        archive: PathBuf,

        /// Compression for textual content (none, gzip, zstd)
        #[arg(short, long, value_parser = parse_compression)]
        compression: Option<CompressionMethod>,

        /// MIME override as ext=type (repeatable)
        #[arg(short, long = "mime", value_parser = parse_mime)]
        mime: Vec<(String, String)>,

        /// Do not follow symbolic links
        #[arg(long)]
        no_follow: bool,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the files in an archive
    List {
        archive: PathBuf,

        /// Print one JSON record per file
        #[arg(long)]
        json: bool,
    },

    /// Extract files from an archive
    Extract {
        archive: PathBuf,

        /// Target directory
        target: PathBuf,

        /// Permission bits for extracted files (octal)
        #[arg(short, long, default_value = "0640", value_parser = parse_mode)]
        mode: u32,

        /// Replace files that differ from the packed version
        #[arg(long)]
        overwrite: bool,

        /// Paths to extract (default: everything)
        paths: Vec<String>,
    },

    /// Serve an archive over HTTP
    Serve {
        archive: PathBuf,

        /// Bind address
        #[arg(short, long)]
        listen: Option<String>,

        /// URL prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Asset served with status 404 for unknown paths
        #[arg(long)]
        not_found: Option<String>,

        /// Live directory layered over the archive
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// PEM certificate chain; requires --tls-key
        #[arg(long)]
        tls_cert: Option<PathBuf>,

        /// PEM private key; requires --tls-cert
        #[arg(long)]
        tls_key: Option<PathBuf>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_compression(s: &str) -> Result<CompressionMethod, String> {
    CompressionMethod::parse(s).ok_or_else(|| {
        format!(
            "Invalid compression '{}'. Valid options: none, gzip, zstd",
            s
        )
    })
}

fn parse_mime(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((ext, mime)) if !ext.is_empty() && !mime.is_empty() => {
            Ok((ext.to_string(), mime.to_string()))
        }
        _ => Err(format!("Invalid MIME override '{}'. Expected ext=type", s)),
    }
}

fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|e| format!("Invalid mode '{}': {}", s, e))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {:?}", path)),
        None => Ok(Config::default()),
    }
}

#[derive(Serialize)]
struct ListRecord<'a> {
    path: &'a str,
    mime_type: &'a str,
    size: u64,
    stored_size: u64,
    compression: CompressionMethod,
    tag: &'a str,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            source,
            archive: out,
            compression,
            mime,
            no_follow,
            config,
        } => {
            let mut options = load_config(config.as_ref())?.pack;
            if let Some(method) = compression {
                options.compression = method;
            }
            for (ext, ty) in mime {
                options.mime_types.insert(&ext, ty);
            }
            if no_follow {
                options.follow_links = false;
            }

            let (blob, index) = Packer::new(options)
                .pack(&source)
                .with_context(|| format!("packing {:?}", source))?;
            archive::write(&out, &index, &blob)?;
        }

        Commands::List { archive: path, json } => {
            let fs = archive::open(&path)?;
            let index = fs.index();
            for file in index.file_paths() {
                if !json {
                    println!("{}", file);
                    continue;
                }
                let Some(record) = index.file(file) else {
                    continue;
                };
                let line = serde_json::to_string(&ListRecord {
                    path: file,
                    mime_type: &record.mime_type,
                    size: record.size,
                    stored_size: record.stored_size(),
                    compression: record.compression,
                    tag: &record.tag,
                })?;
                println!("{}", line);
            }
        }

        Commands::Extract {
            archive: path,
            target,
            mode,
            overwrite,
            paths,
        } => {
            let fs = archive::open(&path)?;
            let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
            copy_to(&fs, &target, mode, overwrite, &paths)
                .with_context(|| format!("extracting to {:?}", target))?;
        }

        Commands::Serve {
            archive: path,
            listen,
            prefix,
            not_found,
            overlay,
            tls_cert,
            tls_key,
            config,
        } => {
            let mut options = load_config(config.as_ref())?.server;
            if let Some(listen) = listen {
                options.listen = listen;
            }
            if let Some(prefix) = prefix {
                options.prefix = prefix;
            }
            if not_found.is_some() {
                options.not_found = not_found;
            }
            if overlay.is_some() {
                options.overlay = overlay;
            }
            if tls_cert.is_some() {
                options.tls_cert = tls_cert;
            }
            if tls_key.is_some() {
                options.tls_key = tls_key;
            }
            let acceptor = match options.tls_files()? {
                Some((cert, key)) => Some(tls::load_acceptor(cert, key)?),
                None => None,
            };

            let embedded = archive::open(&path)?;
            let fs: Arc<dyn FileSystem> = match &options.overlay {
                Some(dir) => {
                    info!("Overlaying live directory {:?}", dir);
                    Arc::new(embedded.overlayed_with(dir)?)
                }
                None => Arc::new(embedded),
            };

            if let Some(page) = &options.not_found {
                if fs.stat(page).map(|m| !m.is_file()).unwrap_or(true) {
                    bail!("not-found page {:?} is not a file in the archive", page);
                }
            }

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve(Arc::new(AssetServer::new(fs, options)), acceptor))?;
        }
    }

    Ok(())
}

async fn serve(server: Arc<AssetServer>, acceptor: Option<TlsAcceptor>) -> anyhow::Result<()> {
    let addr: SocketAddr = server
        .options()
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", server.options().listen))?;

    let listener = TcpListener::bind(addr).await?;
    let http_server = ConnBuilder::new(TokioExecutor::new());
    info!(
        "Serving on {}://{} (prefix {:?})",
        if acceptor.is_some() { "https" } else { "http" },
        listener.local_addr()?,
        server.options().prefix
    );

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((socket, peer)) => {
                        let server = server.clone();
                        let http_server = http_server.clone();
                        let acceptor = acceptor.clone();
                        tokio::spawn(async move {
                            match acceptor {
                                Some(acceptor) => match acceptor.accept(socket).await {
                                    Ok(stream) => serve_stream(&http_server, stream, server).await,
                                    Err(e) => warn!("TLS handshake with {} failed: {}", peer, e),
                                },
                                None => serve_stream(&http_server, socket, server).await,
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn serve_stream<S>(
    http_server: &ConnBuilder<TokioExecutor>,
    stream: S,
    server: Arc<AssetServer>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req: Request<Incoming>| {
        let server = server.clone();
        async move { Ok::<_, Infallible>(respond(server, req).await) }
    });
    if let Err(e) = http_server.serve_connection(TokioIo::new(stream), service).await {
        error!("Connection error: {}", e);
    }
}

/// Run the handler off the async workers; it may touch the live filesystem.
/// Streamed bodies keep reading there too.
async fn respond(server: Arc<AssetServer>, req: Request<Incoming>) -> Response<AssetBody> {
    match tokio::task::spawn_blocking(move || server.handle(&req).map(AssetBody::offload)).await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Request handler failed: {}", e);
            let mut resp = Response::new(AssetBody::empty());
            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            resp
        }
    }
}
