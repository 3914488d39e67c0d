// freebird-relay: serves each stream connection through its own Transport
use clap::{Parser, ValueEnum};
use freebird_transport::{
    Event, Inbox, Result, SendPrimitive, TaskQueue, TcpChannel, Transport, TransportConfig,
    TransportError, UnixSocketChannel,
};
use std::io::Read;
use std::net::TcpListener;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "freebird-relay")]
#[command(about = "Relay stream connections through freebird transports", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// TCP address to listen on
    #[arg(short, long, default_value = "127.0.0.1:4321")]
    listen: String,

    /// Also listen on this Unix socket path
    #[arg(short, long, value_name = "PATH")]
    unix: Option<PathBuf>,

    /// What to do with inbound data
    #[arg(short, long, value_enum, default_value_t = Mode::Echo)]
    mode: Mode,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Send every received message back to its sender
    Echo,
    /// Treat inbound data as unhandled and log it
    Report,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = TransportConfig::from_env();
    info!(?config, mode = ?cli.mode, "starting relay");

    if let Some(path) = cli.unix.clone() {
        // Remove stale socket if exists
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        info!(path = %path.display(), "listening on unix socket");

        let (mode, config) = (cli.mode, config.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(error = %e, "unix accept failed");
                        continue;
                    }
                };
                let config = config.clone();
                thread::spawn(move || {
                    let channel = UnixSocketChannel::from_stream(stream);
                    let result = channel
                        .reader()
                        .map_err(TransportError::from)
                        .and_then(|reader| serve("unix", channel, reader, mode, config));
                    if let Err(e) = result {
                        error!(error = %e, "unix connection failed");
                    }
                });
            }
        });
    }

    let listener = TcpListener::bind(&cli.listen)?;
    info!(address = %cli.listen, "listening on tcp");

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "tcp accept failed");
                continue;
            }
        };

        let (mode, config) = (cli.mode, config.clone());
        thread::spawn(move || {
            let channel = TcpChannel::from_stream(stream);
            let label = channel.address().to_string();
            let result = channel
                .reader()
                .map_err(TransportError::from)
                .and_then(|reader| serve(&label, channel, reader, mode, config));
            if let Err(e) = result {
                error!(peer = %label, error = %e, "tcp connection failed");
            }
        });
    }

    Ok(())
}

/// Drive one connection until the peer closes it.
fn serve<P, R>(label: &str, channel: P, reader: R, mode: Mode, config: TransportConfig) -> Result<()>
where
    P: SendPrimitive + 'static,
    R: Read + Send + 'static,
{
    let queue = TaskQueue::new();
    let inbox = Inbox::spawn(label, reader, &config)?;
    let transport = Rc::new(Transport::with_config(queue.clone(), config).with_primitive(channel));
    info!(peer = %label, "connection opened");

    match mode {
        Mode::Echo => {
            let weak = Rc::downgrade(&transport);
            let peer = label.to_string();
            transport.on(Event::Message, move |envelope| {
                let Some(transport) = weak.upgrade() else { return };
                let peer = peer.clone();
                transport.send(
                    envelope.clone(),
                    Some(Box::new(move |result: Result<usize>| match result {
                        Ok(bytes) => info!(%peer, bytes, "echoed"),
                        Err(e) => warn!(%peer, error = %e, "echo failed"),
                    })),
                );
            });
        }
        Mode::Report => {
            let peer = label.to_string();
            transport.on(Event::UnhandledMessage, move |envelope| {
                info!(
                    %peer,
                    bytes = envelope.data.len(),
                    text = %envelope.data.to_text(),
                    "unhandled message"
                );
            });
        }
    }

    loop {
        let pumped = match mode {
            Mode::Echo => inbox.pump_into(&transport, POLL_INTERVAL),
            Mode::Report => inbox.pump(POLL_INTERVAL, |envelope| transport.unhandled(envelope, None)),
        };
        // Chunks delivered before a failure still get their echoes out
        queue.run_until_idle();
        match pumped {
            Ok(_) => {}
            Err(TransportError::Disconnected) => break,
            Err(e) => return Err(e),
        }
        if inbox.is_closed() {
            break;
        }
    }

    info!(peer = %label, "connection closed");
    Ok(())
}
