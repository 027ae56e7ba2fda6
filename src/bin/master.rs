//! rtumaster Binary
//!
//! Talks to RTU peers over a serial port.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args as ClapArgs, Parser, Subcommand};
use crossbeam::channel::{unbounded, Receiver};
use tracing_subscriber::{fmt, EnvFilter};

use rtumaster::transport::serial::{list_ports, open_port, SerialReader};
use rtumaster::{build_simple_frame, Config, Engine, ListenerFilter, MasterError, ResponseRecord, TickScheduler};

/// rtumaster
#[derive(Parser, Debug)]
#[command(name = "rtumaster")]
#[command(about = "Master for RTU style request/response over a serial line")]
#[command(version)]
struct Args {
    /// JSON config file (flags below override it)
    #[arg(short, long)]
    config: Option<String>,

    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long)]
    port: Option<String>,

    /// Line speed
    #[arg(short, long)]
    baud: Option<u32>,

    /// Reply timeout in milliseconds
    #[arg(long)]
    reply_timeout_ms: Option<u64>,

    /// Inter-byte timeout in milliseconds
    #[arg(long)]
    inter_byte_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// One register request
#[derive(ClapArgs, Debug, Clone, Copy)]
struct Request {
    /// Peer address (decimal or 0x-prefixed hex)
    #[arg(value_parser = parse_u8)]
    peer: u8,

    /// Function code
    #[arg(value_parser = parse_u8)]
    function: u8,

    /// Register address
    #[arg(value_parser = parse_u16)]
    register: u16,

    /// Register value (or quantity for reads)
    #[arg(value_parser = parse_u16)]
    value: u16,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial ports
    Ports,

    /// Print the encoded request frame without sending it
    Encode {
        #[command(flatten)]
        request: Request,
    },

    /// Send one request and wait for the reply
    Send {
        #[command(flatten)]
        request: Request,
    },

    /// Print every response seen on the line
    Monitor {
        /// Stop after this many seconds (runs forever if omitted)
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Repeat one request at a fixed interval
    Poll {
        #[command(flatten)]
        request: Request,

        /// Delay between requests in milliseconds
        #[arg(short, long, default_value = "1000")]
        interval_ms: u64,

        /// Number of requests (runs forever if omitted)
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rtumaster=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> rtumaster::Result<()> {
    let config = build_config(&args)?;

    match args.command {
        Commands::Ports => {
            for name in list_ports()? {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Encode { request } => {
            let frame = build_simple_frame(request.peer, request.function, request.register, request.value);
            println!("{}", frame);
            Ok(())
        }
        Commands::Send { request } => {
            let session = Session::open(config)?;
            session.exchange(request)
        }
        Commands::Monitor { seconds } => {
            let session = Session::open(config)?;
            match seconds {
                Some(secs) => thread::sleep(Duration::from_secs(secs)),
                None => loop {
                    thread::sleep(Duration::from_secs(60));
                },
            }
            session.close();
            Ok(())
        }
        Commands::Poll {
            request,
            interval_ms,
            count,
        } => {
            let session = Session::open(config)?;
            let mut sent = 0u64;
            while count.map_or(true, |n| sent < n) {
                if let Err(e) = session.exchange(request) {
                    tracing::warn!("Request {} failed: {}", sent + 1, e);
                }
                sent += 1;
                thread::sleep(Duration::from_millis(interval_ms));
            }
            session.close();
            Ok(())
        }
    }
}

fn build_config(args: &Args) -> rtumaster::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(port) = &args.port {
        config.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if let Some(ms) = args.reply_timeout_ms {
        config.reply_timeout_ms = ms;
    }
    if let Some(ms) = args.inter_byte_timeout_ms {
        config.inter_byte_timeout_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

/// An open port with its reader and tick threads
struct Session {
    engine: Arc<Engine>,
    responses: Receiver<ResponseRecord>,
    reader: SerialReader,
    ticker: TickScheduler,
}

impl Session {
    fn open(config: Config) -> rtumaster::Result<Self> {
        let port = open_port(&config)?;
        let writer = port.try_clone()?;

        let engine = Arc::new(Engine::new(config, writer)?);

        let (tx, responses) = unbounded();
        engine.add_listener(ListenerFilter::All, move |record| {
            print_record(record);
            let _ = tx.send(record.clone());
        })?;

        let reader = SerialReader::spawn(port, Arc::clone(&engine))?;
        let ticker = TickScheduler::spawn(Arc::clone(&engine))?;

        Ok(Self {
            engine,
            responses,
            reader,
            ticker,
        })
    }

    /// Send `request` and wait for a reply or the reply timeout
    fn exchange(&self, request: Request) -> rtumaster::Result<()> {
        // Forget replies that arrived after an earlier timeout
        while self.responses.try_recv().is_ok() {}

        let frame = build_simple_frame(request.peer, request.function, request.register, request.value);
        println!("REQUEST  => {}", frame);
        self.engine.send_request(&frame)?;

        let wait = self.engine.config().reply_timeout() + self.engine.config().tick_interval();
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok(record) if is_reply_to(&record, &request) => return Ok(()),
                Ok(_) => continue,
                Err(_) => {
                    return Err(MasterError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no reply from peer {:#04x}", request.peer),
                    )))
                }
            }
        }
    }

    fn close(self) {
        let stats = self.engine.diagnostics();
        self.ticker.stop();
        self.reader.stop();
        tracing::info!("Session closed: {:?}", stats);
    }
}

/// A response from the addressed peer for the requested function
/// (exception replies included)
fn is_reply_to(record: &ResponseRecord, request: &Request) -> bool {
    record.peer_address == request.peer && record.function == request.function
}

fn print_record(record: &ResponseRecord) {
    println!("RESPONSE => peer_address: {:#04x}", record.peer_address);
    println!("            function:     {:#04x}", record.function);
    println!("            is_error:     {}", record.is_error);
    println!("            error_code:   {:#04x}", record.error_code);
    println!("            data:         {:02X?}", &record.data[..]);
    println!("            data_length:  {}", record.data_length());
}

fn parse_u8(s: &str) -> Result<u8, String> {
    parse_number(s).and_then(|v| u8::try_from(v).map_err(|_| format!("{} does not fit in a byte", s)))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    parse_number(s).and_then(|v| u16::try_from(v).map_err(|_| format!("{} does not fit in 16 bits", s)))
}

fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}
