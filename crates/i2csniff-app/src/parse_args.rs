use anyhow::bail;
use log::LevelFilter;
use std::path::PathBuf;

const HELP: &str = "\
i2csniff - passive I2C bus monitor

Decodes SCL/SDA edge reports into one line per bus transaction.

USAGE:
  i2csniff [listen] --port <dev> [OPTIONS]   Decode live from a serial edge sampler
  i2csniff replay <capture> [OPTIONS]        Decode a capture file
  i2csniff demo [--save <capture>]           Decode a built-in example capture
  i2csniff ports                             List serial ports

OPTIONS:
  -h, --help            Prints help information
  --port <dev>          Serial device of the edge sampler
  --baud-rate <n>       Sampler link speed (default: 115200)
  --duration <secs>     Stop listening after this many seconds
  --scl <pin>           Pin carrying SCL (default: 3)
  --sda <pin>           Pin carrying SDA (default: 2)
  --keep-mode           Leave pins in their bus peripheral mode
  --timeout-us <n>      SDA silence that abandons a transaction (default: 4000)
  --no-timestamps       Omit the seconds prefix
  --no-baud             Omit the baud estimate
  --json                Write JSON lines instead of text
  -o, --output <file>   Write transactions to a file instead of stdout
  --history <n>         Print the last n transactions to stderr on exit
  --anomalies           Restrict the exit history to annotated transactions
  --config <file>       Settings file (default: <config dir>/i2csniff/config.json)
  --save <file>         demo: also write the generated capture
  -v, --verbose         Session events
  -vv, --debug          Decoder anomalies
  -vvv, --trace         Every emitted record and sampler command
  --log <file>          Write log output to file instead of stderr
";

/// Verbosity level for log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Warnings and errors only
    #[default]
    Quiet = 0,
    Verbose = 1,
    Debug = 2,
    Trace = 3,
}

impl Verbosity {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
            Verbosity::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Listen,
    Replay(PathBuf),
    Demo,
    Ports,
}

#[derive(Debug)]
pub struct AppArgs {
    pub mode: Mode,
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub duration: Option<u64>,
    pub scl: Option<u8>,
    pub sda: Option<u8>,
    pub keep_mode: bool,
    pub timeout_us: Option<u32>,
    pub no_timestamps: bool,
    pub no_baud: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub history: Option<usize>,
    pub anomalies_only: bool,
    pub config: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub verbosity: Verbosity,
    pub log_file: Option<String>,
}

pub fn parse_args() -> anyhow::Result<AppArgs> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);
        std::process::exit(0);
    }

    let subcommand = pargs.subcommand()?;

    let verbosity = if pargs.contains("--trace") || pargs.contains("-vvv") {
        Verbosity::Trace
    } else if pargs.contains("--debug") || pargs.contains("-vv") {
        Verbosity::Debug
    } else if pargs.contains(["-v", "--verbose"]) {
        Verbosity::Verbose
    } else {
        Verbosity::Quiet
    };

    let mut args = AppArgs {
        mode: Mode::Listen,
        port: pargs.opt_value_from_str("--port")?,
        baud_rate: pargs.opt_value_from_str("--baud-rate")?,
        duration: pargs.opt_value_from_str("--duration")?,
        scl: pargs.opt_value_from_str("--scl")?,
        sda: pargs.opt_value_from_str("--sda")?,
        keep_mode: pargs.contains("--keep-mode"),
        timeout_us: pargs.opt_value_from_str("--timeout-us")?,
        no_timestamps: pargs.contains("--no-timestamps"),
        no_baud: pargs.contains("--no-baud"),
        json: pargs.contains("--json"),
        output: pargs.opt_value_from_str(["-o", "--output"])?,
        history: pargs.opt_value_from_str("--history")?,
        anomalies_only: pargs.contains("--anomalies"),
        config: pargs.opt_value_from_str("--config")?,
        save: pargs.opt_value_from_str("--save")?,
        verbosity,
        log_file: pargs.opt_value_from_str("--log")?,
    };

    args.mode = match subcommand.as_deref() {
        None | Some("listen") => Mode::Listen,
        Some("replay") => Mode::Replay(pargs.free_from_str()?),
        Some("demo") => Mode::Demo,
        Some("ports") => Mode::Ports,
        Some(other) => bail!("unknown command {other:?}, see --help"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        eprintln!("Warning: unused arguments left: {:?}.", remaining);
    }

    Ok(args)
}
