mod config;
mod logger;
mod parse_args;

use anyhow::{bail, Context, Result};
use i2csniff_core::{
    EdgeRecord, ReplaySource, SerialEdgeSource, Sniffer, SnifferConfig, SourceEvent,
    TransactionLog,
};
use i2csniff_decode::{BusScript, Token, Transaction};
use logger::Logger;
use parse_args::{parse_args, AppArgs, Mode};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    let args = parse_args()?;

    let logger = match &args.log_file {
        Some(path) => Logger::file(path, args.verbosity)
            .with_context(|| format!("opening log file {path}"))?,
        None => Logger::stderr(args.verbosity),
    };
    logger.install()?;

    let mut cfg = config::load(args.config.as_deref())?;
    config::apply_args(&mut cfg, &args);

    let mut writer = TransactionWriter::open(args.output.as_deref(), args.json)?;
    let mut history = TransactionLog::new(cfg.history);
    history.set_anomalies_only(args.anomalies_only);

    let mut record = |txn: Transaction| -> Result<()> {
        writer.write(&txn)?;
        history.push(txn);
        Ok(())
    };

    match &args.mode {
        Mode::Ports => {
            list_ports();
            return Ok(());
        }
        Mode::Listen => listen(&cfg, &args, &mut record)?,
        Mode::Replay(path) => replay(ReplaySource::open(path)?, &cfg, &mut record)?,
        Mode::Demo => {
            let records = demo_capture(&cfg);
            if let Some(path) = &args.save {
                save_capture(path, &records)?;
            }
            replay(ReplaySource::from_records(&records), &cfg, &mut record)?;
        }
    }
    writer.flush()?;

    log::info!(
        "{} transactions, {} with anomalies",
        history.total(),
        history.anomalous()
    );
    if args.history.is_some() {
        eprint!("{}", history.to_text(true));
    }
    Ok(())
}

fn list_ports() {
    for p in SerialEdgeSource::list_ports() {
        if let (Some(vid), Some(pid)) = (p.vid, p.pid) {
            println!("{} {} ({:04X}:{:04X})", p.port_name, p.port_type, vid, pid);
        } else {
            println!("{} {}", p.port_name, p.port_type);
        }
    }
}

fn listen(
    cfg: &SnifferConfig,
    args: &AppArgs,
    record: &mut impl FnMut(Transaction) -> Result<()>,
) -> Result<()> {
    let source = SerialEdgeSource::open(cfg.serial.clone())?;
    let sniffer = Sniffer::start(&source, cfg)?;
    let deadline = args.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut opened = false;
    let mut failure = None;

    'session: loop {
        while let Ok(txn) = sniffer.transactions().try_recv() {
            record(txn)?;
        }
        while let Ok(event) = source.events().try_recv() {
            match event {
                SourceEvent::Opened(port) => {
                    opened = true;
                    log::info!("sampler on {port} ready");
                }
                SourceEvent::Error(e) => {
                    log::error!("sampler: {e}");
                    failure = Some(e);
                }
                SourceEvent::Closed => break 'session,
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    for txn in sniffer.cancel() {
        record(txn)?;
    }
    source.close();

    match failure {
        Some(e) if !opened => bail!("sampler link on {} failed: {e}", cfg.serial.port_name),
        _ => Ok(()),
    }
}

fn replay<R: BufRead>(
    mut source: ReplaySource<R>,
    cfg: &SnifferConfig,
    record: &mut impl FnMut(Transaction) -> Result<()>,
) -> Result<()> {
    let sniffer = Sniffer::start(&source, cfg)?;
    let count = source.run()?;
    log::debug!("{count} edge records replayed");
    for txn in sniffer.cancel() {
        record(txn)?;
    }
    Ok(())
}

/// An ADXL345 register write and six-byte read, then a write cut short.
fn demo_capture(cfg: &SnifferConfig) -> Vec<EdgeRecord> {
    BusScript::new(5, 1_000_000)
        .start()
        .byte(0xA6, true)
        .byte(0x32, true)
        .stop()
        .idle(500)
        .start()
        .bytes(&[
            (0xA7, true),
            (0x01, true),
            (0xFF, true),
            (0xF2, true),
            (0xFF, true),
            (0x06, true),
            (0x00, false),
        ])
        .stop()
        .idle(500)
        .start()
        .byte(0xA6, true)
        .bits(true, 3)
        .stop()
        .into_events()
        .iter()
        .map(|e| EdgeRecord::from_event(e, cfg.pin(e.line)))
        .collect()
}

fn save_capture(path: &Path, records: &[EdgeRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "# pin level tick")?;
    for r in records {
        writeln!(w, "{r}")?;
    }
    w.flush()?;
    log::info!("capture written to {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    text: String,
    start_tick: Option<u32>,
    tokens: &'a [Token],
}

/// Writes one transaction per line as text or JSON.
struct TransactionWriter {
    inner: Box<dyn Write>,
    json: bool,
}

impl TransactionWriter {
    fn open(path: Option<&Path>, json: bool) -> Result<Self> {
        let inner: Box<dyn Write> = match path {
            Some(p) => Box::new(BufWriter::new(
                File::create(p).with_context(|| format!("creating {}", p.display()))?,
            )),
            None => Box::new(io::stdout()),
        };
        Ok(Self { inner, json })
    }

    fn write(&mut self, txn: &Transaction) -> Result<()> {
        if self.json {
            let rec = JsonRecord {
                text: txn.text(),
                start_tick: txn.start_tick,
                tokens: &txn.tokens,
            };
            serde_json::to_writer(&mut self.inner, &rec)?;
            self.inner.write_all(b"\n")?;
        } else {
            writeln!(self.inner, "{txn}")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
