use crate::record::EdgeRecord;
use crate::source::{EdgeCallback, EdgeDispatcher, EdgeSource, Watch};
use crate::{Result, SnifferError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use serialport::SerialPortInfo;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::Duration;

/// Longest line accepted from the sampler before it is discarded.
const MAX_LINE: usize = 256;

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (port_type, vid, pid, serial_number, manufacturer, product) = match &info.port_type {
            serialport::SerialPortType::UsbPort(usb) => (
                "USB".to_string(),
                Some(usb.vid),
                Some(usb.pid),
                usb.serial_number.clone(),
                usb.manufacturer.clone(),
                usb.product.clone(),
            ),
            serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None, None),
            serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None, None, None, None, None),
            serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None, None, None, None),
        };
        Self {
            port_name: info.port_name,
            port_type,
            vid,
            pid,
            serial_number,
            manufacturer,
            product,
        }
    }
}

/// Link settings for the edge sampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 115_200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Opened(String),
    Closed,
    Error(String),
}

enum Command {
    Send(Vec<u8>),
    Close,
}

/// Edge sampler attached over a serial port.
///
/// A reader thread owns the port. It forwards host commands
/// (`mode <pin> in`, `watch <pin>`, `unwatch <pin>`) and turns each
/// received line into an [`EdgeRecord`] for the dispatcher.
pub struct SerialEdgeSource {
    cfg: SerialConfig,
    tx_cmd: Sender<Command>,
    rx_evt: Receiver<SourceEvent>,
    dispatcher: Arc<EdgeDispatcher>,
}

impl SerialEdgeSource {
    pub fn list_ports() -> Vec<PortInfo> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(PortInfo::from)
            .collect()
    }

    /// Start the reader thread. Open failures arrive as
    /// [`SourceEvent::Error`] followed by [`SourceEvent::Closed`].
    pub fn open(cfg: SerialConfig) -> Result<Self> {
        if cfg.port_name.is_empty() {
            return Err(SnifferError::Config("no serial port given".into()));
        }
        let (tx_cmd, rx_cmd) = unbounded::<Command>();
        let (tx_evt, rx_evt) = unbounded::<SourceEvent>();
        let dispatcher = EdgeDispatcher::new();
        let cfg_clone = cfg.clone();
        let thread_dispatcher = dispatcher.clone();

        std::thread::Builder::new()
            .name("edge-sampler".into())
            .spawn(move || {
                match serialport::new(&cfg_clone.port_name, cfg_clone.baud_rate)
                    .timeout(Duration::from_millis(50))
                    .open()
                {
                    Ok(mut port) => {
                        log::info!("opened {} at {} baud", cfg_clone.port_name, cfg_clone.baud_rate);
                        let _ = tx_evt.send(SourceEvent::Opened(cfg_clone.port_name.clone()));
                        let mut buf = [0u8; 4096];
                        let mut lines = LineSplitter::default();
                        loop {
                            match read_step(port.read(&mut buf)) {
                                ReadStep::Data(n) => {
                                    for line in lines.feed(&buf[..n]) {
                                        dispatch_line(&thread_dispatcher, &line);
                                    }
                                }
                                ReadStep::Idle => {}
                                ReadStep::Failed(e) => {
                                    log::error!("read from {} failed: {e}", cfg_clone.port_name);
                                    let _ = tx_evt.send(SourceEvent::Error(e));
                                    let _ = tx_evt.send(SourceEvent::Closed);
                                    return;
                                }
                            }
                            while let Ok(cmd) = rx_cmd.try_recv() {
                                match cmd {
                                    Command::Send(data) => {
                                        if let Err(e) = port.write_all(&data) {
                                            let _ = tx_evt.send(SourceEvent::Error(e.to_string()));
                                        }
                                    }
                                    Command::Close => {
                                        log::info!("closing {}", cfg_clone.port_name);
                                        let _ = tx_evt.send(SourceEvent::Closed);
                                        return;
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        log::error!("open {} failed: {e}", cfg_clone.port_name);
                        let _ = tx_evt.send(SourceEvent::Error(format!("open failed: {e}")));
                        let _ = tx_evt.send(SourceEvent::Closed);
                    }
                }
            })?;

        Ok(Self { cfg, tx_cmd, rx_evt, dispatcher })
    }

    fn command(&self, text: String) -> Result<()> {
        log::trace!("-> {text}");
        let mut data = text.into_bytes();
        data.push(b'\n');
        self.tx_cmd.send(Command::Send(data)).map_err(|_| SnifferError::Closed)
    }

    pub fn close(&self) {
        let _ = self.tx_cmd.send(Command::Close);
    }

    pub fn events(&self) -> &Receiver<SourceEvent> {
        &self.rx_evt
    }

    pub fn config(&self) -> &SerialConfig {
        &self.cfg
    }
}

impl EdgeSource for SerialEdgeSource {
    fn set_input(&self, pin: u8) -> Result<()> {
        self.command(format!("mode {pin} in"))
    }

    fn watch(&self, pin: u8, callback: EdgeCallback) -> Result<Watch> {
        self.command(format!("watch {pin}"))?;
        let tx_cmd = self.tx_cmd.clone();
        Ok(self.dispatcher.register(pin, callback).on_cancel(move || {
            log::trace!("-> unwatch {pin}");
            let _ = tx_cmd.send(Command::Send(format!("unwatch {pin}\n").into_bytes()));
        }))
    }
}

impl Drop for SerialEdgeSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// What the reader loop does with one `read` result.
#[derive(Debug, PartialEq)]
enum ReadStep {
    Data(usize),
    Idle,
    Failed(String),
}

/// A zero-byte read means the device went away; the port timeout reports
/// an idle line as `TimedOut`.
fn read_step(result: std::io::Result<usize>) -> ReadStep {
    match result {
        Ok(0) => ReadStep::Failed("sampler disconnected".into()),
        Ok(n) => ReadStep::Data(n),
        Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => ReadStep::Idle,
        Err(e) => ReadStep::Failed(e.to_string()),
    }
}

fn dispatch_line(dispatcher: &EdgeDispatcher, line: &str) {
    match EdgeRecord::parse_line(line) {
        Ok(Some(record)) => {
            dispatcher.dispatch(&record);
        }
        Ok(None) => {}
        Err(reason) => log::warn!("dropping sampler line {line:?}: {reason}"),
    }
}

/// Reassembles newline-terminated lines from arbitrary read chunks.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn feed(&mut self, data: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(data);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        if self.pending.len() > MAX_LINE {
            log::warn!("discarding {} bytes without newline", self.pending.len());
            self.pending.clear();
        }
        lines
    }
}
