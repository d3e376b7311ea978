use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::sync::{Mutex, OnceLock, mpsc};
use std::thread;

use crate::error::Result;

/// Each event consists of a set of key-value-pairs with the measured data or some meta data of the event.
/// This enum specifies all allowed key values and thus the column in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatParameter {
    /// Simulated time of the event.
    Time,

    /// "SCHEDULED", "FINISHED", "PREEMPTED", "CLEANUP_CREATED" or "CONTROLLER_SAMPLE"
    Event,

    /// Id of the task concerned
    TaskName,

    /// Compute resource concerned
    ResourceName,

    /// Disk controller signal of the tick
    DiskControllerInput,

    /// Bytes in use on the shared storage
    SharedStorageUsed,

    /// Size of the files a cleanup task removes
    CleanupSize,

    /// Tasks not completed yet
    NumberOfPendingTasks,

    /// Tasks waiting in the admission queue
    QueueLength,
}

impl StatParameter {
    /// All columns in the defined order of the CSV header.
    pub const ALL: [StatParameter; 9] = [
        StatParameter::Time,
        StatParameter::Event,
        StatParameter::TaskName,
        StatParameter::ResourceName,
        StatParameter::DiskControllerInput,
        StatParameter::SharedStorageUsed,
        StatParameter::CleanupSize,
        StatParameter::NumberOfPendingTasks,
        StatParameter::QueueLength,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            StatParameter::Time => "Time",
            StatParameter::Event => "Event",
            StatParameter::TaskName => "TaskName",
            StatParameter::ResourceName => "ResourceName",
            StatParameter::DiskControllerInput => "DiskControllerInput",
            StatParameter::SharedStorageUsed => "SharedStorageUsed",
            StatParameter::CleanupSize => "CleanupSize",
            StatParameter::NumberOfPendingTasks => "NumberOfPendingTasks",
            StatParameter::QueueLength => "QueueLength",
        }
    }

    pub fn headers() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.header()).collect()
    }
}

/// store values in their native format, only format them when writing to the CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl StatValue {
    fn to_cell(&self) -> String {
        match self {
            StatValue::Text(t) => t.clone(),
            StatValue::Integer(i) => i.to_string(),
            StatValue::Float(f) => f.to_string(),
            StatValue::Bool(b) => b.to_string(),
        }
    }
}

// Automatic conversion helpers
impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Integer(v)
    }
}

impl From<usize> for StatValue {
    fn from(v: usize) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Bool(v)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticEvent {
    data: HashMap<StatParameter, StatValue>,
}

impl StatisticEvent {
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    pub fn set<V: Into<StatValue>>(&mut self, param: StatParameter, value: V) -> &mut Self {
        self.data.insert(param, value.into());
        self
    }

    pub fn get(&self, param: StatParameter) -> Option<&StatValue> {
        self.data.get(&param)
    }

    /// One CSV row in header order, missing values are written as `NA`.
    pub fn to_row(&self) -> Vec<String> {
        StatParameter::ALL.iter().map(|p| self.data.get(p).map(StatValue::to_cell).unwrap_or_else(|| "NA".to_string())).collect()
    }
}

/// Messages sent from the simulation to the writer thread.
enum StatsMessage {
    Log(StatisticEvent),
    Shutdown,
}

/// Handle that allows the simulation to log events.
/// It holds the "Sender" side of the channel.
pub struct StatsCollector {
    sender: mpsc::Sender<StatsMessage>,
    worker: Option<thread::JoinHandle<()>>,
}

impl StatsCollector {
    /// Initialize the statistics system. The output file is created up front, the
    /// writing itself happens on a background thread.
    pub fn init(filename: Option<&str>) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match filename {
            Some(f) => Box::new(File::create(f)?),
            None => Box::new(io::stdout()),
        };

        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            Self::worker_loop(rx, writer);
        });

        Ok(StatsCollector { sender: tx, worker: Some(worker) })
    }

    fn worker_loop(rx: mpsc::Receiver<StatsMessage>, writer: Box<dyn Write + Send>) {
        let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);

        if let Err(e) = csv_wtr.write_record(StatParameter::headers()) {
            log::error!("Stats Error: Failed to write headers: {}", e);
        }

        for msg in rx {
            match msg {
                StatsMessage::Log(event) => {
                    if let Err(e) = csv_wtr.write_record(event.to_row()) {
                        log::error!("Stats Error: Failed to write record: {}", e);
                    }
                }
                StatsMessage::Shutdown => break,
            }
        }

        if let Err(e) = csv_wtr.flush() {
            log::error!("Stats Error: Failed to flush statistics: {}", e);
        }
    }

    /// Non-blocking, just sends a message.
    pub fn add_event(&self, event: StatisticEvent) {
        // The writer thread only stops on shutdown.
        let _ = self.sender.send(StatsMessage::Log(event));
    }

    /// Flushes all pending rows and waits for the writer thread.
    pub fn shutdown(&mut self) {
        let _ = self.sender.send(StatsMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Stats Error: Writer thread panicked.");
            }
        }
    }
}

static GLOBAL_STATS: OnceLock<Mutex<StatsCollector>> = OnceLock::new();

/// Initialize the global statistics collector.
pub fn init_global(filename: Option<&str>) -> Result<()> {
    let collector = StatsCollector::init(filename)?;
    if GLOBAL_STATS.set(Mutex::new(collector)).is_err() {
        log::warn!("Statistics collector was already initialized.");
    }
    Ok(())
}

/// Logs an event to the global collector. Without a collector, statistics are
/// disabled and the event is dropped.
pub fn add_global_event(event: StatisticEvent) {
    if let Some(collector) = GLOBAL_STATS.get() {
        if let Ok(collector) = collector.lock() {
            collector.add_event(event);
        }
    }
}

/// Flushes the global collector, if any.
pub fn shutdown_global() {
    if let Some(collector) = GLOBAL_STATS.get() {
        if let Ok(mut collector) = collector.lock() {
            collector.shutdown();
        }
    }
}
