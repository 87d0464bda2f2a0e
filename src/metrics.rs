//! Metric sinks.
//!
//! Training and evaluation both emit named scalars at a training step; a
//! [`MetricsLogger`] decides where they go.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Destination for named scalars
pub trait MetricsLogger {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f32)]);

    /// Flush any buffered output.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<L: MetricsLogger + ?Sized> MetricsLogger for Box<L> {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f32)]) {
        (**self).log_scalars(step, scalars)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (**self).flush()
    }
}

/// Prints one line per call to stdout
#[derive(Debug, Default)]
pub struct ConsoleLogger;

impl MetricsLogger for ConsoleLogger {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f32)]) {
        let line = scalars
            .iter()
            .map(|(name, value)| format!("{name}={value:.4}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{step:>8} | {line}");
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}

/// CSV file logger in long format: `step,name,value`
pub struct CsvLogger {
    writer: BufWriter<File>,
}

impl CsvLogger {
    /// Create the file (truncating it) and write the header
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "step,name,value")?;
        Ok(Self { writer })
    }
}

impl MetricsLogger for CsvLogger {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f32)]) {
        for (name, value) in scalars {
            if let Err(err) = writeln!(self.writer, "{step},{name},{value}") {
                log::warn!("failed to write metric {name}: {err}");
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Keeps every record in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryLogger {
    records: Vec<(usize, String, f32)>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(step, name, value)` in arrival order
    pub fn records(&self) -> &[(usize, String, f32)] {
        &self.records
    }

    /// Every `(step, value)` logged under `name`
    pub fn series(&self, name: &str) -> Vec<(usize, f32)> {
        self.records
            .iter()
            .filter(|(_, n, _)| n == name)
            .map(|(step, _, value)| (*step, *value))
            .collect()
    }
}

impl MetricsLogger for MemoryLogger {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f32)]) {
        self.records
            .extend(scalars.iter().map(|(name, value)| (step, name.to_string(), *value)));
    }
}

/// Fans every call out to several loggers
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }
}

impl MetricsLogger for MultiLogger {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f32)]) {
        for logger in &mut self.loggers {
            logger.log_scalars(step, scalars);
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.loggers.iter_mut().try_for_each(|logger| logger.flush())
    }
}
