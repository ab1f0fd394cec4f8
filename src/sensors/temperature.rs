//! CPU temperature sensing.
//!
//! [`SysfsThermalZone`] reads a Linux thermal zone (`temp` holds
//! millidegrees Celsius).  [`TemperatureSampler`] drives any
//! [`ThermalSource`] once per sample tick and feeds the store.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::app::events::SupervisorEvent;
use crate::app::ports::{EventSink, ThermalSource};
use crate::error::{Error, HealthFault, Result};
use crate::health::{HealthChange, HealthMonitor};
use crate::store::AttributeStore;

/// Longest reading accepted from the `temp` file.
const READING_MAX: usize = 24;

/// Thermal zone exposed through sysfs.
///
/// The `temp` file stays open between samples and is re-read from offset 0,
/// so a sample costs one `pread`.  Any failure closes it; the next sample
/// opens it again.
#[derive(Debug)]
pub struct SysfsThermalZone {
    path: PathBuf,
    file: Option<File>,
}

impl SysfsThermalZone {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let file = match &mut self.file {
            Some(file) => file,
            slot => slot.insert(File::open(&self.path)?),
        };
        file.read_at(buf, 0)
    }
}

impl ThermalSource for SysfsThermalZone {
    fn read_cpu_temperature(&mut self) -> Result<i32> {
        let mut buf = [0u8; READING_MAX];
        let reading = self
            .read_raw(&mut buf)
            .map_err(|e| {
                debug!("Thermal: read {} failed: {}", self.path.display(), e);
                Error::ThermalSourceUnavailable
            })
            .and_then(|n| {
                let raw = core::str::from_utf8(&buf[..n]).unwrap_or("").trim();
                let millidegrees: i64 = raw.parse().map_err(|_| {
                    debug!("Thermal: unparsable reading {:?}", raw);
                    Error::ThermalSourceUnavailable
                })?;
                i32::try_from(millidegrees / 1000).map_err(|_| Error::ThermalSourceUnavailable)
            });
        if reading.is_err() {
            self.file = None;
        }
        reading
    }
}

/// Periodic temperature sampler.
pub struct TemperatureSampler<T: ThermalSource> {
    source: T,
}

impl<T: ThermalSource> TemperatureSampler<T> {
    pub fn new(source: T) -> Self {
        Self { source }
    }

    /// Read once and update the store.
    ///
    /// On failure the previous temperature is kept and the failure is
    /// counted against [`HealthFault::ThermalDegraded`].
    pub fn tick(
        &mut self,
        store: &AttributeStore,
        health: &HealthMonitor,
        sink: &mut impl EventSink,
    ) -> Option<i32> {
        match self.source.read_cpu_temperature() {
            Ok(celsius) => {
                store.record_temperature(celsius);
                sink.emit(&SupervisorEvent::TemperatureSampled(celsius));
                if let Some(HealthChange::Cleared(fault)) =
                    health.record_success(HealthFault::ThermalDegraded)
                {
                    sink.emit(&SupervisorEvent::Recovered(fault));
                }
                Some(celsius)
            }
            Err(e) => {
                let retained = store.temperature();
                warn!("Sampler: {} (keeping {}°C)", e, retained);
                sink.emit(&SupervisorEvent::ThermalUnavailable { retained });
                if let Some(HealthChange::Raised(fault)) =
                    health.record_failure(HealthFault::ThermalDegraded)
                {
                    sink.emit(&SupervisorEvent::Degraded(fault));
                }
                None
            }
        }
    }

    pub fn source(&self) -> &T {
        &self.source
    }
}
