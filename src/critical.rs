//! Criticality Classifier.
//!
//! A process is critical when its name is on the configured deny-list. Names
//! that normally run several instances per session lose that status while
//! more than one instance is running, since killing one of them is
//! survivable. If the instance count cannot be read, the process stays
//! critical.

use crate::config::Config;
use crate::host::Host;
use tracing::{debug, warn};

/// Decides whether a lock owner may be terminated.
pub struct CriticalityClassifier<'a> {
    config: &'a Config,
    host: &'a dyn Host,
}

impl<'a> CriticalityClassifier<'a> {
    pub fn new(config: &'a Config, host: &'a dyn Host) -> Self {
        Self { config, host }
    }

    /// Whether terminating `process_name` would risk the OS session.
    pub fn is_critical(&self, process_name: &str, pid: u32) -> bool {
        if !contains_name(&self.config.critical_processes, process_name) {
            return false;
        }

        if !contains_name(&self.config.multi_instance_processes, process_name) {
            return true;
        }

        match self.host.instance_count(process_name) {
            Ok(count) if count > 1 => {
                debug!(process = process_name, pid, count, "multiple instances running; not critical");
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(process = process_name, pid, error = %e, "instance count unavailable; treating as critical");
                true
            }
        }
    }
}

fn contains_name(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}
