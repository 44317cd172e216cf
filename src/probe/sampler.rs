//! Directory Sampler and Directory Sweep.
//!
//! Large trees are not probed file by file: a uniform random sample of at
//! most `large_directory_threshold` files is checked with the exclusive-access
//! probe, stopping after `sample_lock_limit` locked files. Only those files
//! are handed to the tool. Smaller trees the tool reports as free are swept
//! completely.

use super::LockProber;
use crate::error::Result;
use crate::model::{LockOwner, Reporter};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Every regular file under `dir`, depth-first in file-name order.
pub(crate) fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Owner list deduplicated by `(pid, process_name)`.
///
/// Placeholders are kept once per file since they carry no identity.
#[derive(Default)]
struct OwnerSet {
    owners: Vec<LockOwner>,
    seen: HashSet<(u32, String, Option<PathBuf>)>,
}

impl OwnerSet {
    fn push(&mut self, owner: LockOwner) {
        let path = owner.is_placeholder().then(|| owner.file_path.clone());
        if self
            .seen
            .insert((owner.pid, owner.process_name.clone(), path))
        {
            self.owners.push(owner);
        }
    }

    fn extend(&mut self, owners: Vec<LockOwner>) {
        for owner in owners {
            self.push(owner);
        }
    }

    fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl LockProber<'_> {
    pub(super) fn sample_directory(
        &self,
        dir: &Path,
        files: Vec<PathBuf>,
        reporter: &mut Reporter,
    ) -> Result<Vec<LockOwner>> {
        let limit = self.config.large_directory_threshold;
        let total_files = files.len();
        let sample: Vec<PathBuf> = if files.len() > limit {
            files
                .choose_multiple(&mut rand::thread_rng(), limit)
                .cloned()
                .collect()
        } else {
            files
        };
        info!(
            path = %dir.display(),
            files = total_files,
            sampled = sample.len(),
            "sampling large directory"
        );

        let mut locked = Vec::new();
        for (index, file) in sample.iter().enumerate() {
            reporter.checkpoint()?;
            if self.host.probe_exclusive(file) {
                debug!(path = %file.display(), "sampled file is locked");
                locked.push(file.clone());
            }
            reporter.report(index + 1, sample.len())?;
            if locked.len() >= self.config.sample_lock_limit {
                break;
            }
        }

        if locked.is_empty() {
            debug!("no locked files in sample; probing the directory itself");
            return Ok(self.query(dir.as_os_str(), dir)?.owners);
        }

        let mut owners = OwnerSet::default();
        for file in &locked {
            reporter.checkpoint()?;
            owners.extend(self.query(file.as_os_str(), file)?.owners);
        }
        if owners.is_empty() {
            owners.push(LockOwner::placeholder(&locked[0]));
        }
        Ok(owners.owners)
    }

    pub(super) fn sweep_directory(
        &self,
        files: Vec<PathBuf>,
        reporter: &mut Reporter,
    ) -> Result<Vec<LockOwner>> {
        let total = files.len();
        let mut owners = OwnerSet::default();

        for (index, file) in files.iter().enumerate() {
            reporter.checkpoint()?;
            if self.host.probe_exclusive(file) {
                let found = self.query(file.as_os_str(), file)?.owners;
                if found.is_empty() {
                    owners.push(LockOwner::placeholder(file));
                } else {
                    owners.extend(found);
                }
            }
            reporter.report(index + 1, total)?;
        }

        Ok(owners.owners)
    }
}
