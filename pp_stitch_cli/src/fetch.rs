//! Bulk staging of archived files through an external fetch command.
//!
//! The archive keeps timeseries files on tape; before opening them they must
//! be staged with a site command such as `dmget`. One invocation is issued
//! per containing directory, and any non-zero exit status aborts the run.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

pub fn stage_files(command: &str, files: &[PathBuf]) -> Result<()> {
    let mut by_dir: BTreeMap<PathBuf, Vec<OsString>> = BTreeMap::new();
    for file in files {
        let dir = file.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
        let name = file
            .file_name()
            .ok_or_else(|| anyhow!("cannot stage path without a filename: {}", file.display()))?;
        by_dir.entry(dir).or_default().push(name.to_os_string());
    }

    for (dir, names) in by_dir {
        debug!("staging {} files from {}", names.len(), dir.display());
        let status = Command::new(command)
            .arg("-v")
            .arg("-d")
            .arg(&dir)
            .args(&names)
            .status()
            .with_context(|| format!("failed to run '{}'", command))?;
        if !status.success() {
            return Err(anyhow!(
                "'{}' exited with {} while staging {}",
                command,
                status,
                dir.display()
            ));
        }
    }
    Ok(())
}
