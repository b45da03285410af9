use std::io::ErrorKind;

use crate::config::Layout;
use crate::error::{BuildError, Result};

/// Delete the whole output tree. A missing tree is not an error.
pub fn clean(layout: &Layout) -> Result<()> {
    let output = layout.output_dir();
    match std::fs::remove_dir_all(&output) {
        Ok(()) => {
            tracing::debug!("Removed {}", output.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(output, e)),
    }
}
