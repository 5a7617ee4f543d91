use std::path::PathBuf;

use crate::io::workspace::init_workspace;

/// Create `autolabel/` under the given directory (default: cwd)
pub fn cmd_init(dir: Option<&str>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let root = match dir {
        Some(d) => PathBuf::from(d),
        None => std::env::current_dir()?,
    };
    let workspace = init_workspace(&root)?;
    tracing::info!(dir = %workspace.dir.display(), "workspace created");

    if json {
        println!(
            "{}",
            serde_json::json!({ "workspace": workspace.dir.display().to_string() })
        );
    } else {
        println!("Initialized autolabel workspace in {}", workspace.dir.display());
        println!("Put your task snapshot in {}", workspace.snapshot_path().display());
    }
    Ok(())
}
