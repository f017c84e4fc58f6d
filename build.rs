//! Build script for newmusic.
//!
//! Copies the `.env.example` configuration template into the user's local
//! data directory so a ready-to-edit example sits next to the place where
//! the application looks for its `.env` file:
//! - Linux: `~/.local/share/newmusic/.env.example`
//! - macOS: `~/Library/Application Support/newmusic/.env.example`
//! - Windows: `%LOCALAPPDATA%/newmusic/.env.example`
//!
//! Nothing here is fatal for the build: a missing template or a read-only
//! data directory only produces a cargo warning.
use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    if !env_example_path.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
        return Ok(());
    }

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("newmusic");

    let copied = fs::create_dir_all(&out_dir).and_then(|_| {
        let contents = fs::read_to_string(&env_example_path)?;
        fs::write(out_dir.join(".env.example"), contents)
    });

    if let Err(e) = copied {
        println!(
            "cargo:warning=cannot copy .env.example to {}: {}",
            out_dir.display(),
            e
        );
    }

    Ok(())
}
