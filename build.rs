#![allow(missing_docs)]
use std::error::Error;
use vergen_git2::{Emitter, Git2Builder};

pub fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    // source tarballs come without a git directory, the version string falls back to the crate version then.
    match Git2Builder::default().describe(true, true, None).commit_timestamp(true).build() {
        Ok(git2) => {
            Emitter::default().add_instructions(&git2)?.emit()?;
        }
        Err(e) => println!("cargo:warning=no git version information available: {e}"),
    }
    Ok(())
}
