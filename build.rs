//! Build script that generates `Struct0..Struct12` into `OUT_DIR`.
//!
//! Uses the same renderer as the `generate` subcommand.

#![allow(clippy::expect_used)]

use std::env;
use std::fs;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "src/codegen/render.rs"]
mod render;

fn main() {
    println!("cargo:rerun-if-changed=src/codegen/render.rs");
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let source = render::render_all(render::MAX_STRUCT_ARITY, render::CRATE_TRAIT_PATH);
    fs::write(out_dir.join("structs.rs"), source).expect("write generated structs");
}
