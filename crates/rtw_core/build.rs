// Build script for linking the native ray-tracing engine.
//
// Only active with the `native` feature. The library name defaults to `rt`
// (the engine's exported name) and can be overridden because `librt` clashes
// with the POSIX realtime library on Linux.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RTW_NATIVE_LIB");
    println!("cargo:rerun-if-env-changed=RTW_NATIVE_LIB_DIR");

    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    let lib_name = env::var("RTW_NATIVE_LIB").unwrap_or_else(|_| "rt".to_string());
    println!("cargo:rustc-link-lib=dylib={}", lib_name);

    if let Ok(lib_dir) = env::var("RTW_NATIVE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", lib_dir);
    } else {
        println!("cargo:warning=RTW_NATIVE_LIB_DIR not set, relying on the system linker path for lib{}", lib_name);
    }
}
