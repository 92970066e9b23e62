use std::path::PathBuf;

fn main() {
    let crate_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string()));
    let header = crate_dir.join("include").join("roome_ffi.h");

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("ROOME_FFI_H".to_string()),
        ..Default::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            if let Some(dir) = header.parent() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    println!("cargo:warning=could not create {}: {e}", dir.display());
                    return;
                }
            }
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=could not generate C header: {e}"),
    }
}
