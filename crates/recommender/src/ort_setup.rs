//! Поиск динамической библиотеки ONNX Runtime (`ort` собран с `load-dynamic`).

use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{info, warn};

#[cfg(target_os = "windows")]
const LIB_NAME: &str = "onnxruntime.dll";
#[cfg(target_os = "linux")]
const LIB_NAME: &str = "libonnxruntime.so";
#[cfg(target_os = "macos")]
const LIB_NAME: &str = "libonnxruntime.dylib";

static CONFIGURE: Once = Once::new();

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(dir) = std::env::var("ORT_DIR") {
        paths.push(Path::new(&dir).join("lib").join(LIB_NAME));
        paths.push(Path::new(&dir).join(LIB_NAME));
    }

    // Repo-local install location
    paths.push(Path::new("scripts/onnxruntime/lib").join(LIB_NAME));
    paths.push(Path::new("../scripts/onnxruntime/lib").join(LIB_NAME));

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        paths.push(Path::new("/usr/local/lib").join(LIB_NAME));
        paths.push(Path::new("/usr/lib").join(LIB_NAME));
        paths.push(Path::new("/opt/onnxruntime/lib").join(LIB_NAME));
    }

    // Рядом с исполняемым файлом
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.join(LIB_NAME));
            paths.push(dir.join("onnxruntime").join("lib").join(LIB_NAME));
        }
    }

    paths
}

/// Sets `ORT_DYLIB_PATH` once per process if it is not already set
pub fn configure_ort_env() {
    CONFIGURE.call_once(|| {
        if let Ok(path) = std::env::var("ORT_DYLIB_PATH") {
            info!(target: "recommender::ort_setup", "Using ORT_DYLIB_PATH={}", path);
            return;
        }

        match candidate_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                std::env::set_var("ORT_DYLIB_PATH", &path);
                info!(target: "recommender::ort_setup", "ONNX Runtime set: ORT_DYLIB_PATH={}", path.display());
            }
            None => {
                warn!(
                    target: "recommender::ort_setup",
                    "ONNX Runtime library not found. Set ORT_DYLIB_PATH or ORT_DIR if session creation fails."
                );
            }
        }
    });
}
