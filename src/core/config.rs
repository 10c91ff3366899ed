//! Runtime configuration for engine construction.
//!
//! Hardware acceleration is explicit startup configuration handed to the
//! engine factory. Constructing an engine never mutates process-global
//! state (no environment variables, no global thread settings), so the
//! order in which engines are built in one process carries no surprises.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

impl Default for OrtGraphOptimizationLevel {
    fn default() -> Self {
        Self::Level1
    }
}

/// Configuration for ONNX Runtime sessions.
///
/// Threading and optimization settings applied to every session a neural
/// engine builds. Execution providers are chosen separately through
/// [`AccelerationPolicy`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes.
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes.
    pub inter_threads: Option<usize>,
    /// Graph optimization level.
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }
}

/// Hardware acceleration policy for the neural engines.
///
/// `Auto` probes accelerator availability once, at engine construction;
/// per-call extraction never re-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelerationPolicy {
    /// Use an accelerator when one is available, otherwise CPU.
    #[default]
    Auto,
    /// Force CPU execution.
    Cpu,
    /// Request CUDA on the given device; engine construction fails (or
    /// falls back, where the engine defines a fallback) when unavailable.
    Cuda {
        /// CUDA device ID.
        device_id: i32,
    },
}

/// The acceleration decision resolved from an [`AccelerationPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAcceleration {
    /// CPU-only session.
    Cpu,
    /// CUDA session on the given device.
    Cuda {
        /// CUDA device ID.
        device_id: i32,
    },
}

impl AccelerationPolicy {
    /// Resolves the policy against the accelerators this build can reach.
    ///
    /// `Auto` returns CUDA when the crate was built with the `cuda` feature
    /// and the provider reports itself available, CPU otherwise.
    pub fn resolve(&self) -> ResolvedAcceleration {
        match self {
            AccelerationPolicy::Cpu => ResolvedAcceleration::Cpu,
            AccelerationPolicy::Cuda { device_id } => ResolvedAcceleration::Cuda {
                device_id: *device_id,
            },
            AccelerationPolicy::Auto => {
                if cuda_available() {
                    tracing::debug!("acceleration auto-detect: CUDA available");
                    ResolvedAcceleration::Cuda { device_id: 0 }
                } else {
                    tracing::debug!("acceleration auto-detect: falling back to CPU");
                    ResolvedAcceleration::Cpu
                }
            }
        }
    }
}

#[cfg(feature = "cuda")]
fn cuda_available() -> bool {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
    CUDAExecutionProvider::default()
        .is_available()
        .unwrap_or(false)
}

#[cfg(not(feature = "cuda"))]
fn cuda_available() -> bool {
    false
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_allow_download() -> bool {
    true
}

/// Configuration passed to the engine factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Acceleration policy for the neural engines.
    #[serde(default)]
    pub acceleration: AccelerationPolicy,
    /// Directory where ONNX models and dictionaries are cached.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// Whether missing model artifacts may be fetched from their remote
    /// sources. When false, a missing artifact is a model-load error.
    #[serde(default = "default_allow_download")]
    pub allow_download: bool,
    /// Path to the Tesseract data directory (`None` uses the system default).
    #[serde(default)]
    pub tessdata_path: Option<String>,
    /// Session settings applied to every ONNX session.
    #[serde(default)]
    pub ort_session: Option<OrtSessionConfig>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            acceleration: AccelerationPolicy::default(),
            model_dir: default_model_dir(),
            allow_download: default_allow_download(),
            tessdata_path: None,
            ort_session: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_from_partial_json() {
        let config: OcrConfig = serde_json::from_str(
            r#"{
                "acceleration": "cpu",
                "model_dir": "/var/cache/arfr-ocr"
            }"#,
        )
        .expect("valid config");
        assert_eq!(config.acceleration, AccelerationPolicy::Cpu);
        assert_eq!(config.model_dir, PathBuf::from("/var/cache/arfr-ocr"));
        assert!(config.allow_download);
        assert!(config.tessdata_path.is_none());
    }

    #[test]
    fn cpu_policy_resolves_to_cpu() {
        assert_eq!(
            AccelerationPolicy::Cpu.resolve(),
            ResolvedAcceleration::Cpu
        );
    }

    #[test]
    fn explicit_cuda_policy_is_honored_without_probing() {
        assert_eq!(
            AccelerationPolicy::Cuda { device_id: 1 }.resolve(),
            ResolvedAcceleration::Cuda { device_id: 1 }
        );
    }

    #[test]
    fn session_config_builder_chains() {
        let cfg = OrtSessionConfig::new()
            .with_intra_threads(2)
            .with_inter_threads(1);
        assert_eq!(cfg.intra_threads, Some(2));
        assert_eq!(cfg.inter_threads, Some(1));
    }
}
