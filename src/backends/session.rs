//! ONNX Runtime session construction.
//!
//! All three neural components (detector, recognizer, orientation
//! classifier) build their sessions here so threading, optimization and
//! execution-provider selection behave identically across them.

use crate::core::{OCRError, OrtGraphOptimizationLevel, OrtSessionConfig, ResolvedAcceleration};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use std::path::Path;
use tracing::debug;

/// Builds an ONNX Runtime session for the model at `path`.
///
/// # Arguments
///
/// * `path` - Path to the `.onnx` model file.
/// * `acceleration` - The resolved execution-provider choice.
/// * `config` - Optional threading and optimization settings.
///
/// # Errors
///
/// Returns [`OCRError::ModelLoad`] when the file cannot be read or the
/// session cannot be constructed (including a CUDA request in a build
/// without the `cuda` feature).
pub(crate) fn build_session(
    path: &Path,
    acceleration: ResolvedAcceleration,
    config: Option<&OrtSessionConfig>,
) -> Result<Session, OCRError> {
    debug!(path = %path.display(), ?acceleration, "building onnx session");

    let providers = execution_providers(acceleration).map_err(|e| {
        OCRError::model_load(path, "execution provider selection failed", Some(e))
    })?;

    Session::builder()
        .and_then(|builder| apply_session_config(builder, config))
        .and_then(|builder| builder.with_execution_providers(providers))
        .and_then(|builder| builder.commit_from_file(path))
        .map_err(|e| OCRError::model_load(path, "failed to create session from file", Some(e)))
}

fn apply_session_config(
    mut builder: SessionBuilder,
    config: Option<&OrtSessionConfig>,
) -> Result<SessionBuilder, ort::Error> {
    let Some(config) = config else {
        return Ok(builder);
    };
    if let Some(threads) = config.intra_threads {
        builder = builder.with_intra_threads(threads)?;
    }
    if let Some(threads) = config.inter_threads {
        builder = builder.with_inter_threads(threads)?;
    }
    if let Some(level) = config.optimization_level {
        let level = match level {
            OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
            OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        };
        builder = builder.with_optimization_level(level)?;
    }
    Ok(builder)
}

#[cfg(feature = "cuda")]
fn execution_providers(
    acceleration: ResolvedAcceleration,
) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
    use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
    match acceleration {
        ResolvedAcceleration::Cpu => Ok(vec![CPUExecutionProvider::default().build()]),
        ResolvedAcceleration::Cuda { device_id } => Ok(vec![
            CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
            // CPU stays registered so unsupported nodes still execute.
            CPUExecutionProvider::default().build(),
        ]),
    }
}

#[cfg(not(feature = "cuda"))]
fn execution_providers(
    acceleration: ResolvedAcceleration,
) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
    use ort::execution_providers::CPUExecutionProvider;
    match acceleration {
        ResolvedAcceleration::Cpu => Ok(vec![CPUExecutionProvider::default().build()]),
        ResolvedAcceleration::Cuda { .. } => Err(ort::Error::new(
            "CUDA acceleration requested but this build does not include the 'cuda' feature",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_a_model_load_error() {
        let err = build_session(
            Path::new("/nonexistent/model.onnx"),
            ResolvedAcceleration::Cpu,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, OCRError::ModelLoad { .. }));
        assert!(err.to_string().contains("/nonexistent/model.onnx"));
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn cuda_without_the_feature_is_rejected() {
        let err = build_session(
            Path::new("/nonexistent/model.onnx"),
            ResolvedAcceleration::Cuda { device_id: 0 },
            None,
        )
        .unwrap_err();
        let source = std::error::Error::source(&err).expect("provider error retained");
        assert!(source.to_string().contains("cuda"));
    }
}
