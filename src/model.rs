use crate::preprocess::ImageTensor;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "tensorflow")]
    #[error("tensorflow: {0}")]
    Tensorflow(#[from] tensorflow::Status),
    #[error("operation `{0}` not found in graph")]
    MissingOperation(String),
    #[error("model produced no output")]
    EmptyOutput,
}

/// Opaque classifier: one normalized image in, one score per label out.
pub trait InferenceEngine: Send + Sync {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

#[cfg(feature = "tensorflow")]
pub use self::tf::TfEngine;

#[cfg(feature = "tensorflow")]
mod tf {
    use std::fs::File;
    use std::io::Read;
    use std::path::Path;

    use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};
    use tracing::{debug, info};

    use super::{InferenceEngine, InferenceError};
    use crate::preprocess::ImageTensor;

    /// Frozen TensorFlow graph with a single image input and a softmax output.
    pub struct TfEngine {
        session: Session,
        graph: Graph,
        input_op: String,
        output_op: String,
    }

    impl TfEngine {
        pub fn load(
            model_path: &Path,
            input_op: &str,
            output_op: &str,
        ) -> Result<Self, InferenceError> {
            let mut graph = Graph::new();
            let mut model_file = File::open(model_path)?;
            let mut model_bytes = Vec::new();
            model_file.read_to_end(&mut model_bytes)?;

            graph.import_graph_def(&model_bytes, &ImportGraphDefOptions::new())?;

            let session = Session::new(&SessionOptions::new(), &graph)?;

            let engine = TfEngine {
                session,
                graph,
                input_op: input_op.to_string(),
                output_op: output_op.to_string(),
            };

            // fail at startup rather than on the first request
            engine.operation(&engine.input_op)?;
            engine.operation(&engine.output_op)?;

            info!(path = %model_path.display(), "model graph loaded");
            Ok(engine)
        }

        fn operation(&self, name: &str) -> Result<tensorflow::Operation, InferenceError> {
            self.graph
                .operation_by_name(name)?
                .ok_or_else(|| InferenceError::MissingOperation(name.to_string()))
        }
    }

    impl InferenceEngine for TfEngine {
        fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            let mut input_tensor = Tensor::<f32>::new(&input.dims());
            input_tensor.copy_from_slice(&input.data);

            let input_operation = self.operation(&self.input_op)?;
            let output_operation = self.operation(&self.output_op)?;

            let mut args = SessionRunArgs::new();
            args.add_feed(&input_operation, 0, &input_tensor);
            let output_token = args.request_fetch(&output_operation, 0);
            self.session.run(&mut args)?;

            let output_tensor: Tensor<f32> = args.fetch(output_token)?;
            // first row of a [1, classes] batch
            let classes = output_tensor.dims().last().copied().unwrap_or(0) as usize;
            if classes == 0 || output_tensor.len() < classes {
                return Err(InferenceError::EmptyOutput);
            }
            debug!(classes, "inference complete");

            Ok(output_tensor[..classes].to_vec())
        }
    }
}
