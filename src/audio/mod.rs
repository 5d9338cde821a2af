pub mod buffer;
pub mod capture;
pub mod constants;
pub mod dump;
pub mod pipeline;
pub mod transform;

pub use buffer::{BufferQueue, PcmBuffer};
pub use capture::ToneCapture;
pub use dump::PcmDump;
pub use pipeline::{PipelineSpec, PipelineStats, QueueSnapshot, SsrPipeline};
pub use transform::{
    BuiltinTransforms, DynamicRangeProcessor, SurroundProcessor, TransformProvider,
    TransformSpec, UnavailableTransforms,
};
