pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod subtitle;
pub mod translate;

pub use config::{load_vocabulary, Config};
pub use error::{Result, SubtransError};
pub use pipeline::{
    print_summary, translate_file, translate_files, PipelineConfig, PipelineResult, PipelineStats,
};
pub use progress::{BarReporter, LogReporter, ProgressEvent, ProgressReporter, Stage};
pub use subtitle::Subtitle;
pub use translate::{GroupTranslator, OpenAiTranslator, Translator};
