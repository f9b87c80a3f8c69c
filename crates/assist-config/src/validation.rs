use thiserror::Error;

use crate::AssistConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("metadata.metadata_file_names must not be empty when include_additional_metadata is false")]
    NoMetadataFiles,
    #[error("metadata.metadata_file_names[{index}] must be a bare file name, got a path")]
    FileNameIsPath { index: usize },
    #[error("index.background_threads must be at most {max}")]
    TooManyThreads { max: usize },
}

const MAX_BACKGROUND_THREADS: usize = 64;

impl AssistConfig {
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let metadata = &self.metadata;
        if metadata.metadata_file_names.is_empty() && !metadata.include_additional_metadata {
            errors.push(ConfigValidationError::NoMetadataFiles);
        }
        for (index, name) in metadata.metadata_file_names.iter().enumerate() {
            if name.is_empty() || name.contains(['/', '\\']) {
                errors.push(ConfigValidationError::FileNameIsPath { index });
            }
        }

        if self.index.background_threads > MAX_BACKGROUND_THREADS {
            errors.push(ConfigValidationError::TooManyThreads {
                max: MAX_BACKGROUND_THREADS,
            });
        }

        errors
    }
}
