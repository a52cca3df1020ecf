use serde::{Deserialize, Serialize};

use crate::job::JobStatus;

/// One of the five pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    Images,
    Writing,
    Meta,
    Thumbnail,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Research,
        Stage::Images,
        Stage::Writing,
        Stage::Meta,
        Stage::Thumbnail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Images => "images",
            Stage::Writing => "writing",
            Stage::Meta => "meta",
            Stage::Thumbnail => "thumbnail",
        }
    }

    /// Status a job carries while this stage runs.
    pub fn status(&self) -> JobStatus {
        match self {
            Stage::Research => JobStatus::Researching,
            Stage::Images => JobStatus::GeneratingImages,
            Stage::Writing => JobStatus::Writing,
            Stage::Meta => JobStatus::GeneratingMeta,
            Stage::Thumbnail => JobStatus::GeneratingThumbnail,
        }
    }

    pub fn start_message(&self) -> &'static str {
        match self {
            Stage::Research => "Researching topic...",
            Stage::Images => "Generating images...",
            Stage::Writing => "Writing article...",
            Stage::Meta => "Generating SEO metadata...",
            Stage::Thumbnail => "Generating thumbnail...",
        }
    }

    pub fn done_message(&self) -> &'static str {
        match self {
            Stage::Research => "Research complete",
            Stage::Images => "Images generated",
            Stage::Writing => "Article written",
            Stage::Meta => "Metadata generated",
            Stage::Thumbnail => "Thumbnail generated",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
