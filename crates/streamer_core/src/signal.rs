use std::sync::LazyLock;

use regex::Regex;

use crate::SequencePosition;

/// What a single line of extraction output means for the job.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressSignal {
    /// `[download] Downloading item N of M`: the extractor moved on to item N.
    ItemStarted {
        position: SequencePosition,
        total: Option<u32>,
    },
    DownloadProgress { percent: Option<f64> },
    ExtractionComplete { filename: String },
    ErrorLine { raw: String },
    Unclassified { raw: String },
}

static ITEM_STARTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+Downloading (?:item|video) (\d+) of (\d+)").expect("valid regex")
});
static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)%").expect("valid regex"));
static DESTINATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Destination:\s*(.+)$").expect("valid regex"));
static ALREADY_CONVERTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Not converting audio (.+?); file is already in target format")
        .expect("valid regex")
});

const DOWNLOAD_MARKER: &str = "[download]";
const EXTRACT_MARKER: &str = "[ExtractAudio]";
const ERROR_MARKER: &str = "ERROR:";
const INFORMATIONAL_MARKERS: &[&str] = &["[ffmpeg]", "Destination:", "Deleting original file"];

/// Line classifier bound to the target audio extension (e.g. `mp3`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClassifier {
    extension: String,
}

impl LineClassifier {
    pub fn new(audio_format: &str) -> Self {
        let extension = format!(".{}", audio_format.trim_start_matches('.').to_ascii_lowercase());
        Self { extension }
    }

    pub fn classify(&self, line: &str) -> ProgressSignal {
        if line.contains(DOWNLOAD_MARKER) {
            if let Some(caps) = ITEM_STARTED.captures(line.trim_start()) {
                if let Ok(position) = caps[1].parse() {
                    return ProgressSignal::ItemStarted {
                        position,
                        total: caps[2].parse().ok(),
                    };
                }
            }
            // Titles may contain '%', so destination lines are never progress.
            if line.contains('%') && !line.contains("Destination:") {
                let percent = PERCENT
                    .captures(line)
                    .and_then(|caps| caps[1].parse::<f64>().ok());
                return ProgressSignal::DownloadProgress { percent };
            }
        }

        if line.contains(EXTRACT_MARKER) {
            if let Some(filename) = self.extracted_path(line) {
                return ProgressSignal::ExtractionComplete { filename };
            }
        }

        if line.to_ascii_uppercase().contains(ERROR_MARKER) {
            return ProgressSignal::ErrorLine {
                raw: line.to_string(),
            };
        }

        ProgressSignal::Unclassified {
            raw: line.to_string(),
        }
    }

    fn extracted_path(&self, line: &str) -> Option<String> {
        let caps = DESTINATION
            .captures(line)
            .or_else(|| ALREADY_CONVERTED.captures(line))?;
        let path = caps[1].trim();
        path.to_ascii_lowercase()
            .ends_with(&self.extension)
            .then(|| path.to_string())
    }
}

/// Classifies a line against the default `mp3` target.
pub fn classify_line(line: &str) -> ProgressSignal {
    static DEFAULT: LazyLock<LineClassifier> = LazyLock::new(|| LineClassifier::new("mp3"));
    DEFAULT.classify(line)
}

/// Unclassified lines worth forwarding to the client as status text.
pub fn is_informational(raw: &str) -> bool {
    INFORMATIONAL_MARKERS.iter().any(|marker| raw.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_normalized() {
        assert_eq!(LineClassifier::new(".MP3"), LineClassifier::new("mp3"));
    }

    #[test]
    fn destination_with_other_extension_is_not_completion() {
        let classifier = LineClassifier::new("mp3");
        assert_eq!(
            classifier.extracted_path("[ExtractAudio] Destination: /tmp/001-a.m4a"),
            None
        );
        assert_eq!(
            classifier.extracted_path("[ExtractAudio] Destination: /tmp/001-a.MP3 "),
            Some("/tmp/001-a.MP3".to_string())
        );
    }
}
