//! Transcript state of one recognition session

use super::SpeechResult;

/// Accumulated segments of a running session
#[derive(Debug, Default, Clone)]
pub(super) struct TranscriptSession {
    /// Finished segments, in the order the service completed them
    pub committed_segments: Vec<String>,
    /// Text of the segment still being recognized
    pub partial_transcript: Option<String>,
}

impl TranscriptSession {
    /// Append a delta to the segment in progress
    pub fn push_delta(&mut self, delta: &str) {
        self.partial_transcript
            .get_or_insert_with(String::new)
            .push_str(delta);
    }

    /// Finish the segment in progress with its final text
    pub fn commit(&mut self, transcript: &str) {
        self.partial_transcript = None;
        self.committed_segments.push(transcript.to_string());
    }

    /// Result list as reported to the controller
    ///
    /// Committed segments come first; the partial is only included when
    /// interim results are wanted.
    pub fn results(&self, interim: bool) -> Vec<SpeechResult> {
        let mut results: Vec<SpeechResult> = self
            .committed_segments
            .iter()
            .map(|text| SpeechResult {
                transcript: text.clone(),
                is_final: true,
            })
            .collect();

        if interim {
            if let Some(partial) = self.partial_transcript.as_ref().filter(|p| !p.is_empty()) {
                results.push(SpeechResult {
                    transcript: partial.clone(),
                    is_final: false,
                });
            }
        }
        results
    }
}
