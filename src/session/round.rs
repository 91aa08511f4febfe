use crate::protocol::codes::{HEAD_MUSIC_ROUND_ID, HEAD_MUSIC_SPEAKER};

/// Audio buffer for the round currently being streamed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Round {
    round_id: Option<i64>,
    speaker: Option<String>,
    chunks: Vec<Vec<u8>>,
}

impl Round {
    pub fn new(round_id: Option<i64>, speaker: Option<String>) -> Self {
        Self {
            round_id,
            speaker,
            chunks: Vec::new(),
        }
    }

    /// Introductory material (round -1, no speaker)
    pub fn head_music() -> Self {
        Self::new(
            Some(HEAD_MUSIC_ROUND_ID),
            Some(HEAD_MUSIC_SPEAKER.to_string()),
        )
    }

    pub fn round_id(&self) -> Option<i64> {
        self.round_id
    }

    pub fn speaker(&self) -> Option<&str> {
        self.speaker.as_deref()
    }

    /// Round -1 is introductory material whatever the speaker says
    pub fn is_head_music(&self) -> bool {
        self.round_id == Some(HEAD_MUSIC_ROUND_ID)
    }

    /// Both round id and speaker are known
    pub fn is_identified(&self) -> bool {
        self.round_id.is_some() && self.speaker.is_some()
    }

    pub fn push(&mut self, chunk: Vec<u8>) {
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// Seal the round for persistence. `None` when it has no identity.
    pub fn complete(self, index: usize) -> Option<CompletedRound> {
        let head_music = self.is_head_music();
        let round_id = self.round_id?;
        let speaker = self.speaker?;

        Some(CompletedRound {
            index,
            round_id,
            speaker,
            head_music,
            audio: self.chunks.concat(),
        })
    }
}

/// A closed round ready to be written as an intermediate artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRound {
    /// Position among the session's flushed rounds
    pub index: usize,
    pub round_id: i64,
    pub speaker: String,
    pub head_music: bool,
    /// Raw 16-bit little-endian PCM
    pub audio: Vec<u8>,
}

impl CompletedRound {
    /// `round_<file_id>_<index>_head_music.wav` or
    /// `round_<file_id>_<index>_<round_id>_<speaker>.wav`
    pub fn artifact_name(&self, file_id: &str) -> String {
        if self.head_music {
            format!("round_{}_{}_{}.wav", file_id, self.index, HEAD_MUSIC_SPEAKER)
        } else {
            format!(
                "round_{}_{}_{}_{}.wav",
                file_id,
                self.index,
                self.round_id,
                sanitize(&self.speaker)
            )
        }
    }
}

fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_concatenate_in_order() {
        let mut round = Round::new(Some(0), Some("host".to_string()));
        round.push(vec![1; 100]);
        round.push(vec![2; 50]);

        assert_eq!(round.chunk_count(), 2);
        assert_eq!(round.byte_len(), 150);

        let completed = round.complete(0).unwrap();
        assert_eq!(completed.audio.len(), 150);
        assert!(completed.audio[..100].iter().all(|&b| b == 1));
        assert!(completed.audio[100..].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_unidentified_round_cannot_complete() {
        let mut round = Round::new(Some(3), None);
        round.push(vec![0; 10]);

        assert!(!round.is_identified());
        assert!(round.complete(0).is_none());
    }

    #[test]
    fn test_artifact_names() {
        let head = Round::head_music().complete(0).unwrap();
        assert_eq!(
            head.artifact_name("20250101_120000_abcd1234"),
            "round_20250101_120000_abcd1234_0_head_music.wav"
        );

        let guest = Round::new(Some(4), Some("zh/guest v2".to_string()))
            .complete(3)
            .unwrap();
        assert_eq!(guest.artifact_name("f"), "round_f_3_4_zh_guest_v2.wav");
    }

    #[test]
    fn test_round_minus_one_with_speaker_is_head_music() {
        let narrated = Round::new(Some(-1), Some("narrator".to_string()))
            .complete(2)
            .unwrap();

        assert!(narrated.head_music);
        assert_eq!(narrated.speaker, "narrator");
        assert_eq!(narrated.artifact_name("f"), "round_f_2_head_music.wav");
    }
}
