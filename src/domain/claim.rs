//! Verified claims and the per-video claim set.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest score a claim or video can receive
pub const MAX_SCORE: u8 = 100;

/// A single factual assertion tied to a transcript timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Offset into the video in seconds
    pub timestamp: f64,

    /// The claim as stated in the video
    pub text: String,

    /// 0 (false) to 100 (verified)
    pub truth_score: u8,

    /// Short rationale from the verifier
    pub reasoning: String,
}

impl Claim {
    pub fn new(
        timestamp: f64,
        text: impl Into<String>,
        truth_score: u8,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            text: text.into(),
            truth_score,
            reasoning: reasoning.into(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_score(self.truth_score)
    }
}

/// The verifier's full answer for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Whole-video score, 0 to 100
    pub overall_score: u8,

    /// Claims ordered by timestamp once [`ClaimSet::sort_claims`] has run
    pub claims: Vec<Claim>,
}

impl ClaimSet {
    pub fn new(overall_score: u8, claims: Vec<Claim>) -> Self {
        Self {
            overall_score,
            claims,
        }
    }

    /// Stable ascending sort by timestamp
    pub fn sort_claims(&mut self) {
        self.claims
            .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    }

    pub fn is_sorted(&self) -> bool {
        self.claims
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}

/// Coarse band used to colour the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => ScoreBand::High,
            50..=79 => ScoreBand::Medium,
            _ => ScoreBand::Low,
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::High => write!(f, "high"),
            ScoreBand::Medium => write!(f, "medium"),
            ScoreBand::Low => write!(f, "low"),
        }
    }
}

/// Per-claim verdict derived from its truth score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    True,
    Mixed,
    False,
}

impl Verdict {
    /// Above 80 is true, below 50 is false, everything between is mixed
    pub fn from_score(score: u8) -> Self {
        if score > 80 {
            Verdict::True
        } else if score < 50 {
            Verdict::False
        } else {
            Verdict::Mixed
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::True => write!(f, "true"),
            Verdict::Mixed => write!(f, "mixed"),
            Verdict::False => write!(f, "false"),
        }
    }
}

/// Format seconds as `m:ss`, the way timestamps are shown next to claims
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_claims_is_stable() {
        let mut set = ClaimSet::new(
            70,
            vec![
                Claim::new(30.0, "c", 50, ""),
                Claim::new(5.0, "a", 50, ""),
                Claim::new(5.0, "b", 50, ""),
            ],
        );
        assert!(!set.is_sorted());

        set.sort_claims();

        let texts: Vec<&str> = set.claims.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert!(set.is_sorted());
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::from_score(100), ScoreBand::High);
        assert_eq!(ScoreBand::from_score(80), ScoreBand::High);
        assert_eq!(ScoreBand::from_score(79), ScoreBand::Medium);
        assert_eq!(ScoreBand::from_score(50), ScoreBand::Medium);
        assert_eq!(ScoreBand::from_score(49), ScoreBand::Low);
    }

    #[test]
    fn test_verdict_boundaries() {
        assert_eq!(Verdict::from_score(81), Verdict::True);
        assert_eq!(Verdict::from_score(80), Verdict::Mixed);
        assert_eq!(Verdict::from_score(50), Verdict::Mixed);
        assert_eq!(Verdict::from_score(49), Verdict::False);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(600.0), "10:00");
    }
}
