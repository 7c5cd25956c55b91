//! Presentation surface contract and a terminal implementation.
//!
//! The surface is host-owned: the host may tear it down at any time, so the
//! controller checks [`PresentationSurface::is_present`] on every tick and
//! recreates it when it has gone missing.

use std::io::Write;

use crate::domain::{format_timestamp, Claim, ScoreBand};

/// Where status, score and the claim timeline are shown
pub trait PresentationSurface: Send {
    /// Whether the surface still exists in the host
    fn is_present(&self) -> bool;

    /// Build a fresh, empty surface after the previous one was lost
    fn recreate(&mut self);

    fn show(&mut self);

    fn set_status(&mut self, text: &str);

    /// `None` blanks the score
    fn set_overall_score(&mut self, score: Option<u8>);

    /// Replace the claim list; an empty slice clears it
    fn render_claims(&mut self, claims: &[Claim]);

    fn set_active_claim(&mut self, index: Option<usize>);
}

/// Line-oriented surface writing to any `Write` (stdout in the CLI)
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    claims: Vec<Claim>,
    expanded: bool,
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            claims: Vec::new(),
            expanded: true,
        }
    }

    /// Show or hide per-claim reasoning
    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One claim line: `[85] 1:05 - text`
pub fn format_claim_line(claim: &Claim) -> String {
    format!(
        "[{}] {} - {} ({})",
        claim.truth_score,
        format_timestamp(claim.timestamp),
        claim.text,
        claim.verdict()
    )
}

impl<W: Write + Send> PresentationSurface for TerminalSurface<W> {
    fn is_present(&self) -> bool {
        true
    }

    fn recreate(&mut self) {
        self.claims.clear();
    }

    fn show(&mut self) {
        let _ = writeln!(self.out, "== Fact Checker ==");
    }

    fn set_status(&mut self, text: &str) {
        let _ = writeln!(self.out, "status: {}", text);
    }

    fn set_overall_score(&mut self, score: Option<u8>) {
        if let Some(score) = score {
            let _ = writeln!(
                self.out,
                "overall: {}/100 ({})",
                score,
                ScoreBand::from_score(score)
            );
        }
    }

    fn render_claims(&mut self, claims: &[Claim]) {
        self.claims = claims.to_vec();
        for (index, claim) in claims.iter().enumerate() {
            let _ = writeln!(self.out, "  #{} {}", index, format_claim_line(claim));
            if self.expanded && !claim.reasoning.is_empty() {
                let _ = writeln!(self.out, "       {}", claim.reasoning);
            }
        }
    }

    fn set_active_claim(&mut self, index: Option<usize>) {
        match index.and_then(|i| self.claims.get(i).map(|c| (i, c))) {
            Some((i, claim)) => {
                let _ = writeln!(self.out, "> #{} {}", i, format_claim_line(claim));
            }
            None => {
                let _ = writeln!(self.out, "> (no active claim)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(surface: TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.into_inner()).unwrap()
    }

    #[test]
    fn test_claim_line() {
        let claim = Claim::new(65.0, "Water boils at 100C at sea level", 95, "");
        assert_eq!(
            format_claim_line(&claim),
            "[95] 1:05 - Water boils at 100C at sea level (true)"
        );
    }

    #[test]
    fn test_terminal_render() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.set_overall_score(Some(42));
        surface.set_overall_score(None);
        surface.render_claims(&[Claim::new(5.0, "a", 10, "wrong")]);
        surface.set_active_claim(Some(0));
        surface.set_active_claim(Some(7));

        let out = rendered(surface);
        assert!(out.contains("overall: 42/100 (low)"));
        assert!(out.contains("  #0 [10] 0:05 - a (false)\n       wrong"));
        assert!(out.contains("> #0 [10] 0:05 - a (false)"));
        assert!(out.contains("> (no active claim)"));
    }

    #[test]
    fn test_collapsed_hides_reasoning() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.set_expanded(false);
        surface.render_claims(&[Claim::new(5.0, "a", 10, "wrong")]);
        assert!(!rendered(surface).contains("wrong"));
    }
}
