// urraca is a disk intelligence and cleanup tool
// Copyright (C) 2025  Javier Lancha Vázquez <javier.lancha@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{path::Path, str::FromStr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::{
    classify::Category,
    global::PROTECTED_PATHS,
    utils::{is_subpath, normalize_path},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => bail!("Unknown risk level '{other}'"),
        }
    }
}

/// Deletion risk for one target. Derived on demand, never persisted on
/// file rows.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

const HIGH_THRESHOLD: i32 = 70;
const MEDIUM_THRESHOLD: i32 = 35;

const LOW_HINTS: [&str; 6] = ["/cache/", "/tmp/", "/var/tmp/", ".log", ".tmp", ".cache"];

/// Stateless path/category/visibility risk model shared by the cleanup
/// engine and the report layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, path: &Path, category: Category, is_hidden: bool) -> RiskAssessment {
        let resolved = normalize_path(path);
        let resolved_lower = resolved.to_string_lossy().to_lowercase();

        let mut score: i32 = 0;
        let mut reasons: Vec<String> = Vec::new();

        let protected = PROTECTED_PATHS.iter().any(|p| {
            let p = Path::new(p);
            resolved == p || (p != Path::new("/") && is_subpath(&resolved, p))
        });
        if protected {
            score += 95;
            reasons.push("system-critical path".to_string());
        }

        if category == Category::System {
            score += 70;
            reasons.push("system category".to_string());
        }

        if is_hidden {
            score += 25;
            reasons.push("hidden file/config".to_string());
        }

        if LOW_HINTS.iter().any(|h| resolved_lower.contains(h)) {
            score -= 30;
            reasons.push("cache/temp/log-like path".to_string());
        }

        let score = score.clamp(0, 100);
        let level = if score >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        if reasons.is_empty() {
            reasons.push("no explicit risk triggers".to_string());
        }

        RiskAssessment {
            score: score as u8,
            level,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_path_is_high() {
        let scorer = RiskScorer::new();
        let assessment = scorer.assess(Path::new("/etc/hosts"), Category::System, false);
        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(assessment.score, 100);
        assert!(assessment.reasons.contains(&"system-critical path".to_string()));
    }

    #[test]
    fn test_plain_file_is_low() {
        let scorer = RiskScorer::new();
        let assessment = scorer.assess(Path::new("/home/u/notes.txt"), Category::Documents, false);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.reasons, vec!["no explicit risk triggers"]);
    }

    #[test]
    fn test_hidden_file_is_not_yet_medium() {
        let scorer = RiskScorer::new();
        let assessment = scorer.assess(Path::new("/home/u/.bashrc"), Category::Other, true);
        assert_eq!(assessment.score, 25);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn test_cache_hint_discounts_score() {
        let scorer = RiskScorer::new();
        let assessment = scorer.assess(
            Path::new("/home/u/.cache/thumbs/x.png"),
            Category::Other,
            false,
        );
        // Hidden component does not fire here, only the path hint.
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(
            assessment
                .reasons
                .contains(&"cache/temp/log-like path".to_string())
        );
    }

    #[test]
    fn test_system_category_is_high() {
        let scorer = RiskScorer::new();
        let assessment = scorer.assess(Path::new("/home/u/libfoo.so"), Category::System, false);
        assert_eq!(assessment.score, 70);
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn test_score_is_clamped() {
        let scorer = RiskScorer::new();
        // Hint only: -30 clamps to 0.
        let assessment = scorer.assess(Path::new("/data/scratch/tmp/x.tmp"), Category::Other, false);
        assert_eq!(assessment.score, 0);
    }
}
