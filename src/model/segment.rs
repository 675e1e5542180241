//! Genome plan segments (spec §3.1).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SegmentName {
    pub prefix: String,
    pub key: String,
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.prefix, self.key)
    }
}

/// Splits a string into alternating non-digit/digit runs, comparing digit
/// runs numerically so that `"RNA 2" < "RNA 10"` (spec §8 property 8).
pub fn natural_sort_key(s: &str) -> Vec<NaturalToken> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let value: u64 = digits.parse().unwrap_or(0);
            tokens.push(NaturalToken::Number(value));
        } else {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if !c.is_ascii_digit() {
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(NaturalToken::Text(text));
        }
    }
    tokens
}

#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub enum NaturalToken {
    Number(u64),
    Text(String),
}

impl SegmentName {
    pub fn natural_sort_key(&self) -> Vec<NaturalToken> {
        natural_sort_key(&self.key)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentRule {
    Required,
    Recommended,
    Optional,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub length: u32,
    /// Fraction in `[0.0, 1.0]`.
    pub length_tolerance: f64,
    pub name: Option<SegmentName>,
    pub rule: SegmentRule,
}

impl Segment {
    pub fn min_length(&self) -> u32 {
        (self.length as f64 * (1.0 - self.length_tolerance)).floor() as u32
    }

    pub fn max_length(&self) -> u32 {
        (self.length as f64 * (1.0 + self.length_tolerance)).ceil() as u32
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a
                .prefix
                .cmp(&b.prefix)
                .then_with(|| a.natural_sort_key().cmp(&b.natural_sort_key())),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_ordering() {
        let mut names = vec![
            SegmentName { prefix: "RNA".into(), key: "10".into() },
            SegmentName { prefix: "RNA".into(), key: "1".into() },
            SegmentName { prefix: "RNA".into(), key: "3".into() },
        ];
        names.sort_by(|a, b| a.natural_sort_key().cmp(&b.natural_sort_key()));
        let keys: Vec<&str> = names.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "3", "10"]);
    }

    #[test]
    fn test_segment_length_bounds() {
        let segment = Segment {
            id: Uuid::nil(),
            length: 15,
            length_tolerance: 0.03,
            name: None,
            rule: SegmentRule::Required,
        };
        assert_eq!(segment.min_length(), 14);
        assert_eq!(segment.max_length(), 16);
    }
}
