//! The genome plan: an ordered, non-empty list of segments (spec §3.1).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::model::segment::{Segment, SegmentRule};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub segments: Vec<Segment>,
}

impl Plan {
    /// Builds a plan, enforcing spec §3.1's monopartite/multipartite rules.
    pub fn new(id: Uuid, segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(RefBuilderError::InvalidInput(
                "a plan must have at least one segment".into(),
            ));
        }

        if segments.len() == 1 {
            return Ok(Plan { id, segments });
        }

        if segments.iter().any(|s| s.name.is_none()) {
            return Err(RefBuilderError::InvalidInput(
                "a multipartite plan must name every segment".into(),
            ));
        }

        let mut names: Vec<&str> = segments
            .iter()
            .map(|s| s.name.as_ref().unwrap().key.as_str())
            .collect();
        names.sort_unstable();
        let mut names_with_prefix: Vec<(String, String)> = segments
            .iter()
            .map(|s| {
                let n = s.name.as_ref().unwrap();
                (n.prefix.clone(), n.key.clone())
            })
            .collect();
        names_with_prefix.sort();
        let mut dedup = names_with_prefix.clone();
        dedup.dedup();
        if dedup.len() != names_with_prefix.len() {
            return Err(RefBuilderError::InvalidInput(
                "a multipartite plan's segment names must be distinct".into(),
            ));
        }

        Ok(Plan { id, segments })
    }

    pub fn is_monopartite(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.segments.iter().map(|s| s.id)
    }

    pub fn get_segment_by_id(&self, id: Uuid) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn required_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| s.rule == SegmentRule::Required)
    }

    /// Returns a plan with `extra` appended (used for plan-enlargement writes,
    /// spec §8 scenario "Plan enlargement"). Existing segment ids/order are
    /// preserved; the new segments are validated as part of the whole.
    pub fn with_additional_segments(&self, extra: Vec<Segment>) -> Result<Self> {
        let mut segments = self.segments.clone();
        segments.extend(extra);
        Plan::new(self.id, segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::segment::SegmentName;

    fn segment(key: &str, rule: SegmentRule) -> Segment {
        Segment {
            id: Uuid::new_v4(),
            length: 1000,
            length_tolerance: 0.1,
            name: Some(SegmentName {
                prefix: "RNA".into(),
                key: key.into(),
            }),
            rule,
        }
    }

    #[test]
    fn test_monopartite_allows_unnamed_segment() {
        let seg = Segment {
            id: Uuid::new_v4(),
            length: 15,
            length_tolerance: 0.03,
            name: None,
            rule: SegmentRule::Required,
        };
        let plan = Plan::new(Uuid::new_v4(), vec![seg]).unwrap();
        assert!(plan.is_monopartite());
    }

    #[test]
    fn test_multipartite_requires_names() {
        let seg = Segment {
            id: Uuid::new_v4(),
            length: 15,
            length_tolerance: 0.03,
            name: None,
            rule: SegmentRule::Required,
        };
        let err = Plan::new(Uuid::new_v4(), vec![seg.clone(), seg]).unwrap_err();
        assert!(matches!(err, RefBuilderError::InvalidInput(_)));
    }

    #[test]
    fn test_multipartite_requires_distinct_names() {
        let a = segment("1", SegmentRule::Required);
        let mut b = segment("1", SegmentRule::Required);
        b.id = Uuid::new_v4();
        assert!(Plan::new(Uuid::new_v4(), vec![a, b]).is_err());
    }

    #[test]
    fn test_plan_enlargement() {
        let a = segment("1", SegmentRule::Required);
        let b = segment("2", SegmentRule::Required);
        let c = segment("3", SegmentRule::Required);
        let plan = Plan::new(Uuid::new_v4(), vec![a, b, c]).unwrap();
        let new_segments = vec![segment("4", SegmentRule::Optional), segment("5", SegmentRule::Optional)];
        let enlarged = plan.with_additional_segments(new_segments).unwrap();
        assert_eq!(enlarged.segments.len(), 5);
    }
}
