//! Multipart upload planning.

use std::path::PathBuf;

use crate::error::{Result, ServiceError};

/// S3 rejects parts smaller than 5 MiB, except the last one.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// One part of a planned upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPart {
    /// 1-based part number.
    pub number: i32,
    pub path: PathBuf,
    pub size: u64,
}

/// Ordered parts of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartPlan {
    parts: Vec<PlannedPart>,
}

impl PartPlan {
    /// Builds a plan from part files and their sizes, in upload order.
    pub fn new(files: Vec<(PathBuf, u64)>) -> Result<Self> {
        if files.is_empty() {
            return Err(ServiceError::InvalidData(
                "multipart upload needs at least one part".to_string(),
            ));
        }

        let last = files.len() - 1;
        let mut parts = Vec::with_capacity(files.len());
        for (index, (path, size)) in files.into_iter().enumerate() {
            if index < last && size < MIN_PART_SIZE {
                return Err(ServiceError::InvalidData(format!(
                    "part {} ({}) is {} bytes, minimum is {}",
                    index + 1,
                    path.display(),
                    size,
                    MIN_PART_SIZE
                )));
            }
            parts.push(PlannedPart {
                number: (index + 1) as i32,
                path,
                size,
            });
        }

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[PlannedPart] {
        &self.parts
    }

    pub fn total_size(&self) -> u64 {
        self.parts.iter().map(|part| part.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_numbers_are_one_based_in_order() {
        let plan = PartPlan::new(vec![
            (PathBuf::from("part1.txt"), MIN_PART_SIZE),
            (PathBuf::from("part2.txt"), MIN_PART_SIZE + 10),
            (PathBuf::from("part3.txt"), 12),
        ])
        .unwrap();

        let numbers: Vec<i32> = plan.parts().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(plan.parts()[2].path, PathBuf::from("part3.txt"));
        assert_eq!(plan.total_size(), 2 * MIN_PART_SIZE + 22);
    }

    #[test]
    fn test_small_part_before_last_is_rejected() {
        let result = PartPlan::new(vec![
            (PathBuf::from("part1.txt"), 100),
            (PathBuf::from("part2.txt"), MIN_PART_SIZE),
        ]);
        assert!(matches!(result, Err(ServiceError::InvalidData(_))));
    }

    #[test]
    fn test_single_small_part_is_allowed() {
        let plan = PartPlan::new(vec![(PathBuf::from("only.txt"), 1)]).unwrap();
        assert_eq!(plan.parts().len(), 1);
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        assert!(PartPlan::new(vec![]).is_err());
    }
}
