// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/nms.rs - 非极大值抑制
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use super::{
  Candidate, PostprocessError,
  geometry::{area, iou},
  validate_thresholds,
};

/// 抑制范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionScope {
  /// 只在同一类别内抑制，不同类别即使完全重叠也互不影响
  #[default]
  PerClass,
  /// 不区分类别
  ClassAgnostic,
}

impl SuppressionScope {
  fn key(&self, class_id: u32) -> Option<u32> {
    match self {
      SuppressionScope::PerClass => Some(class_id),
      SuppressionScope::ClassAgnostic => None,
    }
  }
}

/// 贪心 NMS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Suppressor {
  probability_minimum: f32,
  iou_threshold: f32,
  scope: SuppressionScope,
}

/// 置信度降序，相同时按原始下标升序
fn rank(candidates: &[Candidate], a: usize, b: usize) -> Ordering {
  candidates[b]
    .confidence
    .total_cmp(&candidates[a].confidence)
    .then(a.cmp(&b))
}

impl Suppressor {
  pub fn new(
    probability_minimum: f32,
    iou_threshold: f32,
    scope: SuppressionScope,
  ) -> Result<Self, PostprocessError> {
    validate_thresholds(probability_minimum, iou_threshold)?;
    Ok(Self {
      probability_minimum,
      iou_threshold,
      scope,
    })
  }

  pub fn iou_threshold(&self) -> f32 {
    self.iou_threshold
  }

  pub fn scope(&self) -> SuppressionScope {
    self.scope
  }

  /// 返回保留下来的候选框下标，按置信度降序（相同时按下标升序）排列
  ///
  /// 置信度不超过 `probability_minimum` 的候选框不会保留。
  /// 同一范围内，与已保留框 IoU ≥ `iou_threshold` 的框被移除。
  pub fn suppress(&self, candidates: &[Candidate]) -> Result<Vec<usize>, PostprocessError> {
    let mut groups: BTreeMap<Option<u32>, Vec<usize>> = BTreeMap::new();
    for (idx, candidate) in candidates.iter().enumerate() {
      if !(candidate.confidence > self.probability_minimum) {
        continue;
      }
      area(&candidate.rect)?;
      groups
        .entry(self.scope.key(candidate.class_id))
        .or_default()
        .push(idx);
    }

    let mut keep = Vec::new();
    for (key, mut group) in groups {
      group.sort_by(|&a, &b| rank(candidates, a, b));
      let before = keep.len();
      self.suppress_group(candidates, &group, &mut keep)?;
      debug!(
        "NMS 分组 {:?}: {} 个候选框, 保留 {} 个",
        key,
        group.len(),
        keep.len() - before
      );
    }

    keep.sort_by(|&a, &b| rank(candidates, a, b));
    Ok(keep)
  }

  /// `group` 已按 rank 排序
  fn suppress_group(
    &self,
    candidates: &[Candidate],
    group: &[usize],
    keep: &mut Vec<usize>,
  ) -> Result<(), PostprocessError> {
    let mut suppressed = vec![false; group.len()];

    for i in 0..group.len() {
      if suppressed[i] {
        continue;
      }
      let kept = &candidates[group[i]];
      keep.push(group[i]);

      for j in (i + 1)..group.len() {
        if suppressed[j] {
          continue;
        }
        if iou(&kept.rect, &candidates[group[j]].rect)? >= self.iou_threshold {
          suppressed[j] = true;
        }
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::postprocess::Rect;

  fn candidate(x: i32, y: i32, w: i32, h: i32, class_id: u32, confidence: f32) -> Candidate {
    Candidate {
      rect: Rect::new(x, y, w, h),
      class_id,
      confidence,
    }
  }

  #[test]
  fn suppresses_overlapping_lower_confidence_box() {
    let candidates = [
      candidate(0, 0, 10, 10, 0, 0.9),
      candidate(0, 0, 10, 6, 0, 0.8),
      candidate(100, 100, 10, 10, 0, 0.4),
    ];
    let suppressor = Suppressor::new(0.3, 0.3, SuppressionScope::PerClass).unwrap();
    assert_eq!(suppressor.suppress(&candidates).unwrap(), vec![0, 2]);
  }

  #[test]
  fn different_classes_do_not_suppress_each_other() {
    let candidates = [
      candidate(0, 0, 10, 10, 0, 0.9),
      candidate(0, 0, 10, 10, 1, 0.8),
    ];
    let per_class = Suppressor::new(0.5, 0.3, SuppressionScope::PerClass).unwrap();
    assert_eq!(per_class.suppress(&candidates).unwrap(), vec![0, 1]);

    let agnostic = Suppressor::new(0.5, 0.3, SuppressionScope::ClassAgnostic).unwrap();
    assert_eq!(agnostic.suppress(&candidates).unwrap(), vec![0]);
  }

  #[test]
  fn equal_confidence_keeps_lower_index() {
    let candidates = [
      candidate(1, 1, 10, 10, 0, 0.7),
      candidate(0, 0, 10, 10, 0, 0.7),
    ];
    let suppressor = Suppressor::new(0.5, 0.3, SuppressionScope::PerClass).unwrap();
    assert_eq!(suppressor.suppress(&candidates).unwrap(), vec![0]);
  }

  #[test]
  fn iou_equal_to_threshold_is_suppressed() {
    // IoU = 0.6
    let candidates = [
      candidate(0, 0, 10, 10, 0, 0.9),
      candidate(0, 0, 10, 6, 0, 0.8),
    ];
    let at = Suppressor::new(0.5, 0.6, SuppressionScope::PerClass).unwrap();
    assert_eq!(at.suppress(&candidates).unwrap(), vec![0]);
    let above = Suppressor::new(0.5, 0.61, SuppressionScope::PerClass).unwrap();
    assert_eq!(above.suppress(&candidates).unwrap(), vec![0, 1]);
  }

  #[test]
  fn weak_candidates_are_not_kept() {
    let candidates = [
      candidate(0, 0, 10, 10, 0, 0.5),
      candidate(50, 50, 10, 10, 0, 0.6),
    ];
    let suppressor = Suppressor::new(0.5, 0.3, SuppressionScope::PerClass).unwrap();
    assert_eq!(suppressor.suppress(&candidates).unwrap(), vec![1]);
  }

  #[test]
  fn output_is_ranked_across_classes() {
    let candidates = [
      candidate(0, 0, 10, 10, 2, 0.6),
      candidate(0, 0, 10, 10, 1, 0.95),
      candidate(40, 40, 10, 10, 2, 0.8),
    ];
    let suppressor = Suppressor::new(0.5, 0.3, SuppressionScope::PerClass).unwrap();
    assert_eq!(suppressor.suppress(&candidates).unwrap(), vec![1, 2, 0]);
  }

  #[test]
  fn negative_size_is_reported() {
    let candidates = [candidate(0, 0, -3, 10, 0, 0.9)];
    let suppressor = Suppressor::new(0.5, 0.3, SuppressionScope::PerClass).unwrap();
    assert_eq!(
      suppressor.suppress(&candidates),
      Err(PostprocessError::InvalidGeometry {
        width: -3,
        height: 10
      })
    );
  }

  #[test]
  fn zero_threshold_keeps_one_per_class() {
    let candidates = [
      candidate(0, 0, 10, 10, 0, 0.9),
      candidate(500, 500, 10, 10, 0, 0.8),
      candidate(900, 900, 10, 10, 1, 0.7),
    ];
    let suppressor = Suppressor::new(0.5, 0.0, SuppressionScope::PerClass).unwrap();
    assert_eq!(suppressor.suppress(&candidates).unwrap(), vec![0, 2]);
  }

  #[test]
  fn invalid_thresholds_are_rejected() {
    assert!(Suppressor::new(0.5, 1.2, SuppressionScope::PerClass).is_err());
    assert!(Suppressor::new(0.0, 0.3, SuppressionScope::PerClass).is_err());
  }

  #[test]
  fn empty_input() {
    let suppressor = Suppressor::new(0.5, 0.3, SuppressionScope::PerClass).unwrap();
    assert!(suppressor.suppress(&[]).unwrap().is_empty());
  }
}
