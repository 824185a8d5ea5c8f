// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/filter.rs - 候选框筛选
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

use super::{PostprocessConfig, PostprocessError};

/// 原始预测向量的布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreLayout {
  /// `[cx, cy, w, h, class_score_1..K]`
  #[default]
  ClassScores,
  /// Darknet 输出 `[cx, cy, w, h, objectness, class_score_1..K]`，忽略 objectness
  Darknet,
}

impl ScoreLayout {
  /// 分类分数的起始下标
  pub const fn class_offset(&self) -> usize {
    match self {
      ScoreLayout::ClassScores => 4,
      ScoreLayout::Darknet => 5,
    }
  }

  /// 至少需要一个分类分数
  pub const fn min_len(&self) -> usize {
    self.class_offset() + 1
  }
}

/// 筛选后保留的类别与置信度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScore {
  pub class_id: u32,
  pub confidence: f32,
}

/// 在分类分数中取最大值，相同分数取下标最小的类别
///
/// NaN 永远不会被选中。
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, &score) in scores.iter().enumerate() {
    match best {
      Some((_, best_score)) if score <= best_score || score.is_nan() => {}
      None if score.is_nan() => {}
      _ => best = Some((idx, score)),
    }
  }
  best
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFilter {
  probability_minimum: f32,
  layout: ScoreLayout,
  class_count: Option<usize>,
}

impl From<&PostprocessConfig> for CandidateFilter {
  fn from(config: &PostprocessConfig) -> Self {
    Self {
      probability_minimum: config.probability_minimum,
      layout: config.layout,
      class_count: config.class_count,
    }
  }
}

impl CandidateFilter {
  pub fn new(probability_minimum: f32, layout: ScoreLayout) -> Self {
    Self {
      probability_minimum,
      layout,
      class_count: None,
    }
  }

  pub fn with_class_count(mut self, class_count: Option<usize>) -> Self {
    self.class_count = class_count;
    self
  }

  pub fn layout(&self) -> ScoreLayout {
    self.layout
  }

  /// 对单个预测做筛选，`index` 仅用于错误信息
  ///
  /// 最大分数严格大于 `probability_minimum` 时才保留。
  pub fn filter(
    &self,
    index: usize,
    prediction: &[f32],
  ) -> Result<Option<ClassScore>, PostprocessError> {
    let offset = self.layout.class_offset();
    if prediction.len() < self.layout.min_len() {
      return Err(PostprocessError::MalformedPrediction {
        index,
        len: prediction.len(),
        expected: self.layout.min_len(),
      });
    }

    let scores = &prediction[offset..];
    if let Some(class_count) = self.class_count
      && scores.len() != class_count
    {
      return Err(PostprocessError::MalformedPrediction {
        index,
        len: prediction.len(),
        expected: offset + class_count,
      });
    }

    Ok(
      argmax(scores)
        .filter(|&(_, confidence)| confidence > self.probability_minimum)
        .map(|(class_id, confidence)| ClassScore {
          class_id: class_id as u32,
          confidence,
        }),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn argmax_prefers_lowest_index_on_ties() {
    assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some((1, 0.7)));
    assert_eq!(argmax(&[0.3]), Some((0, 0.3)));
    assert_eq!(argmax(&[]), None);
  }

  #[test]
  fn argmax_skips_nan() {
    assert_eq!(argmax(&[f32::NAN, 0.2, f32::NAN]), Some((1, 0.2)));
    assert_eq!(argmax(&[f32::NAN]), None);
  }

  #[test]
  fn keeps_best_class_above_threshold() {
    let filter = CandidateFilter::new(0.5, ScoreLayout::ClassScores);
    let score = filter
      .filter(0, &[0.5, 0.5, 0.1, 0.1, 0.2, 0.9, 0.6])
      .unwrap()
      .unwrap();
    assert_eq!(score.class_id, 1);
    assert_eq!(score.confidence, 0.9);
  }

  #[test]
  fn score_equal_to_threshold_is_discarded() {
    let filter = CandidateFilter::new(0.5, ScoreLayout::ClassScores);
    assert_eq!(filter.filter(0, &[0.5, 0.5, 0.1, 0.1, 0.5, 0.3]), Ok(None));
    assert!(
      filter
        .filter(0, &[0.5, 0.5, 0.1, 0.1, 0.500001, 0.3])
        .unwrap()
        .is_some()
    );
  }

  #[test]
  fn short_prediction_is_malformed() {
    let filter = CandidateFilter::new(0.5, ScoreLayout::ClassScores);
    assert_eq!(
      filter.filter(3, &[0.5, 0.5, 0.1, 0.1]),
      Err(PostprocessError::MalformedPrediction {
        index: 3,
        len: 4,
        expected: 5
      })
    );

    let darknet = CandidateFilter::new(0.5, ScoreLayout::Darknet);
    assert!(darknet.filter(0, &[0.5, 0.5, 0.1, 0.1, 0.9]).is_err());
  }

  #[test]
  fn darknet_layout_ignores_objectness() {
    let filter = CandidateFilter::new(0.5, ScoreLayout::Darknet);
    // objectness 0.99 不参与分类
    let score = filter
      .filter(0, &[0.5, 0.5, 0.1, 0.1, 0.99, 0.2, 0.7])
      .unwrap()
      .unwrap();
    assert_eq!(score.class_id, 1);
    assert_eq!(score.confidence, 0.7);
    assert_eq!(filter.filter(0, &[0.5, 0.5, 0.1, 0.1, 0.99, 0.2, 0.3]), Ok(None));
  }

  #[test]
  fn class_count_mismatch_is_malformed() {
    let filter =
      CandidateFilter::new(0.5, ScoreLayout::ClassScores).with_class_count(Some(3));
    assert!(filter.filter(0, &[0.5, 0.5, 0.1, 0.1, 0.9, 0.1, 0.1]).is_ok());
    assert_eq!(
      filter.filter(1, &[0.5, 0.5, 0.1, 0.1, 0.9, 0.1]),
      Err(PostprocessError::MalformedPrediction {
        index: 1,
        len: 6,
        expected: 7
      })
    );
  }

  #[test]
  fn never_emits_confidence_at_or_below_threshold() {
    let filter = CandidateFilter::new(0.3, ScoreLayout::ClassScores);
    for step in 0..=20 {
      let s = step as f32 / 20.0;
      let prediction = [0.5, 0.5, 0.2, 0.2, s, s * 0.5];
      if let Some(score) = filter.filter(0, &prediction).unwrap() {
        assert!(score.confidence > 0.3);
      }
    }
  }
}
