// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess.rs - 检测结果后处理（解码与非极大值抑制）
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

use thiserror::Error;

pub mod decode;
pub mod filter;
pub mod geometry;
pub mod nms;
pub mod pipeline;

pub use self::decode::decode_box;
pub use self::filter::{CandidateFilter, ClassScore, ScoreLayout};
pub use self::geometry::{Rect, area, intersection_area, iou};
pub use self::nms::{SuppressionScope, Suppressor};
pub use self::pipeline::{DetectionPipeline, detect};

/// 默认置信度阈值
pub const DEFAULT_PROBABILITY_MINIMUM: f32 = 0.5;
/// 默认 NMS IoU 阈值
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostprocessError {
  #[error("预测向量格式错误: 第 {index} 个预测长度为 {len}, 期望 {expected}")]
  MalformedPrediction {
    index: usize,
    len: usize,
    expected: usize,
  },
  #[error("阈值无效: {name} = {value}")]
  InvalidThreshold { name: &'static str, value: f32 },
  #[error("几何尺寸无效: 宽 {width}, 高 {height}")]
  InvalidGeometry { width: i32, height: i32 },
}

/// 一次检测中的候选框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub rect: Rect,
  pub class_id: u32,
  pub confidence: f32,
}

/// 经过 NMS 保留下来的检测结果
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Detection {
  pub rect: Rect,
  pub class_id: u32,
  pub confidence: f32,
}

impl From<Candidate> for Detection {
  fn from(candidate: Candidate) -> Self {
    Detection {
      rect: candidate.rect,
      class_id: candidate.class_id,
      confidence: candidate.confidence,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
  /// NMS 之前的候选框数量
  pub total_candidates: usize,
  /// NMS 之后保留的数量
  pub total_survivors: usize,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

/// 后处理配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessConfig {
  pub probability_minimum: f32,
  pub iou_threshold: f32,
  pub scope: SuppressionScope,
  pub layout: ScoreLayout,
  /// 标签表中的类别数量，设置后会校验每个预测的分类分数个数
  pub class_count: Option<usize>,
}

impl Default for PostprocessConfig {
  fn default() -> Self {
    Self {
      probability_minimum: DEFAULT_PROBABILITY_MINIMUM,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      scope: SuppressionScope::default(),
      layout: ScoreLayout::default(),
      class_count: None,
    }
  }
}

impl PostprocessConfig {
  pub fn with_probability_minimum(mut self, probability_minimum: f32) -> Self {
    self.probability_minimum = probability_minimum;
    self
  }

  pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn with_scope(mut self, scope: SuppressionScope) -> Self {
    self.scope = scope;
    self
  }

  pub fn with_layout(mut self, layout: ScoreLayout) -> Self {
    self.layout = layout;
    self
  }

  pub fn with_class_count(mut self, class_count: Option<usize>) -> Self {
    self.class_count = class_count;
    self
  }

  pub fn validate(&self) -> Result<(), PostprocessError> {
    validate_thresholds(self.probability_minimum, self.iou_threshold)
  }
}

/// `probability_minimum` 必须位于 (0, 1)，`iou_threshold` 必须位于 [0, 1]
pub(crate) fn validate_thresholds(
  probability_minimum: f32,
  iou_threshold: f32,
) -> Result<(), PostprocessError> {
  if !(probability_minimum > 0.0 && probability_minimum < 1.0) {
    return Err(PostprocessError::InvalidThreshold {
      name: "probability_minimum",
      value: probability_minimum,
    });
  }
  if !(0.0..=1.0).contains(&iou_threshold) {
    return Err(PostprocessError::InvalidThreshold {
      name: "iou_threshold",
      value: iou_threshold,
    });
  }
  Ok(())
}
