// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/pipeline.rs - 检测后处理流水线
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

use tracing::debug;

use super::{
  Candidate, DetectResult, Detection, PostprocessConfig, PostprocessError,
  decode::decode_box,
  filter::CandidateFilter,
  nms::Suppressor,
};

/// 将所有输出层的原始预测转换为最终检测结果
///
/// 不持有跨调用的状态，可以在多个线程中同时使用。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionPipeline {
  filter: CandidateFilter,
  suppressor: Suppressor,
}

impl DetectionPipeline {
  pub fn new(config: PostprocessConfig) -> Result<Self, PostprocessError> {
    config.validate()?;
    let suppressor = Suppressor::new(
      config.probability_minimum,
      config.iou_threshold,
      config.scope,
    )?;

    Ok(Self {
      filter: CandidateFilter::from(&config),
      suppressor,
    })
  }

  /// 展平顺序为：先按输出层顺序，再按层内顺序。
  /// 该顺序决定候选框的下标，从而决定同分时的取舍。
  ///
  /// 任何错误都会中止本次运行，不返回部分结果。
  pub fn run<L, P>(
    &self,
    layers: L,
    image_width: u32,
    image_height: u32,
  ) -> Result<DetectResult, PostprocessError>
  where
    L: IntoIterator,
    L::Item: IntoIterator<Item = P>,
    P: AsRef<[f32]>,
  {
    let mut candidates = Vec::new();
    let mut index = 0usize;

    for (layer_idx, layer) in layers.into_iter().enumerate() {
      let before = candidates.len();
      let mut layer_len = 0usize;

      for prediction in layer {
        let prediction = prediction.as_ref();
        if let Some(score) = self.filter.filter(index, prediction)? {
          let rect = decode_box(
            prediction[0],
            prediction[1],
            prediction[2],
            prediction[3],
            image_width,
            image_height,
          );
          candidates.push(Candidate {
            rect,
            class_id: score.class_id,
            confidence: score.confidence,
          });
        }
        index += 1;
        layer_len += 1;
      }

      debug!(
        "输出层 {}: {} 个预测, {} 个候选框",
        layer_idx,
        layer_len,
        candidates.len() - before
      );
    }

    let survivors = self.suppressor.suppress(&candidates)?;
    let items: Box<[Detection]> = survivors
      .iter()
      .map(|&idx| Detection::from(candidates[idx]))
      .collect();

    debug!(
      "检测到 {} 个候选框, NMS 后保留 {} 个",
      candidates.len(),
      items.len()
    );

    Ok(DetectResult {
      total_candidates: candidates.len(),
      total_survivors: items.len(),
      items,
    })
  }
}

/// 使用默认抑制范围与预测布局运行一次完整的后处理
pub fn detect<L, P>(
  layers: L,
  image_width: u32,
  image_height: u32,
  probability_minimum: f32,
  iou_threshold: f32,
) -> Result<DetectResult, PostprocessError>
where
  L: IntoIterator,
  L::Item: IntoIterator<Item = P>,
  P: AsRef<[f32]>,
{
  let config = PostprocessConfig::default()
    .with_probability_minimum(probability_minimum)
    .with_iou_threshold(iou_threshold);
  DetectionPipeline::new(config)?.run(layers, image_width, image_height)
}
