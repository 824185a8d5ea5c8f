// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

use serde::Deserialize;

/// 检测模型后端，只负责前向推理
pub trait Model {
  type Input;
  type Error;

  fn predict(&self, input: &Self::Input) -> Result<RawOutputs, Self::Error>;
}

/// 单个输出层的原始预测，每一行为 `[cx, cy, w, h, scores..]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawLayer {
  predictions: Vec<Vec<f32>>,
}

impl RawLayer {
  pub fn from_rows(predictions: Vec<Vec<f32>>) -> Self {
    Self { predictions }
  }

  /// 由扁平张量按行切分，长度不能整除时最后一行较短
  pub fn from_flat(data: &[f32], row_len: usize) -> Self {
    let predictions = if row_len == 0 {
      Vec::new()
    } else {
      data.chunks(row_len).map(<[f32]>::to_vec).collect()
    };
    Self { predictions }
  }

  pub fn len(&self) -> usize {
    self.predictions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.predictions.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
    self.predictions.iter().map(Vec::as_slice)
  }
}

impl<'a> IntoIterator for &'a RawLayer {
  type Item = &'a [f32];
  type IntoIter = std::iter::Map<std::slice::Iter<'a, Vec<f32>>, fn(&'a Vec<f32>) -> &'a [f32]>;

  fn into_iter(self) -> Self::IntoIter {
    self
      .predictions
      .iter()
      .map(Vec::as_slice as fn(&'a Vec<f32>) -> &'a [f32])
  }
}

/// 所有输出层的原始预测
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawOutputs {
  pub layers: Vec<RawLayer>,
}

impl RawOutputs {
  pub fn num_predictions(&self) -> usize {
    self.layers.iter().map(RawLayer::len).sum()
  }
}

mod replay;
pub use self::replay::{ReplayModel, ReplayModelBuilder, ReplayModelError};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flat_tensor_is_split_into_rows() {
    let data = [0.5, 0.5, 0.1, 0.1, 0.9, 0.2, 0.2, 0.1, 0.1, 0.3, 0.7];
    let layer = RawLayer::from_flat(&data, 5);
    assert_eq!(layer.len(), 3);
    let rows: Vec<&[f32]> = layer.iter().collect();
    assert_eq!(rows[1], &[0.2, 0.2, 0.1, 0.1, 0.3]);
    // 剩余的单个数值成为一行短预测
    assert_eq!(rows[2], &[0.7]);
    assert!(RawLayer::from_flat(&data, 0).is_empty());
  }

  #[test]
  fn outputs_deserialize_from_json() {
    let outputs: RawOutputs =
      serde_json::from_str(r#"{"layers": [[[0.5, 0.5, 0.2, 0.2, 0.9]], []]}"#).unwrap();
    assert_eq!(outputs.layers.len(), 2);
    assert_eq!(outputs.num_predictions(), 1);
    assert!(outputs.layers[1].is_empty());
  }
}
