// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/replay.rs - 回放模型：从文件读取记录好的原始输出
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
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decode_url_path,
  model::{Model, RawOutputs},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型输出解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

/// 每次推理都返回同一份记录好的原始输出
pub struct ReplayModel<Frame> {
  outputs: RawOutputs,
  _phantom: std::marker::PhantomData<Frame>,
}

pub struct ReplayModelBuilder {
  model_path: String,
  expected_layers: Option<usize>,
}

impl FromUrlWithScheme for ReplayModelBuilder {
  const SCHEME: &'static str = "json";
}

impl FromUrl for ReplayModelBuilder {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let model_path =
      decode_url_path(url).map_err(|e| ReplayModelError::ModelPathError(e.to_string()))?;

    let mut expected_layers = None;
    for (k, v) in url.query_pairs() {
      if k == "layers" {
        let n = v
          .parse::<usize>()
          .map_err(|e| ReplayModelError::ModelPathError(format!("layers 参数无效: {}", e)))?;
        expected_layers = Some(n);
      }
    }

    Ok(ReplayModelBuilder {
      model_path,
      expected_layers,
    })
  }
}

impl ReplayModelBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      expected_layers: None,
    }
  }

  pub fn expected_layers(mut self, expected_layers: Option<usize>) -> Self {
    self.expected_layers = expected_layers;
    self
  }

  pub fn build<Frame>(self) -> Result<ReplayModel<Frame>, ReplayModelError> {
    info!("加载模型输出文件: {}", self.model_path);
    let data = std::fs::read(&self.model_path)?;
    debug!("模型输出文件大小: {:.2} KB", data.len() as f64 / 1024.0);

    let outputs: RawOutputs = serde_json::from_slice(&data)?;

    if let Some(expected) = self.expected_layers
      && outputs.layers.len() != expected
    {
      error!(
        "预期模型输出层数为 {}, 实际为 {}",
        expected,
        outputs.layers.len()
      );
      return Err(ReplayModelError::ModelInvalid(format!(
        "预期模型输出层数为 {}, 实际为 {}",
        expected,
        outputs.layers.len()
      )));
    }

    debug!("模型输出层数: {}", outputs.layers.len());
    debug!("原始预测数量: {}", outputs.num_predictions());
    info!("模型加载完成");

    Ok(ReplayModel {
      outputs,
      _phantom: std::marker::PhantomData,
    })
  }
}

impl<Frame> ReplayModel<Frame> {
  pub fn from_outputs(outputs: RawOutputs) -> Self {
    Self {
      outputs,
      _phantom: std::marker::PhantomData,
    }
  }
}

impl<Frame> Model for ReplayModel<Frame> {
  type Input = Frame;
  type Error = ReplayModelError;

  fn predict(&self, _input: &Self::Input) -> Result<RawOutputs, Self::Error> {
    debug!("回放模型输出");
    Ok(self.outputs.clone())
  }
}
