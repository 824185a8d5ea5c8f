// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 检测任务
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

use tracing::info;

use crate::{
  input::ImageSize,
  label::LabelTable,
  model::Model,
  output::Render,
  postprocess::{DetectResult, DetectionPipeline},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  type Output;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 读取一帧，推理、后处理并渲染一次
pub struct OneShotTask {
  pipeline: DetectionPipeline,
  labels: LabelTable,
}

impl OneShotTask {
  pub fn new(pipeline: DetectionPipeline) -> Self {
    Self {
      pipeline,
      labels: LabelTable::default(),
    }
  }

  /// 仅用于日志中的类别名称
  pub fn with_labels(mut self, labels: LabelTable) -> Self {
    self.labels = labels;
    self
  }
}

impl<
  F: ImageSize,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Error = ME>,
  O: Render<F, DetectResult, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;
  type Output = DetectResult;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let (width, height) = frame.image_size();
    info!("输入帧获取成功 ({}x{})，开始推理...", width, height);

    let now = std::time::Instant::now();
    let raw = model.predict(&frame)?;
    info!("推理完成，耗时: {:.5?}", now.elapsed());

    let result = self.pipeline.run(&raw.layers, width, height)?;
    for (counter, detection) in result.items.iter().enumerate() {
      info!(
        "目标 {}: {} ({:.4})",
        counter + 1,
        self.labels.display_name(detection.class_id),
        detection.confidence
      );
    }
    info!("检测到的目标总数: {}", result.total_candidates);
    info!("NMS 后剩余目标数: {}", result.total_survivors);

    let now = std::time::Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}
