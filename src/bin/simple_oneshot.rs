// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像检测
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::RgbImage;
use url::Url;

use shanan_postprocess::{
  FromUrl,
  input::ImageFileInput,
  label::LabelTable,
  model::{ReplayModel, ReplayModelBuilder},
  output::{OutputWrapper, draw::Draw},
  postprocess::{
    DEFAULT_IOU_THRESHOLD, DEFAULT_PROBABILITY_MINIMUM, DetectionPipeline, PostprocessConfig,
    ScoreLayout, SuppressionScope,
  },
  task::{OneShotTask, Task},
};
use tracing::info;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Layout {
  /// [cx, cy, w, h, class_scores..]
  ClassScores,
  /// [cx, cy, w, h, objectness, class_scores..]
  Darknet,
}

impl From<Layout> for ScoreLayout {
  fn from(layout: Layout) -> Self {
    match layout {
      Layout::ClassScores => ScoreLayout::ClassScores,
      Layout::Darknet => ScoreLayout::Darknet,
    }
  }
}

/// Shanan 单张图像检测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型原始输出文件，如 json:///path/outputs.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，如 image:///path/input.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，如 image:///path/out.png 或 folder:///path/records
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 类别标签文件，如 labels:///path/coco.names
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<Url>,
  /// 绘制标签文字所用的字体文件
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_PROBABILITY_MINIMUM, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub nms_threshold: f32,
  /// 不区分类别进行 NMS
  #[arg(long)]
  pub class_agnostic: bool,
  /// 原始预测向量的布局
  #[arg(long, value_enum, default_value = "class-scores")]
  layout: Layout,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);

  let labels = match &args.labels {
    Some(url) => LabelTable::from_url(url).with_context(|| format!("无法加载标签: {}", url))?,
    None => LabelTable::default(),
  };

  let scope = if args.class_agnostic {
    SuppressionScope::ClassAgnostic
  } else {
    SuppressionScope::PerClass
  };
  let config = PostprocessConfig::default()
    .with_probability_minimum(args.confidence)
    .with_iou_threshold(args.nms_threshold)
    .with_scope(scope)
    .with_layout(args.layout.into())
    .with_class_count((labels.class_count() > 0).then_some(labels.class_count()));
  let pipeline = DetectionPipeline::new(config)?;

  let mut draw = Draw::new(labels.clone());
  if let Some(font) = &args.font {
    draw = draw.with_font_file(font)?;
  }

  let input_image = ImageFileInput::from_url(&args.input)?;
  let model: ReplayModel<RgbImage> = ReplayModelBuilder::from_url(&args.model)?.build()?;
  let output = OutputWrapper::from_url(&args.output)?.with_draw(draw);

  let result = OneShotTask::new(pipeline)
    .with_labels(labels)
    .run_task(input_image, model, output)?;

  info!(
    "处理完成: {} 个候选框, {} 个检测结果",
    result.total_candidates, result.total_survivors
  );

  Ok(())
}
