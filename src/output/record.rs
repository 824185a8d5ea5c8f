// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/record.rs - 检测结果记录
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

use std::path::Path;

use serde::Serialize;

use crate::{
  label::LabelTable,
  postprocess::{DetectResult, Detection},
};

#[derive(Debug, Serialize)]
struct DetectionRecord<'a> {
  label: std::borrow::Cow<'a, str>,
  #[serde(flatten)]
  detection: &'a Detection,
}

#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
  total_candidates: usize,
  total_survivors: usize,
  detections: Vec<DetectionRecord<'a>>,
}

/// 以 JSON 记录检测结果
pub struct Record<'a> {
  labels: &'a LabelTable,
}

impl<'a> Record<'a> {
  pub fn new(labels: &'a LabelTable) -> Self {
    Self { labels }
  }

  pub fn to_json(&self, result: &DetectResult) -> Result<String, serde_json::Error> {
    let record = ResultRecord {
      total_candidates: result.total_candidates,
      total_survivors: result.total_survivors,
      detections: result
        .items
        .iter()
        .map(|detection| DetectionRecord {
          label: self.labels.display_name(detection.class_id),
          detection,
        })
        .collect(),
    };
    serde_json::to_string_pretty(&record)
  }

  /// 写入 `path` 同名的 `.json` 文件
  pub fn record(&self, result: &DetectResult, path: &Path) -> Result<(), std::io::Error> {
    let json = self.to_json(result).map_err(std::io::Error::other)?;
    std::fs::write(path.with_extension("json"), json)
  }
}
