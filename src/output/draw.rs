// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use tracing::{debug, info};

use crate::{
  label::LabelTable,
  postprocess::{DetectResult, Detection},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
// 文本基线距离边框上沿的距离
const LABEL_BASELINE_OFFSET: i32 = 5;
const BOX_THICKNESS: i32 = 2;
// 黄金分割比，用于在色环上均匀分布各类别的颜色
const GOLDEN_RATIO_CONJUGATE: f32 = 0.618_034;

#[derive(thiserror::Error, Debug)]
pub enum FontLoadError {
  #[error("字体文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 每个类别的颜色只由类别下标决定
pub fn class_color(class_id: u32) -> Rgb<u8> {
  let hue = (class_id as f32 * GOLDEN_RATIO_CONJUGATE).fract() * 360.0;
  hsv_to_rgb(hue, 0.8, 0.9)
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

/// 在图像上绘制检测框与标签
///
/// 没有配置字体时只绘制边框。
#[derive(Clone)]
pub struct Draw {
  labels: LabelTable,
  font: Option<FontArc>,
  font_size: f32,
}

impl Default for Draw {
  fn default() -> Self {
    Self::new(LabelTable::default())
  }
}

impl Draw {
  pub fn new(labels: LabelTable) -> Self {
    Self {
      labels,
      font: None,
      font_size: LABEL_FONT_SIZE,
    }
  }

  pub fn with_labels(mut self, labels: LabelTable) -> Self {
    self.labels = labels;
    self
  }

  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self, FontLoadError> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontArc::try_from_vec(data)?;
    info!("加载字体文件: {}", path.as_ref().display());
    Ok(self.with_font(font))
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  /// 标签文本，如 `dog: 0.9312`
  pub fn label_text(&self, detection: &Detection) -> String {
    format!(
      "{}: {:.4}",
      self.labels.display_name(detection.class_id),
      detection.confidence
    )
  }

  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectResult) {
    for detection in result.items.iter() {
      self.draw_bbox_with_label(image, detection);
    }
    debug!("绘制 {} 个检测框", result.items.len());
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection) {
    let rect = detection.rect;
    let color = class_color(detection.class_id);

    // 绘制边框（加粗为2像素），越界部分由 imageproc 裁剪
    for thickness in 0..BOX_THICKNESS {
      let width = rect.width - 2 * thickness;
      let height = rect.height - 2 * thickness;
      if width <= 0 || height <= 0 {
        break;
      }
      let bbox = imageproc::rect::Rect::at(rect.x_min + thickness, rect.y_min + thickness)
        .of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, bbox, color);
    }

    if let Some(font) = &self.font {
      let text_y = rect.y_min - LABEL_BASELINE_OFFSET - self.font_size as i32;
      draw_text_mut(
        image,
        color,
        rect.x_min,
        text_y,
        PxScale::from(self.font_size),
        font,
        &self.label_text(detection),
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::postprocess::Rect;

  #[test]
  fn class_colors_are_deterministic_and_distinct() {
    assert_eq!(class_color(3), class_color(3));
    assert_ne!(class_color(0), class_color(1));
    assert_ne!(class_color(1), class_color(2));
  }

  #[test]
  fn label_text_uses_names_and_falls_back_to_id() {
    let draw = Draw::new(["person", "dog"].into_iter().collect());
    let mut detection = Detection {
      rect: Rect::new(0, 0, 4, 4),
      class_id: 1,
      confidence: 0.93125,
    };
    assert_eq!(draw.label_text(&detection), "dog: 0.9312");
    detection.class_id = 9;
    assert!(draw.label_text(&detection).starts_with("9: "));
  }

  #[test]
  fn draws_box_outline_in_class_color() {
    let mut image = RgbImage::new(20, 20);
    let result = DetectResult {
      items: vec![
        Detection {
          rect: Rect::new(2, 3, 10, 8),
          class_id: 4,
          confidence: 0.9,
        },
        // 越界与零尺寸的框不会导致崩溃
        Detection {
          rect: Rect::new(15, 15, 30, 30),
          class_id: 1,
          confidence: 0.8,
        },
        Detection {
          rect: Rect::new(5, 5, 0, 0),
          class_id: 2,
          confidence: 0.7,
        },
      ]
      .into_boxed_slice(),
      total_candidates: 3,
      total_survivors: 3,
    };
    Draw::default().draw_detections(&mut image, &result);

    let color = class_color(4);
    assert_eq!(*image.get_pixel(2, 3), color);
    assert_eq!(*image.get_pixel(3, 4), color);
    assert_eq!(*image.get_pixel(11, 10), color);
    assert_eq!(*image.get_pixel(6, 6), Rgb([0, 0, 0]));
  }
}
