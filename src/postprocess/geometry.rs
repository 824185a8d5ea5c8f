// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/geometry.rs - 矩形与 IoU 计算
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

use super::PostprocessError;

/// 原图像素坐标系下的矩形，(x_min, y_min) 为左上角
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub struct Rect {
  pub x_min: i32,
  pub y_min: i32,
  pub width: i32,
  pub height: i32,
}

impl Rect {
  pub const fn new(x_min: i32, y_min: i32, width: i32, height: i32) -> Self {
    Self {
      x_min,
      y_min,
      width,
      height,
    }
  }

  pub fn x_max(&self) -> i64 {
    self.x_min as i64 + self.width as i64
  }

  pub fn y_max(&self) -> i64 {
    self.y_min as i64 + self.height as i64
  }
}

pub fn area(rect: &Rect) -> Result<f32, PostprocessError> {
  if rect.width < 0 || rect.height < 0 {
    return Err(PostprocessError::InvalidGeometry {
      width: rect.width,
      height: rect.height,
    });
  }
  Ok((rect.width as i64 * rect.height as i64) as f32)
}

/// 相离或仅边相接时为 0
pub fn intersection_area(a: &Rect, b: &Rect) -> f32 {
  let x1 = (a.x_min as i64).max(b.x_min as i64);
  let y1 = (a.y_min as i64).max(b.y_min as i64);
  let x2 = a.x_max().min(b.x_max());
  let y2 = a.y_max().min(b.y_max());

  let w = (x2 - x1).max(0);
  let h = (y2 - y1).max(0);
  (w * h) as f32
}

/// 两个面积都为 0 时返回 0 而不是除零
pub fn iou(a: &Rect, b: &Rect) -> Result<f32, PostprocessError> {
  let area_a = area(a)?;
  let area_b = area(b)?;
  let intersection = intersection_area(a, b);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    Ok((intersection / union).clamp(0.0, 1.0))
  } else {
    Ok(0.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn area_of_rect() {
    assert_eq!(area(&Rect::new(3, -4, 10, 5)).unwrap(), 50.0);
    assert_eq!(area(&Rect::new(0, 0, 0, 5)).unwrap(), 0.0);
  }

  #[test]
  fn negative_size_is_invalid_geometry() {
    assert_eq!(
      area(&Rect::new(0, 0, -1, 5)),
      Err(PostprocessError::InvalidGeometry {
        width: -1,
        height: 5
      })
    );
    assert!(iou(&Rect::new(0, 0, 4, 4), &Rect::new(0, 0, 4, -4)).is_err());
  }

  #[test]
  fn iou_with_itself_is_one() {
    let r = Rect::new(10, 20, 30, 40);
    assert_eq!(iou(&r, &r).unwrap(), 1.0);
  }

  #[test]
  fn disjoint_and_touching_rects_do_not_overlap() {
    let a = Rect::new(0, 0, 10, 10);
    let far = Rect::new(50, 50, 10, 10);
    let touching = Rect::new(10, 0, 10, 10);
    assert_eq!(intersection_area(&a, &far), 0.0);
    assert_eq!(iou(&a, &far).unwrap(), 0.0);
    assert_eq!(intersection_area(&a, &touching), 0.0);
    assert_eq!(iou(&a, &touching).unwrap(), 0.0);
  }

  #[test]
  fn partial_overlap() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(0, 0, 10, 6);
    assert_eq!(intersection_area(&a, &b), 60.0);
    assert!((iou(&a, &b).unwrap() - 0.6).abs() < 1e-6);

    let c = Rect::new(5, 5, 10, 10);
    // 25 / (100 + 100 - 25)
    assert!((iou(&a, &c).unwrap() - 25.0 / 175.0).abs() < 1e-6);
  }

  #[test]
  fn degenerate_rects_have_zero_iou() {
    let a = Rect::new(5, 5, 0, 0);
    assert_eq!(iou(&a, &a).unwrap(), 0.0);
  }

  #[test]
  fn iou_is_symmetric() {
    let rects = [
      Rect::new(0, 0, 10, 10),
      Rect::new(3, 4, 12, 2),
      Rect::new(-5, -5, 8, 8),
      Rect::new(100, 100, 1, 1),
      Rect::new(2, 2, 0, 7),
    ];
    for a in &rects {
      for b in &rects {
        assert_eq!(iou(a, b).unwrap(), iou(b, a).unwrap());
      }
    }
  }
}
