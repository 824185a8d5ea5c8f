// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/decode.rs - 边界框坐标解码
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

use super::geometry::Rect;

/// 将归一化的 (cx, cy, bw, bh) 解码为原图像素坐标下的矩形
///
/// 坐标按 (W, H, W, H) 逐元素缩放，再由中心点换算为左上角。
/// 所有坐标向零截断取整（不是四舍五入），结果可复现。
/// 超出图像范围的框不做裁剪，由调用方决定是否需要。
pub fn decode_box(
  cx: f32,
  cy: f32,
  bw: f32,
  bh: f32,
  image_width: u32,
  image_height: u32,
) -> Rect {
  let (w, h) = (image_width as f32, image_height as f32);

  let x_center = cx * w;
  let y_center = cy * h;
  let box_width = bw * w;
  let box_height = bh * h;

  Rect {
    x_min: (x_center - box_width / 2.0) as i32,
    y_min: (y_center - box_height / 2.0) as i32,
    width: box_width as i32,
    height: box_height as i32,
  }
}
