// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
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

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

pub mod record;

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

#[cfg(feature = "save_image_file")]
mod wrapper {
  use image::RgbImage;
  use url::Url;

  #[cfg(feature = "directory_record")]
  use super::DirectoryRecordOutput;
  use super::{OutputError, Render, SaveImageFileOutput, draw::Draw};
  use crate::{FromUrl, FromUrlWithScheme, postprocess::DetectResult};

  pub enum OutputWrapper {
    SaveImageFileOutput(SaveImageFileOutput),
    #[cfg(feature = "directory_record")]
    DirectoryRecordOutput(DirectoryRecordOutput),
  }

  impl FromUrl for OutputWrapper {
    type Error = OutputError;

    fn from_url(url: &Url) -> Result<Self, Self::Error> {
      match url.scheme() {
        SaveImageFileOutput::SCHEME => {
          let output = SaveImageFileOutput::from_url(url)?;
          Ok(OutputWrapper::SaveImageFileOutput(output))
        }
        #[cfg(feature = "directory_record")]
        DirectoryRecordOutput::SCHEME => {
          let output = DirectoryRecordOutput::from_url(url)?;
          Ok(OutputWrapper::DirectoryRecordOutput(output))
        }
        _ => Err(OutputError::SchemeMismatch),
      }
    }
  }

  impl OutputWrapper {
    pub fn with_draw(self, draw: Draw) -> Self {
      match self {
        OutputWrapper::SaveImageFileOutput(output) => {
          OutputWrapper::SaveImageFileOutput(output.with_draw(draw))
        }
        #[cfg(feature = "directory_record")]
        OutputWrapper::DirectoryRecordOutput(output) => {
          OutputWrapper::DirectoryRecordOutput(output.with_draw(draw))
        }
      }
    }
  }

  impl Render<RgbImage, DetectResult> for OutputWrapper {
    type Error = OutputError;

    fn render_result(&self, frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
      match self {
        OutputWrapper::SaveImageFileOutput(output) => output
          .render_result(frame, result)
          .map_err(OutputError::from),
        #[cfg(feature = "directory_record")]
        OutputWrapper::DirectoryRecordOutput(output) => output
          .render_result(frame, result)
          .map_err(OutputError::from),
      }
    }
  }
}

#[cfg(feature = "save_image_file")]
pub use self::wrapper::OutputWrapper;
