// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 类别标签表
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

use std::borrow::Cow;

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decode_url_path};

#[derive(Error, Debug)]
pub enum LabelTableError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签路径错误: {0}")]
  PathError(String),
}

/// 类别下标到名称的映射，每行一个名称（如 coco.names）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl FromUrlWithScheme for LabelTable {
  const SCHEME: &'static str = "labels";
}

impl FromUrl for LabelTable {
  type Error = LabelTableError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(LabelTableError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = decode_url_path(url).map_err(|e| LabelTableError::PathError(e.to_string()))?;
    let text = std::fs::read_to_string(&path)?;
    let table = LabelTable::parse(&text);
    debug!("从 {} 加载 {} 个类别标签", path, table.class_count());
    Ok(table)
  }
}

impl LabelTable {
  /// 名称两端空白会被去掉，末尾的空行被忽略
  pub fn parse(text: &str) -> Self {
    let mut names: Vec<String> = text.lines().map(|line| line.trim().to_string()).collect();
    while names.last().is_some_and(String::is_empty) {
      names.pop();
    }
    Self {
      names: names.into_boxed_slice(),
    }
  }

  pub fn class_count(&self) -> usize {
    self.names.len()
  }

  pub fn name(&self, class_id: u32) -> Option<&str> {
    self.names.get(class_id as usize).map(String::as_str)
  }

  /// 未知类别显示为数字下标
  pub fn display_name(&self, class_id: u32) -> Cow<'_, str> {
    match self.name(class_id) {
      Some(name) => Cow::Borrowed(name),
      None => Cow::Owned(class_id.to_string()),
    }
  }
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn parses_names_file() {
    let table = LabelTable::parse("person\n bicycle \ncar\n\n\n");
    assert_eq!(table.class_count(), 3);
    assert_eq!(table.name(1), Some("bicycle"));
    assert_eq!(table.name(3), None);
    assert_eq!(table.display_name(2), "car");
    assert_eq!(table.display_name(7), "7");
  }

  #[test]
  fn loads_from_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "person\ndog").unwrap();
    let url = Url::parse(&format!("labels://{}", file.path().display())).unwrap();
    let table = LabelTable::from_url(&url).unwrap();
    assert_eq!(table.class_count(), 2);
    assert_eq!(table.name(1), Some("dog"));

    let wrong = Url::parse("image:///tmp/x.png").unwrap();
    assert!(matches!(
      LabelTable::from_url(&wrong),
      Err(LabelTableError::SchemeMismatch(_))
    ));
  }
}
