//! 实验结果的持久化.
//!
//! 结构化结果 (tile 索引, 质心表等) 以 zlib 压缩的 `bincode` 字节流保存 (需要 `serde` feature);
//! 节点表/边表另可导出为带表头的 TSV, 便于外部工具查看.

use crate::graph::{EdgeList, NodeTable};
use crate::nucleus::CentroidTable;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};

#[cfg(feature = "serde")]
use serde::{de::DeserializeOwned, Serialize};

/// 持久化错误.
#[derive(Debug)]
pub enum StoreError {
    /// 底层 I/O 错误.
    Io(io::Error),

    /// 编解码错误.
    #[cfg(feature = "serde")]
    Bincode(bincode::Error),
}

/// 持久化结果.
pub type StoreResult<T> = Result<T, StoreError>;

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "serde")]
            Self::Bincode(e) => write!(f, "bincode error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "serde")]
            Self::Bincode(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "serde")]
impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        Self::Bincode(e)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "serde")] {
        use flate2::read::ZlibDecoder;
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::fs::File;
        use std::io::{BufReader, BufWriter};
        use std::path::Path;

        /// 把 `value` 编码后压缩写入 `writer`.
        pub fn write_compressed<T: Serialize, W: Write>(writer: W, value: &T) -> StoreResult<()> {
            let mut e = ZlibEncoder::new(writer, Compression::best());
            bincode::serialize_into(&mut e, value)?;
            e.finish()?.flush()?;
            Ok(())
        }

        /// 从 `reader` 解压并解码.
        pub fn read_compressed<T: DeserializeOwned, R: io::Read>(reader: R) -> StoreResult<T> {
            Ok(bincode::deserialize_from(ZlibDecoder::new(reader))?)
        }

        /// 保存到文件 `path`. 已存在时覆盖.
        pub fn save<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> StoreResult<()> {
            let path = path.as_ref();
            write_compressed(BufWriter::new(File::create(path)?), value)?;
            log::info!("saved {}", path.display());
            Ok(())
        }

        /// 从文件 `path` 读取.
        pub fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> StoreResult<T> {
            read_compressed(BufReader::new(File::open(path)?))
        }
    }
}

/// 可按行导出为 TSV 的表.
pub trait TsvTable {
    /// 表头各列名.
    fn header(&self) -> &'static [&'static str];

    /// 逐行写出 (不含表头), 每行以 `\n` 结束.
    fn write_rows(&self, w: &mut dyn Write) -> io::Result<()>;
}

impl TsvTable for NodeTable {
    fn header(&self) -> &'static [&'static str] {
        &["x", "y", "vertex"]
    }

    fn write_rows(&self, w: &mut dyn Write) -> io::Result<()> {
        for n in &self.nodes {
            writeln!(w, "{}\t{}\t{}", n.x, n.y, n.vertex)?;
        }
        Ok(())
    }
}

impl TsvTable for EdgeList {
    fn header(&self) -> &'static [&'static str] {
        &["source", "target", "weight"]
    }

    fn write_rows(&self, w: &mut dyn Write) -> io::Result<()> {
        for e in self {
            writeln!(w, "{}\t{}\t{}", e.source, e.target, e.weight)?;
        }
        Ok(())
    }
}

impl TsvTable for CentroidTable {
    fn header(&self) -> &'static [&'static str] {
        &["x", "y", "type"]
    }

    fn write_rows(&self, w: &mut dyn Write) -> io::Result<()> {
        for r in &self.records {
            writeln!(w, "{}\t{}\t{}", r.x, r.y, r.kind)?;
        }
        Ok(())
    }
}

/// 写出表头与所有行.
pub fn write_table_tsv<T: TsvTable + ?Sized, W: Write>(mut w: W, table: &T) -> StoreResult<()> {
    writeln!(w, "{}", table.header().join("\t"))?;
    table.write_rows(&mut w)?;
    w.flush()?;
    Ok(())
}
