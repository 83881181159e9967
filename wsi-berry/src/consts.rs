//! 通用常量.

/// RGB 颜色.
pub mod rgb {
    /// 三通道颜色.
    pub type Rgb = [u8; 3];

    /// 黑色.
    pub const BLACK: Rgb = [0x00, 0x00, 0x00];

    /// 白色.
    pub const WHITE: Rgb = [0xFF, 0xFF, 0xFF];

    /// 灰色. 用于绘制 k-NN 图的边.
    pub const GRAY: Rgb = [0x80, 0x80, 0x80];

    /// 蓝色.
    pub const BLUE: Rgb = [0x00, 0x00, 0xFF];

    /// 金色.
    pub const GOLD: Rgb = [0xFF, 0xD7, 0x00];

    /// 草绿色 (lawn green).
    pub const LAWN_GREEN: Rgb = [0x7C, 0xFC, 0x00];

    /// 红色.
    pub const RED: Rgb = [0xFF, 0x00, 0x00];

    /// 细胞核类别 1..=4 的调色板, 下标为 `类别 - 1`.
    pub const NUCLEUS_PALETTE: [Rgb; 4] = [BLUE, GOLD, LAWN_GREEN, RED];
}

/// 读取区域超出切片范围时, 越界像素的填充值 (白色背景).
pub const BACKGROUND_FILL: u8 = u8::MAX;

/// 每个像素的通道数 (RGB).
pub const CHANNELS: usize = 3;

/// 细胞核类别数 (不含背景 0).
pub const NUCLEUS_TYPES: u8 = 4;

/// 组织阈值判定使用的默认小块边长 (像素).
pub const DEFAULT_TILE_SIZE: usize = 64;

/// 默认 patch 边长 (像素).
pub const DEFAULT_PATCH_SIZE: usize = 256;

/// 细胞核图默认近邻数 (含自身).
pub const NUCLEUS_KNN_K: usize = 5;

/// tile 图默认近邻数 (含自身).
pub const TILE_KNN_K: usize = 3;

/// 细胞核图默认距离阈值 (像素).
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 20.0;

/// HoVerNet 后处理默认参数.
pub mod hover {
    /// sobel 核大小.
    pub const SOBEL_KERNEL_SIZE: usize = 21;

    /// 分水岭 marker 阈值.
    pub const MARKER_THRESHOLD: f32 = 0.4;

    /// marker 开运算圆盘半径.
    pub const MARKER_RADIUS: usize = 2;

    /// 小物体过滤阈值 (像素个数).
    pub const MIN_OBJECT_SIZE: usize = 10;

    /// 距离图高斯平滑的 sigma.
    pub const DISTANCE_SIGMA: f32 = 1.0;
}
