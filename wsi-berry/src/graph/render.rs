//! 把 k-NN 图与统计量静态地绘制为 PNG.
//!
//! 只依赖 `image` 的像素缓冲, 不做抗锯齿. 坐标 `x` 向右, `y` 向下, 与切片坐标一致.

use super::{EdgeList, GraphResult, NodeTable, SpatialGraph};
use crate::consts::rgb::{Rgb, BLACK, GRAY, WHITE};
use crate::Size2d;
use image::{Rgb as Pixel, RgbImage};
use std::path::Path;

/// 边的默认不透明度.
pub const EDGE_ALPHA: f32 = 0.5;

/// 节点方块默认半径 (像素).
pub const NODE_RADIUS: u32 = 1;

/// 绘制图的画布. 节点坐标经线性缩放后落在留白以内.
pub struct GraphCanvas {
    image: RgbImage,
    origin: (f64, f64),
    scale: f64,
    margin: u32,
}

impl GraphCanvas {
    /// 创建白色背景画布, 使 `nodes` 的包围盒等比缩放后恰好放入 `size` 减去四周 `margin`.
    ///
    /// # 注意
    ///
    /// `size` 的任一边不大于 `2 * margin` 时程序 panic.
    pub fn fit(nodes: &NodeTable, (w, h): Size2d, margin: u32) -> Self {
        assert!(
            w as u32 > 2 * margin && h as u32 > 2 * margin,
            "画布 {w}x{h} 放不下 {margin} 像素的留白"
        );
        let inner_w = (w as u32 - 2 * margin - 1) as f64;
        let inner_h = (h as u32 - 2 * margin - 1) as f64;
        let (origin, scale) = match nodes.bounds() {
            Some([lo, hi]) => {
                let sx = inner_w / (hi.0 - lo.0).max(f64::EPSILON);
                let sy = inner_h / (hi.1 - lo.1).max(f64::EPSILON);
                (lo, sx.min(sy))
            }
            None => ((0.0, 0.0), 1.0),
        };
        Self {
            image: RgbImage::from_pixel(w as u32, h as u32, Pixel(WHITE)),
            origin,
            scale,
            margin,
        }
    }

    /// 数据坐标对应的像素坐标 (可能落在画布外).
    #[inline]
    pub fn project(&self, x: f64, y: f64) -> (i64, i64) {
        let m = self.margin as f64;
        (
            ((x - self.origin.0) * self.scale + m).round() as i64,
            ((y - self.origin.1) * self.scale + m).round() as i64,
        )
    }

    /// 以 `alpha` 不透明度把 `color` 混合到 `(x, y)` 像素上. 越界时忽略.
    fn blend(&mut self, (x, y): (i64, i64), color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        for (dst, &src) in px.0.iter_mut().zip(color.iter()) {
            *dst = (src as f32 * alpha + *dst as f32 * (1.0 - alpha)).round() as u8;
        }
    }

    /// 画线段 (Bresenham). 每个像素只混合一次.
    fn line(&mut self, a: (i64, i64), b: (i64, i64), color: Rgb, alpha: f32) {
        let (mut x, mut y) = a;
        let dx = (b.0 - a.0).abs();
        let dy = -(b.1 - a.1).abs();
        let sx = if a.0 < b.0 { 1 } else { -1 };
        let sy = if a.1 < b.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.blend((x, y), color, alpha);
            if (x, y) == b {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 以灰色半透明线段绘制所有边. 边的端点必须是 `nodes` 中的顶点编号.
    pub fn draw_edges(&mut self, nodes: &NodeTable, edges: &EdgeList, alpha: f32) {
        for e in edges {
            let (Some(a), Some(b)) = (nodes.nodes.get(e.source), nodes.nodes.get(e.target)) else {
                log::warn!("edge ({}, {}) refers to a missing node", e.source, e.target);
                continue;
            };
            let pa = self.project(a.x, a.y);
            let pb = self.project(b.x, b.y);
            self.line(pa, pb, GRAY, alpha);
        }
    }

    /// 以边长 `2 * radius + 1` 的实心方块绘制所有节点.
    pub fn draw_nodes(&mut self, nodes: &NodeTable, color: Rgb, radius: u32) {
        let r = radius as i64;
        for n in &nodes.nodes {
            let (cx, cy) = self.project(n.x, n.y);
            for y in cy - r..=cy + r {
                for x in cx - r..=cx + r {
                    self.blend((x, y), color, 1.0);
                }
            }
        }
    }

    /// 画布图像.
    #[inline]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// 取出画布图像.
    #[inline]
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// 保存为图片, 格式由扩展名决定.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GraphResult<()> {
        self.image.save(path)?;
        Ok(())
    }
}

/// 以默认样式绘制整张图: 先画边, 再画节点.
pub fn render_graph(g: &SpatialGraph, size: Size2d) -> RgbImage {
    let mut canvas = GraphCanvas::fit(&g.nodes, size, 8);
    canvas.draw_edges(&g.nodes, &g.edges, EDGE_ALPHA);
    canvas.draw_nodes(&g.nodes, g.color, NODE_RADIUS);
    canvas.into_image()
}

/// 柱状图. 第 `i` 根柱子颜色为 `colors[i % colors.len()]`, 高度按最大值归一化.
///
/// 值为 `None` 的位置留空. 底部画一条黑色基线.
pub fn render_bar_chart(values: &[Option<f64>], colors: &[Rgb], (w, h): Size2d) -> RgbImage {
    let mut img = RgbImage::from_pixel(w as u32, h as u32, Pixel(WHITE));
    if values.is_empty() || w == 0 || h < 2 {
        return img;
    }
    let max = values
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max);
    let slot = w / values.len();
    let bar = (slot * 2 / 3).max(1);
    let base = h - 1;

    for (i, v) in values.iter().enumerate() {
        let Some(v) = *v else { continue };
        if max <= 0.0 || colors.is_empty() {
            continue;
        }
        let bh = ((v / max) * (base as f64 * 0.9)).round() as usize;
        let x0 = i * slot + (slot - bar) / 2;
        let color = Pixel(colors[i % colors.len()]);
        for y in base - bh..base {
            for x in x0..(x0 + bar).min(w) {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
    for x in 0..w {
        img.put_pixel(x as u32, base as u32, Pixel(BLACK));
    }
    img
}
