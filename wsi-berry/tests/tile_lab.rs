//! 切片 → 组织小块 → tile 索引持久化 → tile k-NN 图.

use ndarray::{s, Array3};
use ndarray_npy::NpzWriter;
use std::fs::File;
use std::path::PathBuf;
use wsi_berry::graph::{render_graph, tile_graph};
use wsi_berry::nucleus::PatchGrid;
use wsi_berry::slide::{open_slide, Backend, PyramidRead};
use wsi_berry::tiling::{
    chunk_evenly, threshold_tiles, tile_origins, TileIndex, TissueThreshold,
};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("wsi-berry-{}-{name}", std::process::id()))
}

/// 256 x 256 白色切片, `y ∈ [64, 192)`, `x ∈ [0, 128)` 为深色组织.
fn write_slide() -> PathBuf {
    let mut level0 = Array3::<u8>::from_elem((256, 256, 3), 255);
    level0.slice_mut(s![64..192, 0..128, ..]).fill(100);
    let level1 = Array3::<u8>::from_elem((128, 128, 3), 255);

    let path = temp_path("slide.npz");
    let mut npz = NpzWriter::new(File::create(&path).unwrap());
    npz.add_array("level_0", &level0).unwrap();
    npz.add_array("level_1", &level1).unwrap();
    npz.finish().unwrap();
    path
}

#[test]
fn test_tissue_tiles_to_graph() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();

    let path = write_slide();
    assert_eq!(Backend::from_path(&path), Backend::Npz);
    let slide = open_slide(&path, Backend::Npz).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(slide.level_dimensions_all(), vec![(256, 256), (128, 128)]);

    let patches = PatchGrid::new((0, 0), (256, 256), 128).locations();
    let starts = tile_origins(&patches, 128, 64);
    assert_eq!(starts.len(), 16);

    let threshold = TissueThreshold::default();
    let tiles = threshold_tiles(&slide, &starts, 64, &threshold).unwrap();
    let index: TileIndex = tiles.iter().collect();
    assert_eq!(index.coords, vec![(0, 64), (64, 64), (0, 128), (64, 128)]);

    #[cfg(feature = "rayon")]
    {
        let chunks = chunk_evenly(&starts, 3);
        let par = wsi_berry::tiling::par_threshold_tiles(&slide, &chunks, 64, &threshold).unwrap();
        let par_index: TileIndex = par.iter().collect();
        assert_eq!(par_index, index);
    }
    #[cfg(not(feature = "rayon"))]
    assert_eq!(chunk_evenly(&starts, 3).len(), 3);

    #[cfg(feature = "serde")]
    let index = {
        let p = temp_path("tiles.bin");
        wsi_berry::store::save(&p, &index).unwrap();
        let back: TileIndex = wsi_berry::store::load(&p).unwrap();
        std::fs::remove_file(&p).unwrap();
        assert_eq!(back, index);
        back
    };

    // 2x2 网格: 每个 tile 的两个近邻都相距 64.
    let g = tile_graph(&index, 3).unwrap();
    assert_eq!(g.edges.len(), 8);
    assert!(g.edges.iter().all(|e| e.weight == 64.0));
    assert_eq!(g.graph.edge_count(), 4);
    assert_eq!(g.graph.mean_core_number(), Some(2.0));

    let png = temp_path("tiles.png");
    render_graph(&g, (64, 48)).save(&png).unwrap();
    let back = image::open(&png).unwrap().to_rgb8();
    std::fs::remove_file(&png).unwrap();
    assert_eq!(back.dimensions(), (64, 48));
}
