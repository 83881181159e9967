//! 导出的分割网络原始输出 → 后处理 → 质心表 → 细胞核 k-NN 图.

use ndarray::Array3;
use std::num::NonZeroUsize;
use wsi_berry::graph::{mean_core_numbers_by_type, nucleus_graph};
use wsi_berry::nucleus::testing::synthetic;
use wsi_berry::nucleus::{
    save_predictions, CentroidRecord, CentroidTable, InstanceMapConfig, NpzPredictions,
    NucleusDetector, PatchGrid,
};
use wsi_berry::slide::ImagePyramid;

#[test]
fn test_exported_predictions_to_core_numbers() {
    let pred = synthetic(80, &[(20, 20, 9, 4), (56, 54, 10, 4)]);
    let path = std::env::temp_dir().join(format!("wsi-berry-{}-pred.npz", std::process::id()));
    save_predictions(&path, [((0, 0), &pred), ((80, 0), &pred)]).unwrap();

    let preds = NpzPredictions::open(NonZeroUsize::new(2).unwrap(), &path).unwrap();
    assert_eq!(preds.locations().unwrap(), vec![(0, 0), (80, 0)]);

    let slide = ImagePyramid::from_base(Array3::zeros((80, 160, 3)), 64, 1);
    let grid = PatchGrid::new((0, 0), (160, 80), 80);
    let detector = NucleusDetector::new(preds, InstanceMapConfig::default());
    let records = detector.detect(&slide, &grid).unwrap();
    #[cfg(feature = "rayon")]
    assert_eq!(detector.par_detect(&slide, &grid).unwrap(), records);
    drop(detector);
    std::fs::remove_file(&path).unwrap();

    let rec = |x, y| CentroidRecord { x, y, kind: 4 };
    assert_eq!(
        records,
        vec![rec(20, 20), rec(54, 56), rec(100, 20), rec(134, 56)]
    );
    let table = CentroidTable::from(records);
    assert_eq!(table.kind_histogram(), vec![0, 0, 0, 0, 4]);

    // 阈值 60 下为路径 0-1-2-3.
    let g = nucleus_graph(&table.records, 4, 3, 60.0).unwrap();
    assert_eq!(g.graph.edge_count(), 3);
    assert_eq!(g.graph.mean_core_number(), Some(1.0));

    let means = mean_core_numbers_by_type(&table.records, 3, 60.0).unwrap();
    assert_eq!(means, [None, None, None, Some(1.0)]);
    let means = mean_core_numbers_by_type(&table.records, 3, 20.0).unwrap();
    assert_eq!(means, [None; 4]);
}
