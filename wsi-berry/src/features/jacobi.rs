//! 实对称矩阵特征分解 (循环 Jacobi 旋转).

use ndarray::{Array1, Array2};

/// 最大扫描轮数. 对小规模协方差矩阵通常 10 轮以内收敛.
const MAX_SWEEPS: usize = 100;

/// 对称矩阵 `a` 的特征值与特征向量 (按列), 特征值未排序.
///
/// # 注意
///
/// 只读取上三角并假定 `a` 对称; `a` 不是方阵时程序 panic.
pub(crate) fn symmetric_eigen(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "只能分解方阵");
    let mut v = Array2::<f64>::eye(n);

    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);
    for sweep in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
            .map(|(p, q)| a[(p, q)] * a[(p, q)])
            .sum();
        if off <= scale * 1e-30 {
            log::trace!("jacobi converged after {sweep} sweeps");
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                let apq = a[(p, q)];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                rotate(&mut a, &mut v, p, q, c, s);
            }
        }
    }
    (a.diag().to_owned(), v)
}

/// `a ← Jᵀ a J`, `v ← v J`, 其中 `J` 为 `(p, q)` 平面上的旋转.
fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    let n = a.nrows();
    for k in 0..n {
        let (kp, kq) = (a[(k, p)], a[(k, q)]);
        a[(k, p)] = c * kp - s * kq;
        a[(k, q)] = s * kp + c * kq;
    }
    for k in 0..n {
        let (pk, qk) = (a[(p, k)], a[(q, k)]);
        a[(p, k)] = c * pk - s * qk;
        a[(q, k)] = s * pk + c * qk;
    }
    for k in 0..n {
        let (kp, kq) = (v[(k, p)], v[(k, q)]);
        v[(k, p)] = c * kp - s * kq;
        v[(k, q)] = s * kp + c * kq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_two_by_two() {
        let (w, v) = symmetric_eigen(array![[2.0, 1.0], [1.0, 2.0]]);
        let mut ws = w.to_vec();
        ws.sort_by(f64::total_cmp);
        assert!((ws[0] - 1.0).abs() < 1e-12);
        assert!((ws[1] - 3.0).abs() < 1e-12);
        // 列向量正交归一.
        let vtv = v.t().dot(&v);
        assert!((vtv[(0, 0)] - 1.0).abs() < 1e-12);
        assert!(vtv[(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn test_reconstruction() {
        let a = array![
            [4.0, 1.0, -2.0, 2.0],
            [1.0, 2.0, 0.0, 1.0],
            [-2.0, 0.0, 3.0, -2.0],
            [2.0, 1.0, -2.0, -1.0]
        ];
        let (w, v) = symmetric_eigen(a.clone());
        let back = v.dot(&Array2::from_diag(&w)).dot(&v.t());
        for (x, y) in back.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }
}
