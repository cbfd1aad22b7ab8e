use faer::linalg::solvers::SolveLstsqCore;
use glam::DVec2;
use nalgebra as na;

/// Similarity transform moving the centroid to the origin and the mean
/// distance to sqrt(2).
fn normalization(pts: &[DVec2]) -> Option<na::Matrix3<f64>> {
    let n = pts.len() as f64;
    let centroid = pts.iter().fold(DVec2::ZERO, |acc, p| acc + *p) / n;
    let mean_dist = pts.iter().map(|p| (*p - centroid).length()).sum::<f64>() / n;
    if mean_dist < f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(na::Matrix3::new(
        s,
        0.0,
        -s * centroid.x,
        0.0,
        s,
        -s * centroid.y,
        0.0,
        0.0,
        1.0,
    ))
}

fn apply(t: &na::Matrix3<f64>, p: &DVec2) -> DVec2 {
    DVec2::new(
        t[(0, 0)] * p.x + t[(0, 2)],
        t[(1, 1)] * p.y + t[(1, 2)],
    )
}

/// Least-squares homography with `h22` fixed to 1, `dst ~ H * src`.
///
/// Inputs are Hartley-normalized before the solve. Needs at least four pairs;
/// returns `None` when the system has no finite solution.
pub fn solve_homography(src: &[DVec2], dst: &[DVec2]) -> Option<na::Matrix3<f64>> {
    if src.len() < 4 || src.len() != dst.len() {
        return None;
    }
    let t_src = normalization(src)?;
    let t_dst = normalization(dst)?;

    let rows = src.len() * 2;
    let mut a: faer::Mat<f64> = faer::Mat::zeros(rows, 8);
    let mut b: faer::Mat<f64> = faer::Mat::zeros(rows, 1);
    for (i, (p0, p1)) in src.iter().zip(dst).enumerate() {
        let p0 = apply(&t_src, p0);
        let p1 = apply(&t_dst, p1);
        let (x, y, x_p, y_p) = (p0.x, p0.y, p1.x, p1.y);
        let r = 2 * i;
        *a.get_mut(r, 0) = x;
        *a.get_mut(r, 1) = y;
        *a.get_mut(r, 2) = 1.0;
        *a.get_mut(r, 6) = -x * x_p;
        *a.get_mut(r, 7) = -y * x_p;
        *b.get_mut(r, 0) = x_p;

        *a.get_mut(r + 1, 3) = x;
        *a.get_mut(r + 1, 4) = y;
        *a.get_mut(r + 1, 5) = 1.0;
        *a.get_mut(r + 1, 6) = -x * y_p;
        *a.get_mut(r + 1, 7) = -y * y_p;
        *b.get_mut(r + 1, 0) = y_p;
    }
    let mut x = b;
    a.qr()
        .solve_lstsq_in_place_with_conj(faer::Conj::No, x.as_mut());

    let h = na::Matrix3::new(
        *x.get(0, 0),
        *x.get(1, 0),
        *x.get(2, 0),
        *x.get(3, 0),
        *x.get(4, 0),
        *x.get(5, 0),
        *x.get(6, 0),
        *x.get(7, 0),
        1.0,
    );
    let h = t_dst.try_inverse()? * h * t_src;
    let h22 = h[(2, 2)];
    if !h22.is_finite() || h22.abs() < 1e-12 {
        return None;
    }
    let h = h / h22;
    if h.iter().all(|v| v.is_finite()) {
        Some(h)
    } else {
        None
    }
}

/// Twice the signed area of the triangle `a b c`.
pub fn triangle_area2(a: &DVec2, b: &DVec2, c: &DVec2) -> f64 {
    (*b - *a).perp_dot(*c - *a)
}

/// True when any three of the four points are (nearly) collinear.
pub fn is_degenerate_sample(pts: &[DVec2; 4], eps: f64) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES
        .iter()
        .any(|&(i, j, k)| triangle_area2(&pts[i], &pts[j], &pts[k]).abs() < eps)
}
