#[cfg(feature = "bench_smooth")]
use skinweights::algorithms::smooth::smooth;
#[cfg(feature = "bench_smooth")]
use skinweights::{Influence, Rect, SelectionMask, VertexAdjacency, WeightMatrix};
#[cfg(feature = "bench_smooth")]
use std::time::Instant;

#[cfg(not(feature = "bench_smooth"))]
fn main() {
    panic!("smooth_bench requires --features bench_smooth");
}

#[cfg(feature = "bench_smooth")]
fn build_grid(w: usize, h: usize, influences: usize) -> (WeightMatrix, VertexAdjacency) {
    let vertex_count = (w + 1) * (h + 1);
    let mut face_counts = Vec::with_capacity(w * h);
    let mut face_vertices = Vec::with_capacity(w * h * 4);
    let ix = |i: usize, j: usize| -> u32 { (j * (w + 1) + i) as u32 };
    for j in 0..h {
        for i in 0..w {
            face_counts.push(4);
            face_vertices.extend_from_slice(&[ix(i, j), ix(i + 1, j), ix(i + 1, j + 1), ix(i, j + 1)]);
        }
    }
    let adjacency = VertexAdjacency::build(vertex_count, &face_counts, &face_vertices);

    // Striped weights so there is something to diffuse.
    let mut values = Vec::with_capacity(vertex_count * influences);
    for v in 0..vertex_count {
        for c in 0..influences {
            values.push(if v % influences == c { 1.0 } else { 0.0 });
        }
    }
    let names: Vec<Influence> = (0..influences)
        .map(|c| Influence::new(format!("joint{}", c), format!("skin.weights[{}]", c)))
        .collect();
    let matrix = WeightMatrix::new((0..vertex_count as u32).collect(), names, values)
        .expect("grid matrix shape");
    (matrix, adjacency)
}

#[cfg(feature = "bench_smooth")]
fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut w = 100usize;
    let mut h = 100usize;
    let mut influences = 8usize;
    let mut repeat = 10usize;
    for a in &args[1..] {
        if let Some(val) = a.strip_prefix("--w=") {
            if let Ok(v) = val.parse() {
                w = v;
            }
        } else if let Some(val) = a.strip_prefix("--h=") {
            if let Ok(v) = val.parse() {
                h = v;
            }
        } else if let Some(val) = a.strip_prefix("--influences=") {
            if let Ok(v) = val.parse() {
                influences = v;
            }
        } else if let Some(val) = a.strip_prefix("--repeat=") {
            if let Ok(v) = val.parse() {
                repeat = v;
            }
        }
    }

    let (matrix, adjacency) = build_grid(w, h, influences);
    let full = Rect::full(matrix.row_count(), matrix.column_count()).expect("non-empty grid");
    let mask = SelectionMask::compute(&[full], &matrix).expect("full-matrix mask");

    // Warm once, then measure.
    let _ = smooth(&matrix, &mask, &adjacency, 1, 1.0);
    let t0 = Instant::now();
    let out = smooth(&matrix, &mask, &adjacency, repeat, 1.0);
    let ms = t0.elapsed().as_secs_f64() * 1000.0;

    println!(
        "grid={}x{} verts={} influences={} repeat={} smooth_ms={:.3} checksum={:.6}",
        w,
        h,
        matrix.row_count(),
        influences,
        repeat,
        ms,
        out.iter().sum::<f64>()
    );
}
