use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use margin_heads::{argmax_rows, ArcFaceHeader, Batch};

fn main() -> margin_heads::Result<()> {
    // Tiny synthetic identity-verification setup: three class prototypes in
    // 4-D, with each "embedding" being its prototype plus uniform noise. The
    // header's weight rows are the prototypes themselves, so argmax recovers
    // the class unless the margin pushes a borderline sample over.
    let mut rng = StdRng::seed_from_u64(0);

    let prototypes = [
        [0.9_f32, 0.1, 0.0, 0.4],
        [-0.2, 0.8, 0.5, 0.0],
        [0.1, -0.3, 0.9, -0.2],
    ];
    let n_per_class = 16;

    let mut xs = Vec::with_capacity(3 * n_per_class);
    let mut labels = Vec::with_capacity(3 * n_per_class);
    for (class, proto) in prototypes.iter().enumerate() {
        for _ in 0..n_per_class {
            let row: Vec<f32> = proto
                .iter()
                .map(|v| v + rng.gen_range(-0.25_f32..0.25))
                .collect();
            xs.push(row);
            labels.push(class);
        }
    }
    let batch = Batch::from_rows(&xs, &labels)?;

    let weights: Vec<f32> = prototypes.iter().flatten().copied().collect();
    let mut margined = ArcFaceHeader::from_parts(4, 3, 64.0, 0.5, weights.clone())?;
    let mut plain = ArcFaceHeader::from_parts(4, 3, 64.0, 0.0, weights)?;

    let logits_margined = margined.forward(&batch)?;
    let logits_plain = plain.forward(&batch)?;

    let accuracy = |logits: &[f32]| {
        let preds = argmax_rows(logits, 3);
        preds.iter().zip(&labels).filter(|(p, l)| p == l).count()
    };
    println!(
        "argmax accuracy: margin-free {}/{}, with margin {}/{}",
        accuracy(&logits_plain),
        labels.len(),
        accuracy(&logits_margined),
        labels.len()
    );

    // The margin only ever lowers the target-class logit.
    let target = |logits: &[f32], row: usize| logits[row * 3 + labels[row]];
    println!(
        "first sample target logit: margin-free {:.3}, with margin {:.3}",
        target(&logits_plain, 0),
        target(&logits_margined, 0)
    );

    Ok(())
}
