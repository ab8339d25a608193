use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use margin_heads::{Batch, HeaderConfig};

const IN_FEATURES: usize = 16;
const OUT_FEATURES: usize = 10;

fn main() -> margin_heads::Result<()> {
    // One random batch through all three headers, same weight seed: shows
    // how each variant separates the target logit from its strongest rival.
    let mut rng = StdRng::seed_from_u64(1);

    let batch_len = 8;
    let mut xs = Vec::with_capacity(batch_len);
    let mut labels = Vec::with_capacity(batch_len);
    for i in 0..batch_len {
        let row: Vec<f32> = (0..IN_FEATURES)
            .map(|_| rng.gen_range(-1.0_f32..1.0))
            .collect();
        xs.push(row);
        labels.push(i % OUT_FEATURES);
    }
    let batch = Batch::from_rows(&xs, &labels)?;

    let configs = [
        ("linear", HeaderConfig::Linear),
        ("arcface", HeaderConfig::arcface()),
        ("magface", HeaderConfig::magface()),
    ];

    for (name, config) in configs {
        let mut header = config.build_with_seed(IN_FEATURES, OUT_FEATURES, 0)?;
        let logits = header.forward(&batch)?;

        let mut mean_target = 0.0_f32;
        let mut mean_best_other = 0.0_f32;
        for (row, &label) in labels.iter().enumerate() {
            let cols = &logits[row * OUT_FEATURES..(row + 1) * OUT_FEATURES];
            mean_target += cols[label];
            mean_best_other += cols
                .iter()
                .enumerate()
                .filter(|(c, _)| *c != label)
                .map(|(_, v)| *v)
                .fold(f32::NEG_INFINITY, f32::max);
        }
        mean_target /= batch_len as f32;
        mean_best_other /= batch_len as f32;

        println!("{name:>8}: mean target logit {mean_target:>8.3}, mean best rival {mean_best_other:>8.3}");
    }

    Ok(())
}
