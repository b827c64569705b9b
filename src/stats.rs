/// Running mean and standard deviation of fixed-length vectors
/// (Welford's algorithm applied element-wise).
pub struct Accumulator {
    n_vals: usize,
    mean: Vec<f64>,
    diff_2_sum: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
}

impl Accumulator {
    pub fn new(len: usize) -> Self {
        Self {
            n_vals: 0,
            mean: vec![0.0; len],
            diff_2_sum: vec![0.0; len],
        }
    }

    pub fn add(&mut self, vals: &[f64]) {
        self.n_vals += 1;
        let n_vals = self.n_vals as f64;

        for ((&val, mean), diff_2_sum) in vals
            .iter()
            .zip(self.mean.iter_mut())
            .zip(self.diff_2_sum.iter_mut())
        {
            let diff_a = val - *mean;
            *mean += diff_a / n_vals;

            let diff_b = val - *mean;
            *diff_2_sum += diff_a * diff_b;
        }
    }

    pub fn report(&self) -> AccumulatorReport {
        let mean = if self.n_vals > 0 {
            self.mean.clone()
        } else {
            vec![f64::NAN; self.mean.len()]
        };
        let std_dev = self
            .diff_2_sum
            .iter()
            .map(|&sum| {
                if self.n_vals > 1 {
                    (sum / (self.n_vals as f64 - 1.0)).sqrt()
                } else {
                    f64::NAN
                }
            })
            .collect();
        AccumulatorReport {
            n_vals: self.n_vals,
            mean,
            std_dev,
        }
    }
}
