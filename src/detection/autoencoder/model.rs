//! Sequence-to-sequence LSTM autoencoder.

use ndarray::{s, Array1, Array2, Array3, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::layers::{dropout_mask, Dense, LstmGradients, LstmLayer, LstmStep};
use super::optimizer::Adam;
use super::{SequenceReconstructor, TrainingHistory};
use crate::config::{DetectorConfig, LossKind};
use crate::error::{PipelineError, Result};

/// Dropout masks for one training batch.
struct DropoutMasks {
    latent: Array2<f64>,
    decoder: Vec<Array2<f64>>,
}

impl DropoutMasks {
    fn sample(rows: usize, hidden: usize, n_steps: usize, rate: f64, rng: &mut StdRng) -> Self {
        Self {
            latent: dropout_mask((rows, hidden), rate, rng),
            decoder: (0..n_steps)
                .map(|_| dropout_mask((rows, hidden), rate, rng))
                .collect(),
        }
    }
}

/// Everything the backward pass needs from one forward pass.
struct ForwardPass {
    encoder_steps: Vec<LstmStep>,
    decoder_steps: Vec<LstmStep>,
    /// Decoder hidden states after dropout, the dense layer's inputs.
    projected_inputs: Vec<Array2<f64>>,
    /// Reconstruction per timestep, `(batch, features)`.
    outputs: Vec<Array2<f64>>,
}

/// LSTM encoder, repeated latent vector, LSTM decoder and a time-distributed
/// dense projection.
///
/// Dropout is applied to the latent vector and to every decoder output while
/// training only, so [`SequenceReconstructor::predict`] is deterministic.
#[derive(Debug, Clone)]
pub struct LstmAutoencoder {
    n_steps: usize,
    n_features: usize,
    dropout: f64,
    epochs: usize,
    batch_size: usize,
    validation_split: f64,
    loss: LossKind,
    encoder: LstmLayer,
    decoder: LstmLayer,
    output: Dense,
    optimizer: Adam,
    rng: StdRng,
    fitted: bool,
}

impl LstmAutoencoder {
    /// Build an untrained model; weights and dropout masks draw from `seed`.
    pub fn new(n_features: usize, config: &DetectorConfig, seed: u64) -> Result<Self> {
        if n_features == 0 || config.n_steps == 0 || config.hidden_units == 0 {
            return Err(PipelineError::InvalidParameter(
                "features, window length and hidden units must be positive".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(PipelineError::InvalidParameter(
                "batch size must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&config.dropout) || !(0.0..1.0).contains(&config.validation_split) {
            return Err(PipelineError::InvalidParameter(
                "dropout and validation split must be in [0, 1)".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let hidden = config.hidden_units;
        let encoder = LstmLayer::new(n_features, hidden, &mut rng);
        let decoder = LstmLayer::new(hidden, hidden, &mut rng);
        let output = Dense::new(hidden, n_features, &mut rng);

        Ok(Self {
            n_steps: config.n_steps,
            n_features,
            dropout: config.dropout,
            epochs: config.epochs,
            batch_size: config.batch_size,
            validation_split: config.validation_split,
            loss: config.loss,
            encoder,
            decoder,
            output,
            optimizer: Adam::new(config.optimizer),
            rng,
            fitted: false,
        })
    }

    fn check_shape(&self, windows: &Array3<f64>) -> Result<()> {
        let shape = windows.shape();
        if shape[1] != self.n_steps || shape[2] != self.n_features {
            return Err(PipelineError::shape(
                format!("(_, {}, {})", self.n_steps, self.n_features),
                shape,
            ));
        }
        Ok(())
    }

    /// Run the network; `training` carries the batch's dropout masks.
    fn forward(&self, batch: ArrayView3<f64>, training: Option<&DropoutMasks>) -> ForwardPass {
        let rows = batch.len_of(Axis(0));
        let hidden = self.encoder.hidden();
        let inputs: Vec<Array2<f64>> = batch
            .axis_iter(Axis(1))
            .map(|step| step.to_owned())
            .collect();

        let (encoder_states, encoder_steps) = self.encoder.forward(&inputs);
        let mut latent = encoder_states
            .last()
            .cloned()
            .unwrap_or_else(|| Array2::zeros((rows, hidden)));
        if let Some(masks) = training {
            latent = latent * &masks.latent;
        }

        let repeated = vec![latent; self.n_steps];
        let (decoder_states, decoder_steps) = self.decoder.forward(&repeated);

        let projected_inputs: Vec<Array2<f64>> = match training {
            Some(masks) => decoder_states
                .into_iter()
                .zip(&masks.decoder)
                .map(|(h, mask)| h * mask)
                .collect(),
            None => decoder_states,
        };
        let outputs = projected_inputs
            .iter()
            .map(|h| self.output.forward(h))
            .collect();

        ForwardPass {
            encoder_steps,
            decoder_steps,
            projected_inputs,
            outputs,
        }
    }

    /// Mean loss over a batch and its gradient for each timestep's output.
    fn loss_and_gradient(&self, batch: ArrayView3<f64>, outputs: &[Array2<f64>]) -> (f64, Vec<Array2<f64>>) {
        let count = batch.len() as f64;
        let mut total = 0.0;
        let grads = outputs
            .iter()
            .enumerate()
            .map(|(t, out)| {
                let target = batch.index_axis(Axis(1), t);
                let diff = out - &target;
                match self.loss {
                    LossKind::MeanAbsoluteError => {
                        total += diff.iter().map(|d| d.abs()).sum::<f64>();
                        diff.mapv(|d| {
                            if d > 0.0 {
                                1.0 / count
                            } else if d < 0.0 {
                                -1.0 / count
                            } else {
                                0.0
                            }
                        })
                    }
                    LossKind::MeanSquaredError => {
                        total += diff.iter().map(|d| d * d).sum::<f64>();
                        diff.mapv(|d| 2.0 * d / count)
                    }
                }
            })
            .collect();
        (total / count, grads)
    }

    fn train_batch(&mut self, batch: ArrayView3<f64>) -> f64 {
        let rows = batch.len_of(Axis(0));
        let hidden = self.encoder.hidden();
        let masks = DropoutMasks::sample(rows, hidden, self.n_steps, self.dropout, &mut self.rng);
        let pass = self.forward(batch, Some(&masks));
        let (loss, output_grads) = self.loss_and_gradient(batch, &pass.outputs);

        let mut d_dense_kernel = Array2::zeros(self.output.kernel.raw_dim());
        let mut d_dense_bias = Array1::zeros(self.output.bias.len());
        let decoder_grads: Vec<Array2<f64>> = output_grads
            .iter()
            .zip(&pass.projected_inputs)
            .zip(&masks.decoder)
            .map(|((dy, h), mask)| {
                self.output
                    .backward(h, dy, &mut d_dense_kernel, &mut d_dense_bias)
                    * mask
            })
            .collect();

        let (decoder_update, decoder_input_grads) =
            self.decoder.backward(&pass.decoder_steps, &decoder_grads);

        // The latent vector fed every decoder step.
        let d_latent = decoder_input_grads
            .iter()
            .fold(Array2::<f64>::zeros((rows, hidden)), |acc, g| acc + g)
            * &masks.latent;
        let mut encoder_grads = vec![Array2::zeros((rows, hidden)); self.n_steps];
        if let Some(last) = encoder_grads.last_mut() {
            *last = d_latent;
        }
        let (encoder_update, _) = self.encoder.backward(&pass.encoder_steps, &encoder_grads);

        self.apply(encoder_update, decoder_update, d_dense_kernel, d_dense_bias);
        loss
    }

    fn apply(
        &mut self,
        encoder: LstmGradients,
        decoder: LstmGradients,
        dense_kernel: Array2<f64>,
        dense_bias: Array1<f64>,
    ) {
        let opt = &mut self.optimizer;
        opt.next_step();
        opt.update(0, &mut self.encoder.kernel, &encoder.kernel);
        opt.update(1, &mut self.encoder.recurrent, &encoder.recurrent);
        opt.update(2, &mut self.encoder.bias, &encoder.bias);
        opt.update(3, &mut self.decoder.kernel, &decoder.kernel);
        opt.update(4, &mut self.decoder.recurrent, &decoder.recurrent);
        opt.update(5, &mut self.decoder.bias, &decoder.bias);
        opt.update(6, &mut self.output.kernel, &dense_kernel);
        opt.update(7, &mut self.output.bias, &dense_bias);
    }

    /// Reconstruct without dropout, batch by batch.
    fn reconstruct(&self, windows: &Array3<f64>) -> Array3<f64> {
        let mut out = Array3::zeros(windows.raw_dim());
        let n = windows.len_of(Axis(0));
        for start in (0..n).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(n);
            let pass = self.forward(windows.slice(s![start..end, .., ..]), None);
            for (t, step) in pass.outputs.iter().enumerate() {
                out.slice_mut(s![start..end, t, ..]).assign(step);
            }
        }
        out
    }

    fn mean_loss(&self, windows: &Array3<f64>) -> f64 {
        let reconstructed = self.reconstruct(windows);
        let diff = &reconstructed - windows;
        let total: f64 = match self.loss {
            LossKind::MeanAbsoluteError => diff.iter().map(|d| d.abs()).sum(),
            LossKind::MeanSquaredError => diff.iter().map(|d| d * d).sum(),
        };
        total / diff.len() as f64
    }
}

impl SequenceReconstructor for LstmAutoencoder {
    fn fit(&mut self, windows: &Array3<f64>) -> Result<TrainingHistory> {
        self.check_shape(windows)?;
        let n = windows.len_of(Axis(0));
        let n_train = (n as f64 * (1.0 - self.validation_split)).floor() as usize;
        if n_train == 0 {
            return Err(PipelineError::InsufficientData { needed: 1, got: n_train });
        }

        let train = windows.slice(s![..n_train, .., ..]);
        let validation = windows.slice(s![n_train.., .., ..]).to_owned();
        info!(
            train_windows = n_train,
            validation_windows = n - n_train,
            epochs = self.epochs,
            "training autoencoder"
        );

        let mut history = TrainingHistory::default();
        for epoch in 0..self.epochs {
            let mut weighted = 0.0;
            for start in (0..n_train).step_by(self.batch_size) {
                let end = (start + self.batch_size).min(n_train);
                let batch = train.slice(s![start..end, .., ..]);
                weighted += self.train_batch(batch) * (end - start) as f64;
            }
            let loss = weighted / n_train as f64;
            history.loss.push(loss);

            let val_loss = (!validation.is_empty()).then(|| self.mean_loss(&validation));
            if let Some(v) = val_loss {
                history.val_loss.push(v);
            }
            info!(epoch = epoch + 1, loss, val_loss = ?val_loss, "epoch finished");
        }

        self.fitted = true;
        Ok(history)
    }

    fn predict(&self, windows: &Array3<f64>) -> Result<Array3<f64>> {
        if !self.fitted {
            return Err(PipelineError::FitRequired);
        }
        self.check_shape(windows)?;
        debug!(windows = windows.len_of(Axis(0)), "reconstructing windows");
        Ok(self.reconstruct(windows))
    }

    fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::make_windows;

    fn config(n_steps: usize) -> DetectorConfig {
        DetectorConfig {
            n_steps,
            hidden_units: 8,
            epochs: 3,
            batch_size: 4,
            ..Default::default()
        }
    }

    fn sine_windows(len: usize, n_steps: usize) -> Array3<f64> {
        let series: Vec<f64> = (0..len).map(|i| (i as f64 * 0.3).sin()).collect();
        make_windows(&series, n_steps).windows
    }

    #[test]
    fn predict_preserves_shape_and_is_deterministic() {
        let windows = sine_windows(40, 6);
        let mut model = LstmAutoencoder::new(1, &config(6), 42).unwrap();
        model.fit(&windows).unwrap();

        let a = model.predict(&windows).unwrap();
        let b = model.predict(&windows).unwrap();
        assert_eq!(a.shape(), windows.shape());
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_wrong_window_shape() {
        let mut model = LstmAutoencoder::new(1, &config(6), 42).unwrap();
        let windows = sine_windows(40, 5);
        assert!(matches!(
            model.fit(&windows),
            Err(PipelineError::InvalidShape { .. })
        ));

        model.fit(&sine_windows(40, 6)).unwrap();
        let two_features = Array3::<f64>::zeros((3, 6, 2));
        assert!(matches!(
            model.predict(&two_features),
            Err(PipelineError::InvalidShape { .. })
        ));
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = LstmAutoencoder::new(1, &config(6), 42).unwrap();
        assert!(matches!(
            model.predict(&sine_windows(20, 6)),
            Err(PipelineError::FitRequired)
        ));
    }

    #[test]
    fn history_tracks_every_epoch() {
        let windows = sine_windows(60, 6);
        let mut model = LstmAutoencoder::new(1, &config(6), 1).unwrap();
        let history = model.fit(&windows).unwrap();

        assert_eq!(history.loss.len(), 3);
        assert_eq!(history.val_loss.len(), 3);
        assert!(history.loss.iter().all(|l| l.is_finite() && *l >= 0.0));
    }

    #[test]
    fn training_reduces_loss() {
        let windows = sine_windows(120, 8);
        let cfg = DetectorConfig {
            epochs: 30,
            dropout: 0.0,
            optimizer: crate::config::AdamConfig {
                learning_rate: 0.01,
                ..Default::default()
            },
            ..config(8)
        };
        let mut model = LstmAutoencoder::new(1, &cfg, 7).unwrap();
        let history = model.fit(&windows).unwrap();

        let first = history.loss[0];
        let last = *history.loss.last().unwrap();
        assert!(last < first, "loss went from {} to {}", first, last);
    }

    #[test]
    fn same_seed_same_model() {
        let windows = sine_windows(40, 6);
        let mut a = LstmAutoencoder::new(1, &config(6), 11).unwrap();
        let mut b = LstmAutoencoder::new(1, &config(6), 11).unwrap();
        let ha = a.fit(&windows).unwrap();
        let hb = b.fit(&windows).unwrap();

        assert_eq!(ha, hb);
        assert_eq!(a.predict(&windows).unwrap(), b.predict(&windows).unwrap());
    }

    #[test]
    fn too_few_windows_for_training() {
        let mut model = LstmAutoencoder::new(1, &config(6), 42).unwrap();
        let empty = Array3::<f64>::zeros((0, 6, 1));
        assert!(matches!(
            model.fit(&empty),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}
