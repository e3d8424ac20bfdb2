//! Onset history resampling
//!
//! Tempo induction always works on a 512-point view of the onset history,
//! whatever the hop size. The history is stretched or squeezed to that length
//! by an [`OnsetResampler`].

/// Resamples a signal to a fixed number of points
pub trait OnsetResampler: Send {
    /// Resample `input` into `output`, filling all of `output`
    fn resample(&self, input: &[f64], output: &mut [f64]);
}

/// Linear interpolation resampler
///
/// The first and last samples of the input map onto the first and last
/// samples of the output. Equal lengths copy the input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearResampler;

impl OnsetResampler for LinearResampler {
    fn resample(&self, input: &[f64], output: &mut [f64]) {
        if output.is_empty() {
            return;
        }

        if input.len() == output.len() {
            output.copy_from_slice(input);
            return;
        }

        match input.len() {
            0 => {
                log::warn!("Resampling an empty onset history, output is silent");
                output.fill(0.0);
            }
            1 => output.fill(input[0]),
            n => {
                if output.len() == 1 {
                    output[0] = input[0];
                    return;
                }

                let step = (n - 1) as f64 / (output.len() - 1) as f64;
                for (i, out) in output.iter_mut().enumerate() {
                    let position = i as f64 * step;
                    let index = (position.floor() as usize).min(n - 2);
                    let frac = position - index as f64;
                    *out = input[index] * (1.0 - frac) + input[index + 1] * frac;
                }
            }
        }
    }
}
