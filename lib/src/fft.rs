//! FFT plans used by the transform
//!
//! Thin owners around `realfft`/`rustfft` plans that keep their scratch space
//! next to the plan and report failures as [`CwtError`] instead of panicking.
//! Both transforms are unnormalized; callers apply their own `1/N` scaling.

use crate::error::CwtError;
use crate::Result;
use num_complex::Complex64;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Allocate a buffer of `len` copies of `value`, reporting allocation failure
pub fn allocate<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| CwtError::allocation(len, e))?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Forward real-to-complex plan
pub struct ForwardPlan {
    fft: Arc<dyn RealToComplex<f64>>,
    scratch: Vec<Complex64>,
}

impl ForwardPlan {
    /// Plan a forward transform of `len` real samples
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(CwtError::InvalidInput(
                "FFT length must be at least 1".to_string(),
            ));
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(len);
        let scratch = allocate(fft.get_scratch_len(), Complex64::new(0.0, 0.0))?;

        Ok(Self { fft, scratch })
    }

    /// Number of real input samples
    pub fn len(&self) -> usize {
        self.fft.len()
    }

    /// Number of complex output bins (`len / 2 + 1`)
    pub fn spectrum_len(&self) -> usize {
        self.fft.len() / 2 + 1
    }

    /// Transform `input` into `output`. `input` is used as scratch and is left undefined.
    pub fn execute(&mut self, input: &mut [f64], output: &mut [Complex64]) -> Result<()> {
        self.fft
            .process_with_scratch(input, output, &mut self.scratch)
            .map_err(|e| CwtError::TransformFailure(e.to_string()))
    }
}

/// Backward complex-to-complex plan with its own scratch space
pub struct BackwardPlan {
    fft: Arc<dyn Fft<f64>>,
    len: usize,
    scratch: Vec<Complex64>,
}

impl BackwardPlan {
    /// Plan an inverse transform of `len` complex samples
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(CwtError::InvalidInput(
                "FFT length must be at least 1".to_string(),
            ));
        }

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_inverse(len);
        let scratch = allocate(
            fft.get_outofplace_scratch_len(),
            Complex64::new(0.0, 0.0),
        )?;

        Ok(Self { fft, len, scratch })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Transform `input` into `output`. `input` is used as scratch and is left undefined.
    pub fn execute(&mut self, input: &mut [Complex64], output: &mut [Complex64]) -> Result<()> {
        if input.len() != self.len || output.len() != self.len {
            return Err(CwtError::TransformFailure(format!(
                "buffer length mismatch: plan {}, input {}, output {}",
                self.len,
                input.len(),
                output.len()
            )));
        }

        self.fft
            .process_outofplace_with_scratch(input, output, &mut self.scratch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_zero_length_rejected() {
        assert!(matches!(ForwardPlan::new(0), Err(CwtError::InvalidInput(_))));
        assert!(matches!(BackwardPlan::new(0), Err(CwtError::InvalidInput(_))));
    }

    #[test]
    fn test_allocation_failure_reported() {
        assert!(matches!(
            allocate(usize::MAX, Complex64::new(0.0, 0.0)),
            Err(CwtError::AllocationFailure { requested: usize::MAX, .. })
        ));
        assert_eq!(allocate(3, 1.5f64).unwrap(), vec![1.5; 3]);
    }

    #[test]
    fn test_forward_sine_peak() {
        let len = 64;
        let mut plan = ForwardPlan::new(len).unwrap();
        assert_eq!(plan.spectrum_len(), 33);

        let mut input: Vec<f64> = (0..len)
            .map(|i| (2.0 * PI * 5.0 * i as f64 / len as f64).cos())
            .collect();
        let mut output = vec![Complex64::new(0.0, 0.0); plan.spectrum_len()];
        plan.execute(&mut input, &mut output).unwrap();

        // Unnormalized: a unit cosine puts len / 2 into its bin
        assert!((output[5].re - 32.0).abs() < 1e-9);
        for (bin, value) in output.iter().enumerate() {
            if bin != 5 {
                assert!(value.norm() < 1e-9, "bin {} = {}", bin, value);
            }
        }
    }

    #[test]
    fn test_forward_length_mismatch() {
        let mut plan = ForwardPlan::new(16).unwrap();
        let mut input = vec![0.0; 16];
        let mut output = vec![Complex64::new(0.0, 0.0); 4];
        assert!(matches!(
            plan.execute(&mut input, &mut output),
            Err(CwtError::TransformFailure(_))
        ));
    }

    #[test]
    fn test_backward_delta() {
        let len = 10;
        let mut plan = BackwardPlan::new(len).unwrap();
        let mut input = vec![Complex64::new(0.0, 0.0); len];
        input[0] = Complex64::new(1.0, 0.0);
        let mut output = vec![Complex64::new(0.0, 0.0); len];
        plan.execute(&mut input, &mut output).unwrap();

        // Unnormalized inverse of a DC delta is all ones
        for value in &output {
            assert!((value.re - 1.0).abs() < 1e-12);
            assert!(value.im.abs() < 1e-12);
        }

        let mut short = vec![Complex64::new(0.0, 0.0); 3];
        assert!(plan.execute(&mut short, &mut output).is_err());
    }
}
