use candle_core::{
    bail,
    Result,
    Tensor,
};

/// Zero-mean Gaussian exploration noise with a multiplicative decay schedule.
///
/// The DDPG policy is deterministic, so exploration comes entirely from the
/// episode driver perturbing the chosen action. The scale starts wide and is
/// decayed a little on every training step.
pub struct GaussianNoise {
    scale: f64,
    decay: f64,
}
impl GaussianNoise {
    pub fn new(
        scale: f64,
        decay: f64,
    ) -> Result<Self> {
        if !(scale.is_finite() && scale >= 0.0) {
            bail!("noise scale must be finite and non-negative, got {scale}");
        }
        if !(0.0..=1.0).contains(&decay) {
            bail!("noise decay must lie in [0, 1], got {decay}");
        }
        Ok(Self { scale, decay })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Perturb an action with noise drawn at the current scale.
    pub fn apply(
        &self,
        action: &Tensor,
    ) -> Result<Tensor> {
        action + (self.scale * action.randn_like(0.0, 1.0)?)?
    }

    /// Shrink the scale by one decay step.
    pub fn decay(&mut self) {
        self.scale *= self.decay;
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        candle_core::Device,
    };

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(GaussianNoise::new(-1.0, 0.5).is_err());
        assert!(GaussianNoise::new(f64::NAN, 0.5).is_err());
        assert!(GaussianNoise::new(1.0, 1.5).is_err());
    }

    #[test]
    fn zero_scale_is_the_identity() -> Result<()> {
        let device = Device::Cpu;
        let noise = GaussianNoise::new(0.0, 0.9995)?;
        let action = Tensor::new(vec![0.3, -1.2], &device)?;
        let perturbed = noise.apply(&action)?;
        assert_eq!(action.to_vec1::<f64>()?, perturbed.to_vec1::<f64>()?);
        Ok(())
    }

    #[test]
    fn decay_shrinks_the_scale_geometrically() -> Result<()> {
        let mut noise = GaussianNoise::new(3.0, 0.5)?;
        noise.decay();
        noise.decay();
        assert!((noise.scale() - 0.75).abs() < 1e-12);
        Ok(())
    }
}
