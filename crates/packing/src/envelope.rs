//! Enclosure construction.

use crate::config::EnvelopeConfig;
use log::info;
use nalgebra::Vector3;
use sat_layout_core::{Envelope, Error, Part, Result};

/// Builds the enclosure for a set of parts.
///
/// With an explicit `outer_size` the parts are ignored. Otherwise the
/// target volume is `sum(part volume) / fill_ratio` and the outer size is
/// `size_ratio * cbrt(target / product(size_ratio))`.
pub fn build_envelope(config: &EnvelopeConfig, parts: &[Part]) -> Result<Envelope> {
    let size = match config.outer_size {
        Some(size) => Vector3::from(size),
        None => auto_size(config, parts)?,
    };

    let envelope = Envelope::with_size(size, config.thickness, config.origin)?
        .with_fill_ratio(config.fill_ratio);

    info!(
        "Envelope outer {:.1}x{:.1}x{:.1} mm, inner {:.1}x{:.1}x{:.1} mm",
        size.x,
        size.y,
        size.z,
        envelope.inner.size().x,
        envelope.inner.size().y,
        envelope.inner.size().z
    );
    Ok(envelope)
}

fn auto_size(config: &EnvelopeConfig, parts: &[Part]) -> Result<Vector3<f64>> {
    if config.fill_ratio <= 0.0 || config.fill_ratio > 1.0 {
        return Err(Error::InvalidEnvelope(format!(
            "fill ratio must be in (0, 1], got {}",
            config.fill_ratio
        )));
    }
    let ratio = Vector3::from(config.size_ratio);
    if ratio.iter().any(|r| !r.is_finite() || *r <= 0.0) {
        return Err(Error::InvalidEnvelope(format!(
            "size ratio must be positive, got {:?}",
            config.size_ratio
        )));
    }

    let parts_volume: f64 = parts.iter().map(Part::volume).sum();
    if parts_volume <= 0.0 {
        return Err(Error::InvalidEnvelope(
            "cannot auto-size an envelope without parts".to_string(),
        ));
    }

    let target = parts_volume / config.fill_ratio;
    let scale = (target / ratio.product()).cbrt();
    Ok(ratio * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sat_layout_core::EnvelopeOrigin;

    #[test]
    fn test_explicit_size() {
        let config = EnvelopeConfig::new()
            .with_outer_size(400.0, 400.0, 400.0)
            .with_thickness(0.0)
            .with_origin(EnvelopeOrigin::Corner);
        let env = build_envelope(&config, &[]).unwrap();
        assert_relative_eq!(env.inner.volume(), 64e6);
        assert_eq!(env.outer.min, Vector3::zeros());
    }

    #[test]
    fn test_auto_size_matches_fill_ratio() {
        let parts = vec![Part::new("a", 100.0, 100.0, 100.0)];
        let config = EnvelopeConfig::new()
            .with_fill_ratio(0.125)
            .with_size_ratio([1.0, 1.0, 2.0])
            .with_thickness(1.0);
        let env = build_envelope(&config, &parts).unwrap();
        assert_relative_eq!(env.outer.volume(), 8e6, max_relative = 1e-9);
        assert_relative_eq!(env.size().z, 2.0 * env.size().x, max_relative = 1e-9);
        // Centred origin.
        assert_relative_eq!(env.outer.center().norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_auto_size_rejects_bad_ratio() {
        let parts = vec![Part::new("a", 1.0, 1.0, 1.0)];
        let config = EnvelopeConfig::new().with_fill_ratio(0.0);
        assert!(build_envelope(&config, &parts).is_err());
    }

    #[test]
    fn test_walls_too_thick() {
        let config = EnvelopeConfig::new()
            .with_outer_size(10.0, 10.0, 10.0)
            .with_thickness(5.0);
        assert!(build_envelope(&config, &[]).is_err());
    }
}
