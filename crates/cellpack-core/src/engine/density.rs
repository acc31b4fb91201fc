//! Conversion from a target mass density to a molecule count.

use super::error::AssemblyError;
use crate::core::models::species::Species;
use tracing::debug;

/// Avogadro constant in mol⁻¹.
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Cubic centimetres per cubic ångström.
const CM3_PER_A3: f64 = 1e-24;

/// Number of molecules of molar mass `molar_mass` (g/mol) that give `density` (g/cm³)
/// in `volume` (Å³), truncated toward zero.
///
/// The result never exceeds the exact real-valued count and is monotone non-decreasing
/// in both `density` and `volume`.
///
/// # Errors
///
/// Returns [`AssemblyError::InvalidConfiguration`] for a negative or non-finite density
/// or volume, and [`AssemblyError::InvalidSpecies`] for a non-positive molar mass.
pub fn molecule_count(
    species: &str,
    density: f64,
    molar_mass: f64,
    volume: f64,
) -> Result<usize, AssemblyError> {
    if !density.is_finite() || density < 0.0 {
        return Err(AssemblyError::InvalidConfiguration(format!(
            "density of '{}' must be a non-negative number, got {}",
            species, density
        )));
    }
    if !volume.is_finite() || volume < 0.0 {
        return Err(AssemblyError::InvalidConfiguration(format!(
            "cell volume must be a non-negative number, got {}",
            volume
        )));
    }
    if !molar_mass.is_finite() || molar_mass <= 0.0 {
        return Err(AssemblyError::InvalidSpecies {
            name: species.to_string(),
            reason: format!("molar mass must be positive, got {}", molar_mass),
        });
    }

    let exact = density * CM3_PER_A3 * AVOGADRO / molar_mass * volume;
    Ok(exact.trunc() as usize)
}

/// [`molecule_count`] for a catalog species.
pub fn plan_species(species: &Species, density: f64, volume: f64) -> Result<usize, AssemblyError> {
    let count = molecule_count(species.name(), density, species.molar_mass(), volume)?;
    debug!(
        species = species.name(),
        density,
        molar_mass = species.molar_mass(),
        volume,
        count,
        "Planned molecule count."
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::species::SpeciesKind;
    use nalgebra::Point3;

    #[test]
    fn water_like_density_in_a_small_box() {
        // 1 g/cm³ of M = 18 g/mol in 1000 Å³ is 33.46 molecules.
        assert_eq!(molecule_count("w", 1.0, 18.0, 1000.0).unwrap(), 33);
    }

    #[test]
    fn zero_density_or_volume_gives_zero() {
        assert_eq!(molecule_count("w", 0.0, 18.0, 1000.0).unwrap(), 0);
        assert_eq!(molecule_count("w", 1.0, 18.0, 0.0).unwrap(), 0);
    }

    #[test]
    fn count_never_exceeds_the_exact_value() {
        for &(d, m, v) in &[(0.8, 44.1, 12_345.0), (1.3, 2.016, 999.9), (0.05, 300.0, 1e6)] {
            let n = molecule_count("s", d, m, v).unwrap() as f64;
            let exact = d * 1e-24 * AVOGADRO / m * v;
            assert!(n <= exact && exact - n < 1.0, "n = {}, exact = {}", n, exact);
        }
    }

    #[test]
    fn count_is_monotone_in_density_and_volume() {
        let mut last = 0;
        for step in 0..50 {
            let n = molecule_count("s", 0.05 * step as f64, 32.0, 8000.0).unwrap();
            assert!(n >= last);
            last = n;
        }
        let mut last = 0;
        for step in 0..50 {
            let n = molecule_count("s", 0.9, 32.0, 500.0 * step as f64).unwrap();
            assert!(n >= last);
            last = n;
        }
    }

    #[test]
    fn heavier_molecules_never_give_more() {
        let mut last = usize::MAX;
        for step in 1..50 {
            let n = molecule_count("s", 1.1, 4.0 * step as f64, 20_000.0).unwrap();
            assert!(n <= last);
            last = n;
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            molecule_count("s", -1.0, 18.0, 1000.0),
            Err(AssemblyError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            molecule_count("s", f64::NAN, 18.0, 1000.0),
            Err(AssemblyError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            molecule_count("s", 1.0, 18.0, -5.0),
            Err(AssemblyError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            molecule_count("s", 1.0, 0.0, 1000.0),
            Err(AssemblyError::InvalidSpecies { ref name, .. }) if name == "s"
        ));
    }

    #[test]
    fn plan_species_uses_the_template_mass() {
        let water = Species::new(
            "water",
            SpeciesKind::Fluid,
            vec![
                Atom::new("O", Point3::origin()),
                Atom::new("H", Point3::new(0.96, 0.0, 0.0)),
                Atom::new("H", Point3::new(-0.24, 0.93, 0.0)),
            ],
        )
        .unwrap();
        assert_eq!(plan_species(&water, 1.0, 1000.0).unwrap(), 33);
    }
}
