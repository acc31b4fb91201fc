use phf::{Map, phf_map};

/// Standard atomic weights in g/mol, keyed by element symbol.
#[rustfmt::skip]
pub static ATOMIC_MASSES: Map<&'static str, f64> = phf_map! {
    // --- Period 1 ---
    "H" => 1.008, "He" => 4.002602,
    // --- Period 2 ---
    "Li" => 6.94, "Be" => 9.0121831, "B" => 10.81, "C" => 12.011,
    "N" => 14.007, "O" => 15.999, "F" => 18.998403163, "Ne" => 20.1797,
    // --- Period 3 ---
    "Na" => 22.98976928, "Mg" => 24.305, "Al" => 26.9815385, "Si" => 28.085,
    "P" => 30.973761998, "S" => 32.06, "Cl" => 35.45, "Ar" => 39.948,
    // --- Period 4 ---
    "K" => 39.0983, "Ca" => 40.078, "Sc" => 44.955908, "Ti" => 47.867,
    "V" => 50.9415, "Cr" => 51.9961, "Mn" => 54.938044, "Fe" => 55.845,
    "Co" => 58.933194, "Ni" => 58.6934, "Cu" => 63.546, "Zn" => 65.38,
    "Ga" => 69.723, "Ge" => 72.630, "As" => 74.921595, "Se" => 78.971,
    "Br" => 79.904, "Kr" => 83.798,
    // --- Period 5 ---
    "Rb" => 85.4678, "Sr" => 87.62, "Y" => 88.90584, "Zr" => 91.224,
    "Nb" => 92.90637, "Mo" => 95.95, "Tc" => 97.90721, "Ru" => 101.07,
    "Rh" => 102.90550, "Pd" => 106.42, "Ag" => 107.8682, "Cd" => 112.414,
    "In" => 114.818, "Sn" => 118.710, "Sb" => 121.760, "Te" => 127.60,
    "I" => 126.90447, "Xe" => 131.293,
    // --- Period 6 ---
    "Cs" => 132.90545196, "Ba" => 137.327,
    "La" => 138.90547, "Ce" => 140.116, "Pr" => 140.90766, "Nd" => 144.242,
    "Pm" => 144.91276, "Sm" => 150.36, "Eu" => 151.964, "Gd" => 157.25,
    "Tb" => 158.92535, "Dy" => 162.500, "Ho" => 164.93033, "Er" => 167.259,
    "Tm" => 168.93422, "Yb" => 173.045, "Lu" => 174.9668,
    "Hf" => 178.49, "Ta" => 180.94788, "W" => 183.84, "Re" => 186.207,
    "Os" => 190.23, "Ir" => 192.217, "Pt" => 195.084, "Au" => 196.966569,
    "Hg" => 200.592, "Tl" => 204.38, "Pb" => 207.2, "Bi" => 208.98040,
    "Po" => 208.98243, "At" => 209.98715, "Rn" => 222.01758,
    // --- Period 7 (long-lived only) ---
    "Th" => 232.0377, "Pa" => 231.03588, "U" => 238.02891,
};

/// Looks up the standard atomic weight of `symbol`.
///
/// Symbols are matched after normalising the capitalisation ("CL" and "cl" both map
/// to chlorine), since structure files are not consistent about it.
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    if let Some(&mass) = ATOMIC_MASSES.get(symbol) {
        return Some(mass);
    }
    let mut chars = symbol.trim().chars();
    let first = chars.next()?;
    let normalized: String = first
        .to_uppercase()
        .chain(chars.flat_map(char::to_lowercase))
        .collect();
    ATOMIC_MASSES.get(normalized.as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_elements_have_expected_masses() {
        assert_eq!(atomic_mass("H"), Some(1.008));
        assert_eq!(atomic_mass("O"), Some(15.999));
        assert_eq!(atomic_mass("Si"), Some(28.085));
    }

    #[test]
    fn lookup_normalises_capitalisation() {
        assert_eq!(atomic_mass("CL"), Some(35.45));
        assert_eq!(atomic_mass("na"), Some(22.98976928));
        assert_eq!(atomic_mass(" o "), Some(15.999));
    }

    #[test]
    fn unknown_symbols_return_none() {
        assert_eq!(atomic_mass("Xx"), None);
        assert_eq!(atomic_mass(""), None);
    }
}
