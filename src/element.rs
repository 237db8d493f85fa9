//! Periodic table lookups used throughout the crate.
//!
//! Only the quantities the pipeline needs are tabulated: symbols, average
//! and monoisotopic masses, covalent and van der Waals radii, and
//! valence-shell electron counts. Radii of `-1.0` mean "not tabulated".

/// A chemical element, identified by atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

impl Element {
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const SI: Element = Element(14);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const GE: Element = Element(32);
    pub const AS: Element = Element(33);
    pub const SE: Element = Element(34);
    pub const BR: Element = Element(35);
    pub const TE: Element = Element(52);
    pub const I: Element = Element(53);
    pub const AT: Element = Element(85);

    pub fn from_atomic_num(n: u8) -> Option<Element> {
        if (1..=PERIODIC_TABLE.len()).contains(&(n as usize)) {
            Some(Element(n))
        } else {
            None
        }
    }

    /// Case-sensitive symbol lookup (`"Cl"`, not `"CL"`).
    pub fn from_symbol(s: &str) -> Option<Element> {
        PERIODIC_TABLE
            .iter()
            .position(|row| row.symbol == s)
            .map(|i| Element(i as u8 + 1))
    }

    pub fn atomic_num(self) -> u8 {
        self.0
    }

    fn data(self) -> &'static ElementData {
        &PERIODIC_TABLE[self.0 as usize - 1]
    }

    pub fn symbol(self) -> &'static str {
        self.data().symbol
    }

    /// Standard atomic weight (g/mol).
    pub fn atomic_weight(self) -> f64 {
        self.data().average_mass
    }

    /// Mass of the most abundant isotope.
    pub fn exact_mass(self) -> f64 {
        self.data().monoisotopic_mass
    }

    pub fn covalent_radius(self) -> Option<f64> {
        let r = self.data().covalent_radius;
        (r > 0.0).then_some(r)
    }

    pub fn vdw_radius(self) -> Option<f64> {
        let r = self.data().vdw_radius;
        (r > 0.0).then_some(r)
    }

    pub fn valence_electrons(self) -> u8 {
        self.data().valence_electrons
    }

    /// Allowed neutral valences, lowest first. Empty for elements without
    /// a conventional valence model (metals, noble gases).
    pub fn default_valences(self) -> &'static [u8] {
        match self {
            Element::H => &[1],
            Element::B => &[3],
            Element::C | Element::SI | Element::GE => &[4],
            Element::N => &[3, 5],
            Element::O => &[2],
            Element::F | Element::CL | Element::BR | Element::AT => &[1],
            Element::P | Element::AS => &[3, 5],
            Element::S | Element::SE | Element::TE => &[2, 4, 6],
            Element::I => &[1, 3, 5, 7],
            _ => &[],
        }
    }

    /// Elements that may be written without brackets in SMILES.
    pub fn is_organic_subset(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::F
                | Element::CL
                | Element::BR
                | Element::I
        )
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Valence-shell electrons for an atomic number; 0 for unknown numbers.
pub fn outer_shell_electrons(atomic_num: u8) -> u8 {
    Element::from_atomic_num(atomic_num)
        .map(Element::valence_electrons)
        .unwrap_or(0)
}

/// Exact mass of a labelled isotope. Unlisted isotopes fall back to the
/// mass number, which is within a few millidaltons for light nuclei.
pub fn isotope_mass(atomic_num: u8, mass_number: u16) -> f64 {
    match (atomic_num, mass_number) {
        (1, 1) => 1.007_825_032_07,
        (1, 2) => 2.014_101_778_12,
        (1, 3) => 3.016_049_277_7,
        (6, 12) => 12.0,
        (6, 13) => 13.003_354_835_07,
        (6, 14) => 14.003_241_988_4,
        (7, 14) => 14.003_074_004_8,
        (7, 15) => 15.000_108_898_2,
        (8, 16) => 15.994_914_619_57,
        (8, 17) => 16.999_131_70,
        (8, 18) => 17.999_161_0,
        (9, 18) => 18.000_938_0,
        (9, 19) => 18.998_403_22,
        (15, 32) => 31.973_907_3,
        (16, 34) => 33.967_866_90,
        (16, 35) => 34.969_032_16,
        (17, 35) => 34.968_852_68,
        (17, 37) => 36.965_902_59,
        (35, 79) => 78.918_337_1,
        (35, 81) => 80.916_290_6,
        (53, 123) => 122.905_589,
        (53, 125) => 124.904_630_2,
        (53, 127) => 126.904_473,
        (53, 131) => 130.906_124_6,
        _ => f64::from(mass_number),
    }
}

struct ElementData {
    symbol: &'static str,
    average_mass: f64,
    monoisotopic_mass: f64,
    covalent_radius: f64,
    vdw_radius: f64,
    valence_electrons: u8,
}

const fn row(
    symbol: &'static str,
    average_mass: f64,
    monoisotopic_mass: f64,
    covalent_radius: f64,
    vdw_radius: f64,
    valence_electrons: u8,
) -> ElementData {
    ElementData {
        symbol,
        average_mass,
        monoisotopic_mass,
        covalent_radius,
        vdw_radius,
        valence_electrons,
    }
}

// symbol, standard weight, monoisotopic mass, covalent radius, vdW radius, valence electrons
static PERIODIC_TABLE: [ElementData; 118] = [
    row("H", 1.008, 1.00782503207, 0.31, 1.20, 1),
    row("He", 4.002602, 4.00260325413, 0.28, 1.40, 2),
    row("Li", 6.941, 7.0160034366, 1.28, 1.82, 1),
    row("Be", 9.0121831, 9.012183065, 0.96, 1.53, 2),
    row("B", 10.81, 11.00930536, 0.84, 1.92, 3),
    row("C", 12.011, 12.0, 0.76, 1.70, 4),
    row("N", 14.007, 14.00307400443, 0.71, 1.55, 5),
    row("O", 15.999, 15.99491461957, 0.66, 1.52, 6),
    row("F", 18.998403163, 18.99840316273, 0.57, 1.47, 7),
    row("Ne", 20.1797, 19.9924401762, 0.58, 1.54, 8),
    row("Na", 22.98976928, 22.9897692820, 1.66, 2.27, 1),
    row("Mg", 24.305, 23.985041697, 1.41, 1.73, 2),
    row("Al", 26.9815384, 26.98153853, 1.21, 1.84, 3),
    row("Si", 28.085, 27.97692653465, 1.11, 2.10, 4),
    row("P", 30.973761998, 30.97376199842, 1.07, 1.80, 5),
    row("S", 32.06, 31.9720711744, 1.05, 1.80, 6),
    row("Cl", 35.45, 34.96885268, 1.02, 1.75, 7),
    row("Ar", 39.948, 39.9623831237, 1.06, 1.88, 8),
    row("K", 39.0983, 38.9637064864, 2.03, 2.75, 1),
    row("Ca", 40.078, 39.962590863, 1.76, 2.31, 2),
    row("Sc", 44.955908, 44.95590828, 1.70, -1.0, 3),
    row("Ti", 47.867, 47.94794198, 1.60, -1.0, 4),
    row("V", 50.9415, 50.94395704, 1.53, -1.0, 5),
    row("Cr", 51.9961, 51.94050623, 1.39, -1.0, 6),
    row("Mn", 54.938043, 54.93804391, 1.39, -1.0, 7),
    row("Fe", 55.845, 55.93493633, 1.32, -1.0, 8),
    row("Co", 58.933194, 58.93319429, 1.26, -1.0, 9),
    row("Ni", 58.6934, 57.93534241, 1.24, 1.63, 10),
    row("Cu", 63.546, 62.92959772, 1.32, 1.40, 11),
    row("Zn", 65.38, 63.92914201, 1.22, 1.39, 12),
    row("Ga", 69.723, 68.9255735, 1.22, 1.87, 3),
    row("Ge", 72.630, 73.921177761, 1.20, 2.11, 4),
    row("As", 74.921595, 74.92159457, 1.19, 1.85, 5),
    row("Se", 78.971, 79.9165218, 1.20, 1.90, 6),
    row("Br", 79.904, 78.9183376, 1.20, 1.85, 7),
    row("Kr", 83.798, 83.9114977282, 1.16, 2.02, 8),
    row("Rb", 85.4678, 84.9117897379, 2.20, 3.03, 1),
    row("Sr", 87.62, 87.9056125, 1.95, 2.49, 2),
    row("Y", 88.90584, 88.9058403, 1.90, -1.0, 3),
    row("Zr", 91.224, 89.9046977, 1.75, -1.0, 4),
    row("Nb", 92.90637, 92.9063730, 1.64, -1.0, 5),
    row("Mo", 95.95, 97.90540482, 1.54, -1.0, 6),
    row("Tc", 97.0, 96.9063667, 1.47, -1.0, 7),
    row("Ru", 101.07, 101.9043441, 1.46, -1.0, 8),
    row("Rh", 102.90549, 102.905498, 1.42, -1.0, 9),
    row("Pd", 106.42, 105.903483, 1.39, 1.63, 10),
    row("Ag", 107.8682, 106.905092, 1.45, 1.72, 11),
    row("Cd", 112.414, 113.903365, 1.44, 1.58, 12),
    row("In", 114.818, 114.903878776, 1.42, 1.93, 3),
    row("Sn", 118.710, 119.902202, 1.39, 2.17, 4),
    row("Sb", 121.760, 120.903812, 1.39, 2.06, 5),
    row("Te", 127.60, 129.906222748, 1.38, 2.06, 6),
    row("I", 126.90447, 126.904473, 1.39, 1.98, 7),
    row("Xe", 131.293, 131.904155086, 1.40, 2.16, 8),
    row("Cs", 132.90545196, 132.905451961, 2.44, 3.43, 1),
    row("Ba", 137.327, 137.905247, 2.15, 2.68, 2),
    row("La", 138.90547, 138.906353, 2.07, -1.0, 3),
    row("Ce", 140.116, 139.905439, 2.04, -1.0, 4),
    row("Pr", 140.90766, 140.907657, 2.03, -1.0, 3),
    row("Nd", 144.242, 141.907729, 2.01, -1.0, 4),
    row("Pm", 145.0, 144.912756, 1.99, -1.0, 5),
    row("Sm", 150.36, 151.919739, 1.98, -1.0, 6),
    row("Eu", 151.964, 152.921238, 1.98, -1.0, 7),
    row("Gd", 157.25, 157.924112, 1.96, -1.0, 8),
    row("Tb", 158.925354, 158.925354, 1.94, -1.0, 9),
    row("Dy", 162.500, 163.929181, 1.92, -1.0, 10),
    row("Ho", 164.930328, 164.930328, 1.92, -1.0, 11),
    row("Er", 167.259, 165.930299, 1.89, -1.0, 12),
    row("Tm", 168.934218, 168.934218, 1.90, -1.0, 13),
    row("Yb", 173.045, 173.938867, 1.87, -1.0, 14),
    row("Lu", 174.9668, 174.940777, 1.87, -1.0, 3),
    row("Hf", 178.486, 179.946557, 1.75, -1.0, 4),
    row("Ta", 180.94788, 180.947999, 1.70, -1.0, 5),
    row("W", 183.84, 183.950933, 1.62, -1.0, 6),
    row("Re", 186.207, 186.955752, 1.51, -1.0, 7),
    row("Os", 190.23, 191.961477, 1.44, -1.0, 8),
    row("Ir", 192.217, 192.962942, 1.41, -1.0, 9),
    row("Pt", 195.084, 195.965836, 1.36, 1.75, 10),
    row("Au", 196.966570, 196.966570, 1.36, 1.66, 11),
    row("Hg", 200.592, 201.970644, 1.32, 1.55, 12),
    row("Tl", 204.38, 204.974427, 1.45, 1.96, 3),
    row("Pb", 207.2, 207.976653, 1.46, 2.02, 4),
    row("Bi", 208.98040, 208.980399, 1.48, 2.07, 5),
    row("Po", 209.0, 208.982430, 1.40, 1.97, 6),
    row("At", 210.0, 209.987148, 1.50, 2.02, 7),
    row("Rn", 222.0, 222.017578, 1.50, 2.20, 8),
    row("Fr", 223.0, 223.019736, 2.60, 3.48, 1),
    row("Ra", 226.0, 226.025410, 2.21, 2.83, 2),
    row("Ac", 227.0, 227.027752, 2.15, -1.0, 3),
    row("Th", 232.0377, 232.038055, 2.06, -1.0, 4),
    row("Pa", 231.03588, 231.035884, 2.00, -1.0, 3),
    row("U", 238.02891, 238.050788, 1.96, 1.86, 4),
    row("Np", 237.0, 237.048174, 1.90, -1.0, 5),
    row("Pu", 244.0, 244.064205, 1.87, -1.0, 6),
    row("Am", 243.0, 243.061381, 1.80, -1.0, 7),
    row("Cm", 247.0, 247.070354, 1.69, -1.0, 8),
    row("Bk", 247.0, 247.070307, -1.0, -1.0, 9),
    row("Cf", 251.0, 251.079587, -1.0, -1.0, 10),
    row("Es", 252.0, 252.082980, -1.0, -1.0, 11),
    row("Fm", 257.0, 257.095106, -1.0, -1.0, 12),
    row("Md", 258.0, 258.098431, -1.0, -1.0, 13),
    row("No", 259.0, 259.101030, -1.0, -1.0, 14),
    row("Lr", 266.0, 266.120, -1.0, -1.0, 3),
    row("Rf", 267.0, 267.122, -1.0, -1.0, 4),
    row("Db", 268.0, 268.126, -1.0, -1.0, 5),
    row("Sg", 269.0, 269.129, -1.0, -1.0, 6),
    row("Bh", 270.0, 270.133, -1.0, -1.0, 7),
    row("Hs", 277.0, 277.150, -1.0, -1.0, 8),
    row("Mt", 278.0, 278.156, -1.0, -1.0, 9),
    row("Ds", 281.0, 281.165, -1.0, -1.0, 10),
    row("Rg", 282.0, 282.169, -1.0, -1.0, 11),
    row("Cn", 285.0, 285.177, -1.0, -1.0, 12),
    row("Nh", 286.0, 286.183, -1.0, -1.0, 3),
    row("Fl", 289.0, 289.190, -1.0, -1.0, 4),
    row("Mc", 290.0, 290.196, -1.0, -1.0, 5),
    row("Lv", 293.0, 293.205, -1.0, -1.0, 6),
    row("Ts", 294.0, 294.211, -1.0, -1.0, 7),
    row("Og", 294.0, 294.214, -1.0, -1.0, 8),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_num_bounds() {
        assert!(Element::from_atomic_num(0).is_none());
        assert!(Element::from_atomic_num(119).is_none());
        assert_eq!(Element::from_atomic_num(6), Some(Element::C));
        assert_eq!(Element::from_atomic_num(118).map(Element::symbol), Some("Og"));
    }

    #[test]
    fn symbols_round_trip() {
        for n in 1u8..=118 {
            let e = Element::from_atomic_num(n).unwrap();
            assert_eq!(Element::from_symbol(e.symbol()), Some(e));
        }
    }

    #[test]
    fn symbol_lookup_is_case_sensitive() {
        assert_eq!(Element::from_symbol("Cl"), Some(Element::CL));
        assert!(Element::from_symbol("CL").is_none());
        assert!(Element::from_symbol("Xx").is_none());
        assert!(Element::from_symbol("").is_none());
    }

    #[test]
    fn masses_for_common_elements() {
        assert!((Element::C.atomic_weight() - 12.011).abs() < 1e-9);
        assert!((Element::O.exact_mass() - 15.99491461957).abs() < 1e-9);
        assert!((Element::H.atomic_weight() - 1.008).abs() < 1e-9);
    }

    #[test]
    fn radii_missing_for_superheavy() {
        let og = Element::from_symbol("Og").unwrap();
        assert!(og.covalent_radius().is_none());
        assert_eq!(Element::C.vdw_radius(), Some(1.70));
    }

    #[test]
    fn valence_electrons_main_group() {
        assert_eq!(outer_shell_electrons(6), 4);
        assert_eq!(outer_shell_electrons(8), 6);
        assert_eq!(outer_shell_electrons(17), 7);
        assert_eq!(outer_shell_electrons(0), 0);
    }

    #[test]
    fn nitrogen_has_two_valence_states() {
        assert_eq!(Element::N.default_valences(), &[3, 5]);
        assert!(Element::from_symbol("Fe").unwrap().default_valences().is_empty());
    }
}
